// 📉 Stock client - daily closes and dividends from the Yahoo Finance chart API

use super::http::{opt_f64, opt_str, path_segment, ApiClient};
use super::PricePoint;
use crate::config::ProviderConfig;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

const PROVIDER: &str = "Yahoo Finance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl HistoryRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::OneYear => "1y",
            HistoryRange::TwoYears => "2y",
            HistoryRange::FiveYears => "5y",
            HistoryRange::Max => "max",
        }
    }
}

impl FromStr for HistoryRange {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(HistoryRange::OneMonth),
            "6mo" => Ok(HistoryRange::SixMonths),
            "1y" => Ok(HistoryRange::OneYear),
            "2y" => Ok(HistoryRange::TwoYears),
            "5y" => Ok(HistoryRange::FiveYears),
            "max" => Ok(HistoryRange::Max),
            other => Err(DashboardError::validation(format!(
                "Unknown range: {} (use 1mo, 6mo, 1y, 2y, 5y or max)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub paid_at: DateTime<Utc>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub currency: Option<String>,
    pub regular_market_price: Option<f64>,
    /// Daily closes, oldest first
    pub closes: Vec<PricePoint>,
    /// Oldest first
    pub dividends: Vec<Dividend>,
}

impl PriceHistory {
    /// Latest known price: the quoted market price, else the last close
    pub fn last_price(&self) -> Option<f64> {
        self.regular_market_price
            .or_else(|| self.closes.last().map(|p| p.value))
    }

    pub fn close_values(&self) -> Vec<f64> {
        self.closes.iter().map(|p| p.value).collect()
    }
}

#[derive(Debug, Clone)]
pub struct StockClient {
    api: ApiClient,
}

impl StockClient {
    pub fn new(settings: &ProviderConfig) -> Result<Self> {
        Ok(StockClient {
            api: ApiClient::new(PROVIDER, settings, HeaderMap::new())?,
        })
    }

    pub async fn history(&self, symbol: &str, range: HistoryRange) -> Result<PriceHistory> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DashboardError::validation("Symbol is required"));
        }
        path_segment("symbol", &symbol)?;

        let body = self
            .api
            .get_json(
                &format!("v8/finance/chart/{}", symbol),
                &[
                    ("range", range.as_str().to_string()),
                    ("interval", "1d".to_string()),
                    ("events", "div".to_string()),
                ],
            )
            .await?;
        parse_chart(&symbol, &body)
    }
}

fn invalid(message: impl Into<String>) -> DashboardError {
    DashboardError::InvalidResponse {
        provider: PROVIDER,
        message: message.into(),
    }
}

fn parse_chart(symbol: &str, body: &Value) -> Result<PriceHistory> {
    if let Some(description) = opt_str(body, "/chart/error/description") {
        return Err(DashboardError::not_found("Symbol", format!("{} ({})", symbol, description)));
    }

    let result = body
        .pointer("/chart/result/0")
        .ok_or_else(|| invalid("chart response has no result"))?;

    let timestamps: Vec<Option<i64>> = result
        .get("timestamp")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().map(Value::as_i64).collect())
        .unwrap_or_default();
    let closes: Vec<Option<f64>> = result
        .pointer("/indicators/quote/0/close")
        .and_then(Value::as_array)
        .map(|c| c.iter().map(Value::as_f64).collect())
        .unwrap_or_default();

    // Pair by position first; a null on either side drops only that day
    let closes = timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            Some(PricePoint {
                timestamp: DateTime::<Utc>::from_timestamp(ts?, 0)?,
                value: close?,
            })
        })
        .collect();

    let mut dividends: Vec<Dividend> = result
        .pointer("/events/dividends")
        .and_then(Value::as_object)
        .map(|events| {
            events
                .values()
                .filter_map(|event| {
                    Some(Dividend {
                        paid_at: DateTime::<Utc>::from_timestamp(event.get("date")?.as_i64()?, 0)?,
                        amount: event.get("amount")?.as_f64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    dividends.sort_by_key(|d| d.paid_at);

    Ok(PriceHistory {
        symbol: symbol.to_string(),
        currency: opt_str(result, "/meta/currency"),
        regular_market_price: opt_f64(result, "/meta/regularMarketPrice"),
        closes,
        dividends,
    })
}

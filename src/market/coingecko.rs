// 🪙 CoinGecko client - read-only crypto prices, market caps and history

use super::http::{opt_f64, opt_str, path_segment, ApiClient};
use super::PricePoint;
use crate::config::ProviderConfig;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

const PROVIDER: &str = "CoinGecko";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Ranges longer than this are requested with daily granularity
const DAILY_INTERVAL_AFTER_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSearchHit {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub thumb: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetails {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub genesis_date: Option<NaiveDate>,
    pub image: Option<String>,
    pub vs_currency: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub circulating_supply: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<PricePoint>,
    pub market_caps: Vec<PricePoint>,
    pub total_volumes: Vec<PricePoint>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    api: ApiClient,
}

impl CoinGeckoClient {
    pub fn new(settings: &ProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = settings.api_key.as_deref() {
            let value = HeaderValue::from_str(key).map_err(|_| DashboardError::Config {
                message: "COINGECKO_API_KEY contains invalid characters".to_string(),
            })?;
            headers.insert(API_KEY_HEADER, value);
        }

        info!(base_url = %settings.base_url, ttl = settings.cache_ttl_secs, "CoinGecko client ready");
        Ok(CoinGeckoClient {
            api: ApiClient::new(PROVIDER, settings, headers)?,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Search coins by name or symbol
    pub async fn search(&self, query: &str) -> Result<Vec<CoinSearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let body = self
            .api
            .get_json("search", &[("query", query.to_string())])
            .await?;
        parse_search(&body)
    }

    /// Detailed data for one coin, prices quoted in `vs_currency`
    pub async fn coin(&self, id: &str, vs_currency: &str) -> Result<CoinDetails> {
        let id = path_segment("coin id", id.trim())?;
        let body = self
            .api
            .get_json(
                &format!("coins/{}", id),
                &[
                    ("localization", "false".to_string()),
                    ("tickers", "false".to_string()),
                    ("community_data", "false".to_string()),
                    ("developer_data", "false".to_string()),
                ],
            )
            .await?;
        parse_coin(&body, vs_currency)
    }

    pub async fn market_chart(&self, id: &str, vs_currency: &str, days: u32) -> Result<MarketChart> {
        let id = path_segment("coin id", id.trim())?;
        let mut query = vec![
            ("vs_currency", vs_currency.to_string()),
            ("days", days.max(1).to_string()),
        ];
        if days > DAILY_INTERVAL_AFTER_DAYS {
            query.push(("interval", "daily".to_string()));
        }

        let body = self
            .api
            .get_json(&format!("coins/{}/market_chart", id), &query)
            .await?;
        parse_market_chart(&body)
    }
}

// ============================================================================
// RESPONSE PARSING
// ============================================================================

fn invalid(message: impl Into<String>) -> DashboardError {
    DashboardError::InvalidResponse {
        provider: PROVIDER,
        message: message.into(),
    }
}

fn parse_search(body: &Value) -> Result<Vec<CoinSearchHit>> {
    let coins = body
        .get("coins")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("search response has no 'coins' array"))?;

    Ok(coins
        .iter()
        .filter_map(|coin| {
            Some(CoinSearchHit {
                id: opt_str(coin, "/id")?,
                name: opt_str(coin, "/name")?,
                symbol: opt_str(coin, "/symbol")?,
                market_cap_rank: coin
                    .get("market_cap_rank")
                    .and_then(Value::as_u64)
                    .map(|r| r as u32),
                thumb: opt_str(coin, "/thumb"),
                large: opt_str(coin, "/large"),
            })
        })
        .collect())
}

fn parse_coin(body: &Value, vs_currency: &str) -> Result<CoinDetails> {
    let vs = vs_currency.to_lowercase();
    Ok(CoinDetails {
        id: opt_str(body, "/id").ok_or_else(|| invalid("coin response has no id"))?,
        symbol: opt_str(body, "/symbol").unwrap_or_default(),
        name: opt_str(body, "/name").unwrap_or_default(),
        genesis_date: opt_str(body, "/genesis_date")
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        image: opt_str(body, "/image/large"),
        current_price: opt_f64(body, &format!("/market_data/current_price/{}", vs)),
        market_cap: opt_f64(body, &format!("/market_data/market_cap/{}", vs)),
        circulating_supply: opt_f64(body, "/market_data/circulating_supply"),
        vs_currency: vs,
    })
}

fn parse_series(body: &Value, field: &str) -> Result<Vec<PricePoint>> {
    let Some(rows) = body.get(field).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    rows.iter()
        .filter_map(|row| {
            let pair = row.as_array()?;
            let ms = pair.first()?.as_f64()?;
            let value = pair.get(1)?.as_f64()?;
            Some((ms, value))
        })
        .map(|(ms, value)| {
            let timestamp = DateTime::<Utc>::from_timestamp_millis(ms as i64)
                .ok_or_else(|| invalid(format!("bad timestamp {} in {}", ms, field)))?;
            Ok(PricePoint { timestamp, value })
        })
        .collect()
}

fn parse_market_chart(body: &Value) -> Result<MarketChart> {
    if body.get("prices").is_none() {
        return Err(invalid("market chart response has no prices"));
    }
    Ok(MarketChart {
        prices: parse_series(body, "prices")?,
        market_caps: parse_series(body, "market_caps")?,
        total_volumes: parse_series(body, "total_volumes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search() {
        let body = json!({
            "coins": [
                {"id": "bitcoin", "name": "Bitcoin", "symbol": "BTC", "market_cap_rank": 1,
                 "thumb": "t.png", "large": "l.png"},
                {"id": "broken"}
            ]
        });

        let hits = parse_search(&body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bitcoin");
        assert_eq!(hits[0].market_cap_rank, Some(1));
    }

    #[test]
    fn test_parse_coin() {
        let body = json!({
            "id": "ethereum",
            "symbol": "eth",
            "name": "Ethereum",
            "genesis_date": "2015-07-30",
            "image": {"large": "eth.png"},
            "market_data": {
                "current_price": {"usd": 3000.0},
                "market_cap": {"usd": 360000000000.0},
                "circulating_supply": 120000000.0
            }
        });

        let coin = parse_coin(&body, "USD").unwrap();
        assert_eq!(coin.vs_currency, "usd");
        assert_eq!(coin.current_price, Some(3000.0));
        assert_eq!(coin.market_cap, Some(360_000_000_000.0));
        assert_eq!(coin.genesis_date, NaiveDate::from_ymd_opt(2015, 7, 30));
    }

    #[test]
    fn test_parse_coin_without_genesis() {
        let body = json!({"id": "x", "genesis_date": null, "market_data": {}});
        let coin = parse_coin(&body, "usd").unwrap();
        assert!(coin.genesis_date.is_none());
        assert!(coin.current_price.is_none());
    }

    #[test]
    fn test_parse_market_chart() {
        let body = json!({
            "prices": [[1704067200000.0, 42000.5], [1704153600000.0, 43000.0]],
            "market_caps": [[1704067200000.0, 8.2e11]],
            "total_volumes": []
        });

        let chart = parse_market_chart(&body).unwrap();
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(chart.prices[0].value, 42000.5);
        assert_eq!(chart.prices[0].timestamp.timestamp(), 1_704_067_200);
        assert_eq!(chart.market_caps.len(), 1);
        assert!(chart.total_volumes.is_empty());
    }

    #[test]
    fn test_market_chart_requires_prices() {
        assert!(parse_market_chart(&json!({"error": "x"})).is_err());
    }
}

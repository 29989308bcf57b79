// 📈 Crypto analytics - market-cap comparisons, ROI, price ratios, indicators, correlation
//
// Pure functions over price series; fetching lives in `coingecko`.

use super::coingecko::CoinDetails;
use super::PricePoint;
use crate::error::{DashboardError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Used when a coin reports no genesis date
pub const FALLBACK_GENESIS: (i32, u32, u32) = (2009, 1, 3);

/// Minimal view of a coin needed for comparisons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: f64,
}

impl TryFrom<&CoinDetails> for CoinSnapshot {
    type Error = DashboardError;

    fn try_from(coin: &CoinDetails) -> Result<Self> {
        let missing = |field: &str| {
            DashboardError::validation(format!("{} has no {} in {}", coin.name, field, coin.vs_currency))
        };
        Ok(CoinSnapshot {
            id: coin.id.clone(),
            name: coin.name.clone(),
            symbol: coin.symbol.to_uppercase(),
            price: coin.current_price.ok_or_else(|| missing("price"))?,
            market_cap: coin.market_cap.ok_or_else(|| missing("market cap"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCapOf {
    pub coin: CoinSnapshot,
    pub reference: CoinSnapshot,
    /// How many times `coin`'s cap fits into `reference`'s
    pub multiplier: f64,
    pub hypothetical_price: f64,
}

impl MarketCapOf {
    /// Percent change from the current price to the hypothetical one
    pub fn upside_percent(&self) -> f64 {
        (self.multiplier - 1.0) * 100.0
    }
}

/// Price of `a` if it had the market cap of `b`
pub fn market_cap_of(a: &CoinSnapshot, b: &CoinSnapshot) -> Result<MarketCapOf> {
    if !(a.market_cap > 0.0) {
        return Err(DashboardError::validation(format!(
            "{} has no positive market cap",
            a.name
        )));
    }
    if !(a.price > 0.0) {
        return Err(DashboardError::validation(format!("{} has no positive price", a.name)));
    }

    let multiplier = b.market_cap / a.market_cap;
    Ok(MarketCapOf {
        coin: a.clone(),
        reference: b.clone(),
        multiplier,
        hypothetical_price: a.price * multiplier,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    pub roi: f64,
    pub start_price: f64,
    pub end_price: f64,
}

impl RoiResult {
    pub fn is_gain(&self) -> bool {
        self.roi >= 1.0
    }
}

/// Multiple of money between the first price at or after `start`
/// and the last price at or before `end`
pub fn roi(history: &[PricePoint], start: DateTime<Utc>, end: DateTime<Utc>) -> Result<RoiResult> {
    if start >= end {
        return Err(DashboardError::validation("Start date must be before end date"));
    }

    let start_price = history
        .iter()
        .find(|p| p.timestamp >= start)
        .map(|p| p.value)
        .ok_or_else(|| DashboardError::validation("No price data after the start date"))?;
    let end_price = history
        .iter()
        .rev()
        .find(|p| p.timestamp <= end)
        .map(|p| p.value)
        .ok_or_else(|| DashboardError::validation("No price data before the end date"))?;

    if start_price <= 0.0 {
        return Err(DashboardError::validation("Start price must be positive"));
    }

    Ok(RoiResult {
        roi: end_price / start_price,
        start_price,
        end_price,
    })
}

/// `2.50x`, or `150.00%` when `as_percentage`
pub fn format_roi(value: f64, as_percentage: bool) -> String {
    if as_percentage {
        format!("{:.2}%", (value - 1.0) * 100.0)
    } else {
        format!("{:.2}x", value)
    }
}

/// First date both coins existed on, for ROI comparisons
pub fn earliest_common_start(a: Option<NaiveDate>, b: Option<NaiveDate>) -> NaiveDate {
    let (y, m, d) = FALLBACK_GENESIS;
    let fallback = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    a.unwrap_or(fallback).max(b.unwrap_or(fallback))
}

/// Pairs of values sharing a timestamp, in time order
fn align(a: &[PricePoint], b: &[PricePoint]) -> Vec<(DateTime<Utc>, f64, f64)> {
    let lookup: HashMap<DateTime<Utc>, f64> = b.iter().map(|p| (p.timestamp, p.value)).collect();
    let mut pairs: Vec<_> = a
        .iter()
        .filter_map(|p| lookup.get(&p.timestamp).map(|v| (p.timestamp, p.value, *v)))
        .collect();
    pairs.sort_by_key(|(ts, _, _)| *ts);
    pairs.dedup_by_key(|(ts, _, _)| *ts);
    pairs
}

/// Last value of each UTC day, stamped at midnight, so series from different sources line up
pub fn daily_closes(points: &[PricePoint]) -> Vec<PricePoint> {
    let mut by_day: BTreeMap<NaiveDate, PricePoint> = BTreeMap::new();
    for point in points {
        let day = point.timestamp.date_naive();
        match by_day.get(&day) {
            Some(existing) if existing.timestamp > point.timestamp => {}
            _ => {
                by_day.insert(day, *point);
            }
        }
    }
    by_day
        .into_iter()
        .map(|(day, point)| PricePoint::new(day.and_time(NaiveTime::MIN).and_utc(), point.value))
        .collect()
}

/// a / b over the timestamps present in both series
pub fn price_ratio(a: &[PricePoint], b: &[PricePoint]) -> Vec<PricePoint> {
    align(a, b)
        .into_iter()
        .filter(|(_, _, denominator)| *denominator != 0.0)
        .map(|(timestamp, numerator, denominator)| PricePoint::new(timestamp, numerator / denominator))
        .collect()
}

/// Simple moving average; `None` until `period` values are available
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }
        out.push((i + 1 >= period).then(|| sum / period as f64));
    }
    out
}

/// Exponential moving average with alpha = 2 / (span + 1), seeded with the first value
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;

    for value in values {
        let next = match previous {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => *value,
        };
        out.push(next);
        previous = Some(next);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBand {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1)
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Bands at `k` sample standard deviations around the rolling mean of `window` values
pub fn bollinger_bands(values: &[f64], window: usize, k: f64) -> Vec<Option<BollingerBand>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let middle = mean(slice)?;
            let std = sample_std(slice)?;
            Some(BollingerBand {
                middle,
                upper: middle + k * std,
                lower: middle - k * std,
            })
        })
        .collect()
}

pub(crate) fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pearson correlation between every pair of named series, aligned on common timestamps
pub fn correlation_matrix(
    series: &BTreeMap<String, Vec<PricePoint>>,
) -> BTreeMap<String, BTreeMap<String, Option<f64>>> {
    let mut matrix = BTreeMap::new();
    for (name_a, a) in series {
        let row = series
            .iter()
            .map(|(name_b, b)| {
                let pairs: Vec<(f64, f64)> = align(a, b).into_iter().map(|(_, x, y)| (x, y)).collect();
                (name_b.clone(), pearson(&pairs))
            })
            .collect();
        matrix.insert(name_a.clone(), row);
    }
    matrix
}

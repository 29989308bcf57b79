// 🏢 Fund analytics - returns, risk metrics and the dividend income planner
//
// All series are daily closes, oldest first. Percentages are returned as percent
// (12.5 means 12.5%), drawdowns as fractions.

use super::crypto::{mean, sample_std};
use super::stocks::{Dividend, PriceHistory};
use super::PricePoint;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const TRADING_DAYS_PER_YEAR: usize = 252;
pub const TRADING_DAYS_PER_MONTH: usize = 21;
/// Annual risk-free rate used when none is configured (CDI)
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.1365;

/// Real-estate funds tracked by default, grouped by sector
pub const DEFAULT_UNIVERSE: &[(&str, &[&str])] = &[
    ("Logistics", &["HGLG11", "XPLG11", "VILG11", "BRCO11", "LVBI11"]),
    ("Shopping Malls", &["XPML11", "VISC11", "HSML11", "MALL11", "VRTA11"]),
    ("Offices", &["KNRI11", "PVBI11", "RCRB11", "BRCR11", "HGRE11"]),
    ("Receivables", &["KNIP11", "KNCR11", "MXRF11", "RECT11", "VCJR11"]),
    ("Hybrid", &["GGRC11", "RBRR11", "RBRF11", "VGIR11", "VGHF11"]),
    ("Others", &["BTLG11", "HCTR11", "VINO11", "TRXF11", "SDIL11"]),
];

/// Exchange symbol for a B3-listed ticker
pub fn exchange_symbol(ticker: &str) -> String {
    let ticker = ticker.trim().to_uppercase();
    if ticker.ends_with(".SA") {
        ticker
    } else {
        format!("{}.SA", ticker)
    }
}

pub fn sector_of(ticker: &str) -> Option<&'static str> {
    let ticker = ticker.trim().trim_end_matches(".SA").to_uppercase();
    DEFAULT_UNIVERSE
        .iter()
        .find(|(_, tickers)| tickers.contains(&ticker.as_str()))
        .map(|(sector, _)| *sector)
}

/// Daily risk-free return compounding to `annual_rate` over a trading year
pub fn daily_risk_free(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / TRADING_DAYS_PER_YEAR as f64) - 1.0
}

/// Daily returns stamped with the later day, for aligning funds on common dates
pub fn return_series(closes: &[PricePoint]) -> Vec<PricePoint> {
    closes
        .windows(2)
        .filter(|w| w[0].value != 0.0)
        .map(|w| PricePoint::new(w[1].timestamp, w[1].value / w[0].value - 1.0))
        .collect()
}

/// Day-over-day fractional changes; pairs starting at zero are skipped
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Return over the last `periods` trading days, in percent
pub fn period_return(prices: &[f64], periods: usize) -> Option<f64> {
    if periods == 0 || prices.len() <= periods {
        return None;
    }
    let last = *prices.last()?;
    let base = prices[prices.len() - 1 - periods];
    (base != 0.0).then(|| (last / base - 1.0) * 100.0)
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Annualized sample volatility of daily returns, in percent
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    Some(sample_std(returns)? * (TRADING_DAYS_PER_YEAR as f64).sqrt() * 100.0)
}

/// Rolling one-month annualized volatility
pub fn rolling_volatility(returns: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..returns.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                None
            } else {
                annualized_volatility(&returns[i + 1 - window..=i])
            }
        })
        .collect()
}

pub fn sharpe_ratio(returns: &[f64], annual_risk_free: f64) -> Option<f64> {
    let rf = daily_risk_free(annual_risk_free);
    let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
    let std = sample_std(&excess)?;
    if std == 0.0 {
        return None;
    }
    Some((TRADING_DAYS_PER_YEAR as f64).sqrt() * mean(&excess)? / std)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Consistency {
    pub positive_days: usize,
    pub negative_days: usize,
    /// Percent
    pub best_day: Option<f64>,
    pub worst_day: Option<f64>,
    pub above_risk_free: usize,
    pub below_risk_free: usize,
}

pub fn consistency(returns: &[f64], annual_risk_free: f64) -> Consistency {
    let rf = daily_risk_free(annual_risk_free);
    let best = returns.iter().copied().fold(None, |acc: Option<f64>, r| {
        Some(acc.map_or(r, |a| a.max(r)))
    });
    let worst = returns.iter().copied().fold(None, |acc: Option<f64>, r| {
        Some(acc.map_or(r, |a| a.min(r)))
    });

    Consistency {
        positive_days: returns.iter().filter(|r| **r > 0.0).count(),
        negative_days: returns.iter().filter(|r| **r < 0.0).count(),
        best_day: best.map(|r| r * 100.0),
        worst_day: worst.map(|r| r * 100.0),
        above_risk_free: returns.iter().filter(|r| **r > rf).count(),
        below_risk_free: returns.iter().filter(|r| **r < rf).count(),
    }
}

/// Fractional distance below the running peak (0 at a new high)
pub fn drawdown(prices: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    prices
        .iter()
        .map(|price| {
            peak = peak.max(*price);
            if peak > 0.0 {
                price / peak - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn max_drawdown(prices: &[f64]) -> f64 {
    drawdown(prices).into_iter().fold(0.0, f64::min)
}

/// Cumulative return against the first price, in percent
pub fn accumulated_returns(prices: &[f64]) -> Vec<f64> {
    match prices.first() {
        Some(first) if *first != 0.0 => prices.iter().map(|p| (p / first - 1.0) * 100.0).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMetrics {
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_12m: Option<f64>,
    pub volatility_12m: Option<f64>,
    pub volatility_total: Option<f64>,
    pub sharpe_12m: Option<f64>,
    pub sharpe_total: Option<f64>,
    pub max_drawdown: f64,
    pub consistency: Consistency,
}

impl FundMetrics {
    pub fn from_history(prices: &[f64], annual_risk_free: f64) -> Self {
        let returns = daily_returns(prices);
        let last_year = tail(&returns, TRADING_DAYS_PER_YEAR);

        FundMetrics {
            return_1m: period_return(prices, TRADING_DAYS_PER_MONTH),
            return_3m: period_return(prices, TRADING_DAYS_PER_MONTH * 3),
            return_6m: period_return(prices, TRADING_DAYS_PER_MONTH * 6),
            return_12m: period_return(prices, TRADING_DAYS_PER_YEAR),
            volatility_12m: annualized_volatility(last_year),
            volatility_total: annualized_volatility(&returns),
            sharpe_12m: sharpe_ratio(last_year, annual_risk_free),
            sharpe_total: sharpe_ratio(&returns, annual_risk_free),
            max_drawdown: max_drawdown(prices),
            consistency: consistency(&returns, annual_risk_free),
        }
    }
}

// ============================================================================
// INCOME PLANNER
// ============================================================================

/// Dividends paid in the 12 months before `now`, as percent of `price`
pub fn dividend_yield_12m(dividends: &[Dividend], price: f64, now: DateTime<Utc>) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    let since = now - Duration::days(365);
    let paid: f64 = dividends
        .iter()
        .filter(|d| d.paid_at >= since && d.paid_at <= now)
        .map(|d| d.amount)
        .sum();
    paid / price * 100.0
}

/// Shares needed for `monthly_income` at the given price and yield; 0 when either is 0
pub fn required_shares(monthly_income: f64, price: f64, dividend_yield: f64) -> u64 {
    if price <= 0.0 || dividend_yield <= 0.0 || monthly_income <= 0.0 {
        return 0;
    }
    let income_per_share = price * (dividend_yield / 100.0 / 12.0);
    (monthly_income / income_per_share).ceil() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundQuote {
    pub ticker: String,
    pub sector: String,
    pub price: f64,
    pub dividend_yield_12m: f64,
}

impl FundQuote {
    pub fn from_history(ticker: &str, sector: &str, history: &PriceHistory, now: DateTime<Utc>) -> Self {
        let price = history.last_price().unwrap_or(0.0);
        FundQuote {
            ticker: ticker.to_string(),
            sector: sector.to_string(),
            price,
            dividend_yield_12m: dividend_yield_12m(&history.dividends, price, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePlanRow {
    pub ticker: String,
    pub sector: String,
    pub price: f64,
    pub dividend_yield_12m: f64,
    pub required_shares: u64,
    pub required_investment: f64,
}

/// Split `desired_monthly_income` evenly across `quotes`
///
/// Rows come back sorted by sector, then by yield (highest first).
pub fn income_plan(quotes: &[FundQuote], desired_monthly_income: f64) -> Vec<IncomePlanRow> {
    if quotes.is_empty() {
        return Vec::new();
    }
    let per_fund = desired_monthly_income / quotes.len() as f64;

    let mut rows: Vec<IncomePlanRow> = quotes
        .iter()
        .map(|q| {
            let shares = required_shares(per_fund, q.price, q.dividend_yield_12m);
            IncomePlanRow {
                ticker: q.ticker.clone(),
                sector: q.sector.clone(),
                price: q.price,
                dividend_yield_12m: q.dividend_yield_12m,
                required_shares: shares,
                required_investment: if q.price > 0.0 { shares as f64 * q.price } else { 0.0 },
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.sector.cmp(&b.sector).then_with(|| {
            b.dividend_yield_12m
                .partial_cmp(&a.dividend_yield_12m)
                .unwrap_or(Ordering::Equal)
        })
    });
    rows
}

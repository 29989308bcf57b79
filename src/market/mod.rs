// Market data: cached provider clients plus the crypto and fund analytics built on them

pub mod cache;
pub mod coingecko;
pub mod crypto;
pub mod funds;
pub mod http;
pub mod stocks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of a time series (price, market cap, volume)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        PricePoint { timestamp, value }
    }
}

pub use cache::TtlCache;
pub use coingecko::{CoinDetails, CoinGeckoClient, CoinSearchHit, MarketChart};
pub use crypto::{CoinSnapshot, MarketCapOf, RoiResult};
pub use funds::{FundMetrics, IncomePlanRow};
pub use http::{ApiClient, RetryPolicy};
pub use stocks::{Dividend, HistoryRange, PriceHistory, StockClient};

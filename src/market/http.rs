// 🌐 Cached JSON client with retry/backoff, shared by the market data providers

use super::cache::TtlCache;
use crate::config::ProviderConfig;
use crate::error::{DashboardError, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest server-requested wait we are willing to honour
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: base, 2*base, 4*base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    provider: &'static str,
    http: Client,
    base_url: String,
    headers: HeaderMap,
    cache: Arc<TtlCache<Value>>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(provider: &'static str, settings: &ProviderConfig, headers: HeaderMap) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("finance-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            provider,
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            headers,
            cache: Arc::new(TtlCache::new(
                settings.cache_ttl(),
                settings.max_cache_entries,
            )),
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                base_delay: settings.retry_base_delay(),
            },
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    fn cache_key(path: &str, query: &[(&str, String)]) -> String {
        let params: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}?{}", path, params.join("&"))
    }

    /// GET `{base_url}/{path}` as JSON, served from cache while fresh
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let key = Self::cache_key(path, query);
        if let Some(cached) = self.cache.get(&key) {
            debug!(provider = self.provider, %key, "cache hit");
            return Ok(cached);
        }

        let value = self.fetch(path, query).await?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut attempt: u32 = 0;

        loop {
            let sent = self
                .http
                .get(&url)
                .headers(self.headers.clone())
                .query(query)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(provider = self.provider, %url, error = %e, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status.is_success() {
                debug!(provider = self.provider, %url, attempt, "fetched");
                return Ok(response.json::<Value>().await?);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < self.retry.max_retries {
                let delay = retry_after(&response).unwrap_or_else(|| self.retry.delay_for(attempt));
                warn!(provider = self.provider, %url, status = status.as_u16(), ?delay, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(DashboardError::RateLimited {
                    provider: self.provider,
                    attempts: attempt + 1,
                });
            }

            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Api {
                provider: self.provider,
                status: status.as_u16(),
                message: truncate(&body, 200),
            });
        }
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

/// A user-supplied id that is safe to splice into a request path
pub(crate) fn path_segment<'a>(label: &str, value: &'a str) -> Result<&'a str> {
    let valid = !value.is_empty()
        && !value.chars().all(|c| c == '.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(value)
    } else {
        Err(DashboardError::validation(format!("Invalid {}: '{}'", label, value)))
    }
}

/// Read a number that providers sometimes send as null
pub(crate) fn opt_f64(value: &Value, pointer: &str) -> Option<f64> {
    value.pointer(pointer).and_then(Value::as_f64)
}

pub(crate) fn opt_str(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment_accepts_ids_and_tickers() {
        assert_eq!(path_segment("coin id", "bitcoin").unwrap(), "bitcoin");
        assert_eq!(path_segment("coin id", "usd-coin").unwrap(), "usd-coin");
        assert_eq!(path_segment("symbol", "HGLG11.SA").unwrap(), "HGLG11.SA");
    }

    #[test]
    fn test_path_segment_rejects_path_tricks() {
        for bad in ["", ".", "..", "bitcoin/tickers", "../search", "btc?x=1", "a b", "bit%2Fcoin"] {
            assert!(
                matches!(path_segment("coin id", bad), Err(DashboardError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_cache_key_includes_query() {
        let key = ApiClient::cache_key("search", &[("query", "btc".to_string())]);
        assert_eq!(key, "search?query=btc");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }

    #[test]
    fn test_json_helpers() {
        let value = serde_json::json!({"a": {"b": 1.5, "c": null, "d": "x"}});
        assert_eq!(opt_f64(&value, "/a/b"), Some(1.5));
        assert_eq!(opt_f64(&value, "/a/c"), None);
        assert_eq!(opt_str(&value, "/a/d").as_deref(), Some("x"));
    }
}

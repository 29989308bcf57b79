// ⚙️ Configuration - TOML file with environment overrides
//
// Every field has a default, so running without a config file works.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub coingecko: ProviderConfig,
    pub stocks: ProviderConfig,
    pub projection: ProjectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of the flat-file snapshot (CSV + JSON)
    pub data_dir: PathBuf,
    /// SQLite ledger of transactions
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("data"),
            database_path: PathBuf::from("data/ledger.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Settings shared by the market data providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Empty means the provider's public endpoint
    pub base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
    pub max_cache_entries: usize,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: String::new(),
            api_key: None,
            cache_ttl_secs: 300,
            max_cache_entries: 100,
            max_retries: 3,
            retry_base_delay_ms: 500,
            timeout_secs: 15,
        }
    }
}

impl ProviderConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn fill_base_url(&mut self, default: &str) {
        if self.base_url.trim().is_empty() {
            self.base_url = default.to_string();
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }

    fn validate(&self, section: &str) -> Result<()> {
        reqwest::Url::parse(&self.base_url).map_err(|e| DashboardError::Config {
            message: format!("{}.base_url '{}' is invalid: {}", section, self.base_url, e),
        })?;
        if self.cache_ttl_secs == 0 {
            return Err(DashboardError::Config {
                message: format!("{}.cache_ttl_secs must be greater than 0", section),
            });
        }
        if self.max_cache_entries == 0 {
            return Err(DashboardError::Config {
                message: format!("{}.max_cache_entries must be greater than 0", section),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub annual_return: f64,
    pub target_net_worth: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig {
            annual_return: crate::projection::DEFAULT_ANNUAL_RETURN,
            target_net_worth: crate::projection::DEFAULT_TARGET,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    /// JSON lines instead of the compact formatter
    pub json: bool,
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicit path must exist; without one, `dashboard.toml` in the working
    /// directory is used when present. Environment variables win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                AppConfig::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.finalize()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup` (injectable for tests)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("COINGECKO_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.coingecko.api_key = Some(key);
        }
        if let Some(dir) = lookup("DASHBOARD_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(db) = lookup("DASHBOARD_DB_PATH") {
            self.storage.database_path = PathBuf::from(db);
        }
        if let Some(addr) = lookup("DASHBOARD_ADDR") {
            self.server.addr = addr;
        }
    }

    /// Fill provider defaults and validate
    pub fn finalize(&mut self) -> Result<()> {
        self.coingecko.fill_base_url(COINGECKO_BASE_URL);
        self.stocks.fill_base_url(YAHOO_BASE_URL);
        self.validate()?;

        if self.coingecko.api_key.is_none() {
            warn!("COINGECKO_API_KEY is not set; using the public rate limit");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.coingecko.validate("coingecko")?;
        self.stocks.validate("stocks")?;

        if !self.projection.annual_return.is_finite() || self.projection.annual_return < 0.0 {
            return Err(DashboardError::Config {
                message: "projection.annual_return must be a non-negative number".to_string(),
            });
        }
        if self.projection.target_net_worth <= 0.0 {
            return Err(DashboardError::Config {
                message: "projection.target_net_worth must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_finalize() {
        let mut config = AppConfig::default();
        config.finalize().unwrap();

        assert_eq!(config.coingecko.base_url, COINGECKO_BASE_URL);
        assert_eq!(config.stocks.base_url, YAHOO_BASE_URL);
        assert_eq!(config.coingecko.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_partial_toml() {
        let mut config = AppConfig::from_toml_str(
            r#"
            [coingecko]
            cache_ttl_secs = 60
            base_url = "http://localhost:9999/api/v3/"

            [projection]
            annual_return = 0.08
            "#,
        )
        .unwrap();
        config.finalize().unwrap();

        assert_eq!(config.coingecko.cache_ttl_secs, 60);
        assert_eq!(config.coingecko.max_retries, 3);
        assert_eq!(config.coingecko.base_url, "http://localhost:9999/api/v3");
        assert_eq!(config.stocks.base_url, YAHOO_BASE_URL);
        assert_eq!(config.projection.annual_return, 0.08);
        assert_eq!(config.projection.target_net_worth, 1_000_000.0);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("COINGECKO_API_KEY", "demo-key"),
            ("DASHBOARD_DATA_DIR", "/tmp/finance"),
            ("DASHBOARD_ADDR", "127.0.0.1:8080"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.coingecko.api_key.as_deref(), Some("demo-key"));
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/finance"));
        assert_eq!(config.server.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|k| (k == "COINGECKO_API_KEY").then(|| "  ".to_string()));
        assert!(config.coingecko.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut zero_ttl = AppConfig::from_toml_str("[stocks]\ncache_ttl_secs = 0").unwrap();
        assert!(zero_ttl.finalize().is_err());

        let mut bad_url = AppConfig::from_toml_str("[coingecko]\nbase_url = \"not a url\"").unwrap();
        assert!(bad_url.finalize().is_err());

        let mut bad_target =
            AppConfig::from_toml_str("[projection]\ntarget_net_worth = 0.0").unwrap();
        assert!(bad_target.finalize().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = AppConfig::from_toml_str("[coingecko\n").unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }
}

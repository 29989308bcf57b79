// Error taxonomy for the dashboard library
// Validation failures carry the exact user-facing message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} rate limit exceeded after {attempts} attempts")]
    RateLimited {
        provider: &'static str,
        attempts: u32,
    },

    #[error("Unexpected {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DashboardError {
    pub fn validation(message: impl Into<String>) -> Self {
        DashboardError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DashboardError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// True for errors caused by caller input rather than the environment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation(_) | DashboardError::NotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = DashboardError::validation("Amount must be positive");
        assert_eq!(err.to_string(), "Amount must be positive");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_not_found_message() {
        let err = DashboardError::not_found("Transaction", "abc");
        assert_eq!(err.to_string(), "Transaction not found: abc");
    }

    #[test]
    fn test_rate_limited_is_not_client_error() {
        let err = DashboardError::RateLimited {
            provider: "CoinGecko",
            attempts: 3,
        };
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("3 attempts"));
    }
}

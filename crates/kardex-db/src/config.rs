//! Engine configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use kardex_core::Quantity;

/// Tuning knobs for [`crate::InventoryEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a write is retried after losing an append race.
    /// Default: 3
    pub max_conflict_retries: u32,

    /// Upper bound for one transaction attempt.
    /// Default: 30 seconds
    pub transaction_timeout: Duration,

    /// Partitions below this balance are reported by `low_stock`.
    /// Default: 10 units
    pub low_stock_threshold: Quantity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_conflict_retries: 3,
            transaction_timeout: Duration::from_secs(30),
            low_stock_threshold: Quantity::from_units(10),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `KARDEX_MAX_CONFLICT_RETRIES` | `3` |
    /// | `KARDEX_TX_TIMEOUT_MS` | `30000` |
    /// | `KARDEX_LOW_STOCK_THRESHOLD` | `10` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        Ok(EngineConfig {
            max_conflict_retries: parse_var("KARDEX_MAX_CONFLICT_RETRIES")?
                .unwrap_or(defaults.max_conflict_retries),

            transaction_timeout: parse_var::<u64>("KARDEX_TX_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.transaction_timeout),

            low_stock_threshold: parse_var("KARDEX_LOW_STOCK_THRESHOLD")?
                .unwrap_or(defaults.low_stock_threshold),
        })
    }

    pub fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn low_stock_threshold(mut self, threshold: Quantity) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

/// Reads and parses an optional environment variable.
pub(crate) fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.transaction_timeout, Duration::from_secs(30));
        assert_eq!(config.low_stock_threshold, Quantity::from_units(10));
    }

    // Each test touches its own variable; the process environment is shared
    // between test threads.
    #[test]
    fn test_parse_var() {
        env::set_var("KARDEX_TEST_PARSE_OK", " 7 ");
        assert_eq!(parse_var::<u32>("KARDEX_TEST_PARSE_OK").unwrap(), Some(7));

        env::set_var("KARDEX_TEST_PARSE_BAD", "seven");
        assert!(matches!(
            parse_var::<u32>("KARDEX_TEST_PARSE_BAD"),
            Err(ConfigError::InvalidValue(name)) if name == "KARDEX_TEST_PARSE_BAD"
        ));

        assert_eq!(parse_var::<u32>("KARDEX_TEST_PARSE_UNSET").unwrap(), None);
    }

    #[test]
    fn test_fractional_threshold_parses() {
        env::set_var("KARDEX_TEST_THRESHOLD", "2.5");
        let q: Option<Quantity> = parse_var("KARDEX_TEST_THRESHOLD").unwrap();
        assert_eq!(q, Some(Quantity::from_scaled(25_000)));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .max_conflict_retries(10)
            .transaction_timeout(Duration::from_millis(500));
        assert_eq!(config.max_conflict_retries, 10);
        assert_eq!(config.transaction_timeout, Duration::from_millis(500));
    }
}

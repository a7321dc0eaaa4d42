//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Every table and field has a default, so an empty file is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credentials::{TokenCacheSettings, DEFAULT_REFRESH_BUFFER, DEFAULT_TOKEN_DURATION};
use crate::resilience::RetryPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Credential token cache settings.
    pub token_cache: TokenCacheConfig,

    /// OCC retry policy.
    pub occ_retry: OccRetryConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Token cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TokenCacheConfig {
    /// Fraction of token lifetime before expiry that triggers a refresh.
    pub refresh_buffer: f64,

    /// Lifetime in seconds assumed for tokens requested without a duration.
    pub default_token_duration_secs: u64,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            default_token_duration_secs: DEFAULT_TOKEN_DURATION.as_secs(),
        }
    }
}

impl From<&TokenCacheConfig> for TokenCacheSettings {
    fn from(config: &TokenCacheConfig) -> Self {
        Self {
            refresh_buffer: config.refresh_buffer,
            default_token_duration: Duration::from_secs(config.default_token_duration_secs),
        }
    }
}

/// OCC retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OccRetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Wait before the first retry in milliseconds.
    pub initial_wait_ms: u64,

    /// Maximum base wait between retries in milliseconds.
    pub max_wait_ms: u64,

    /// Exponential growth factor for the wait.
    pub multiplier: f64,
}

impl Default for OccRetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_wait_ms: policy.initial_wait.as_millis() as u64,
            max_wait_ms: policy.max_wait.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

impl From<&OccRetryConfig> for RetryPolicy {
    fn from(config: &OccRetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_wait: Duration::from_millis(config.initial_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
            multiplier: config.multiplier,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        let config = ResilienceConfig::default();

        assert_eq!(TokenCacheSettings::from(&config.token_cache), TokenCacheSettings::default());
        assert_eq!(RetryPolicy::from(&config.occ_retry), RetryPolicy::default());
        assert!(!config.observability.metrics_enabled);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [occ_retry]
            max_retries = 5

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.occ_retry.max_retries, 5);
        assert_eq!(config.occ_retry.initial_wait_ms, 100);
        assert_eq!(config.token_cache.default_token_duration_secs, 900);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer fraction, waits, multiplier)
//! - Check observability settings are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: &ResilienceConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ResilienceConfig;
use crate::resilience::RetryPolicy;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("token_cache.refresh_buffer must be in [0, 1), got {0}")]
    RefreshBuffer(f64),

    #[error("token_cache.default_token_duration_secs must be greater than zero")]
    TokenDuration,

    #[error("occ_retry: {0}")]
    RetryPolicy(String),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let buffer = config.token_cache.refresh_buffer;
    if !(0.0..1.0).contains(&buffer) {
        errors.push(ValidationError::RefreshBuffer(buffer));
    }
    if config.token_cache.default_token_duration_secs == 0 {
        errors.push(ValidationError::TokenDuration);
    }

    if let Err(reason) = RetryPolicy::from(&config.occ_retry).validate() {
        errors.push(ValidationError::RetryPolicy(reason));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ResilienceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ResilienceConfig::default();
        config.token_cache.refresh_buffer = 1.5;
        config.token_cache.default_token_duration_secs = 0;
        config.occ_retry.multiplier = 0.5;
        config.observability.log_level = "loud".to_string();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::RefreshBuffer(1.5)));
        assert!(errors.contains(&ValidationError::TokenDuration));
        assert!(errors.contains(&ValidationError::LogLevel("loud".to_string())));
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ResilienceConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_wait_ordering() {
        let mut config = ResilienceConfig::default();
        config.occ_retry.initial_wait_ms = 1000;
        config.occ_retry.max_wait_ms = 10;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::RetryPolicy(_)]));
    }
}

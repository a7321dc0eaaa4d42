//! Retry policy, attempt outcomes and error definitions.

use std::time::Duration;

use thiserror::Error;

/// Store code for a row-level mutation conflict with another transaction.
pub const ERROR_CODE_MUTATION: &str = "OC000";

/// Store code for a conflict with a concurrent schema (catalog) change.
pub const ERROR_CODE_SCHEMA: &str = "OC001";

/// SQLSTATE class reported for serialization failures.
pub const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// Backoff and attempt bounds for one retried call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_wait: Duration,
    /// Upper bound for the base wait.
    pub max_wait: Duration,
    /// Growth factor applied to the base wait after every retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_wait: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Default policy with a different retry count.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Check the policy invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_wait.is_zero() {
            return Err("initial_wait must be greater than zero".to_string());
        }
        if self.max_wait < self.initial_wait {
            return Err(format!(
                "max_wait ({:?}) must be at least initial_wait ({:?})",
                self.max_wait, self.initial_wait
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            return Err(format!(
                "multiplier must be a finite value greater than 1, got {}",
                self.multiplier
            ));
        }
        Ok(())
    }
}

/// Classified result of a single attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    Success(T),
    RetryableConflict(E),
    FatalError(E),
}

/// Errors returned by the retry executor.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// A transaction could not be started. Never retried.
    #[error("begin transaction: {0}")]
    Begin(#[source] E),

    /// Commit failed with an error that is not an OCC conflict.
    #[error("commit transaction: {0}")]
    Commit(#[source] E),

    /// The unit of work failed with an error that is not an OCC conflict.
    #[error(transparent)]
    Fatal(E),

    /// Every attempt ended in an OCC conflict.
    #[error("max retries ({max_retries}) exceeded after {attempts} attempts, last error: {last}")]
    AttemptsExceeded {
        attempts: u32,
        max_retries: u32,
        #[source]
        last: E,
    },

    /// The caller cancelled before the work could complete.
    #[error("operation cancelled")]
    Cancelled,

    /// The retry policy violates its invariants.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
}

impl<E> RetryError<E> {
    /// The underlying store or application error, if any.
    pub fn inner(&self) -> Option<&E> {
        match self {
            RetryError::Begin(e) | RetryError::Commit(e) | RetryError::Fatal(e) => Some(e),
            RetryError::AttemptsExceeded { last, .. } => Some(last),
            RetryError::Cancelled | RetryError::InvalidPolicy(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }

    pub fn is_attempts_exceeded(&self) -> bool {
        matches!(self, RetryError::AttemptsExceeded { .. })
    }
}

/// Result type for retried operations.
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

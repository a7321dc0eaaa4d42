//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::resilience::types::RetryPolicy;

/// Backoff state for a single retried call.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max_wait: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            current: policy.initial_wait,
            max_wait: policy.max_wait,
            multiplier: policy.multiplier,
        }
    }

    /// Base wait for the next round, without jitter.
    pub fn base_delay(&self) -> Duration {
        self.current
    }

    /// Return `base + jitter` for this round and grow the base for the next one.
    ///
    /// Jitter is uniform in `[0, base / 4)`. Arithmetic saturates: a base that
    /// would overflow `Duration` is capped at `max_wait`.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        let jitter_range = base / 4;
        let jitter = if jitter_range.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..jitter_range)
        };

        self.current = Duration::try_from_secs_f64(base.as_secs_f64() * self.multiplier)
            .map_or(self.max_wait, |next| next.min(self.max_wait));
        base.saturating_add(jitter)
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` if the wait was cut short by cancellation.
pub async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

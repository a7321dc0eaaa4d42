//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dsql_token_cache_hits_total` (counter): tokens served from cache
//! - `dsql_token_cache_misses_total` (counter): lookups that needed issuance
//! - `dsql_token_issuance_total` (counter): issuance calls by outcome
//! - `dsql_token_cache_entries` (gauge): cached token count
//! - `dsql_occ_attempts_total` (counter): transaction attempts by operation
//! - `dsql_occ_conflicts_total` (counter): OCC conflicts observed
//! - `dsql_occ_retries_exhausted_total` (counter): calls that ran out of attempts
//! - `dsql_occ_fatal_total` (counter): calls ended by a non-retryable error
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without a recorder it is a no-op
//! - Prometheus exposition is opt-in via [`install_prometheus_exporter`]

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_cache_hit() {
    counter!("dsql_token_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("dsql_token_cache_misses_total").increment(1);
}

/// Record an issuance call. `outcome` is one of `success`, `error`, `empty`, `cancelled`.
pub fn record_issuance(outcome: &'static str) {
    counter!("dsql_token_issuance_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("dsql_token_cache_entries").set(size as f64);
}

pub fn record_attempt(operation: &'static str) {
    counter!("dsql_occ_attempts_total", "operation" => operation).increment(1);
}

pub fn record_conflict(operation: &'static str) {
    counter!("dsql_occ_conflicts_total", "operation" => operation).increment(1);
}

pub fn record_retries_exhausted(operation: &'static str) {
    counter!("dsql_occ_retries_exhausted_total", "operation" => operation).increment(1);
}

pub fn record_fatal(operation: &'static str) {
    counter!("dsql_occ_fatal_total", "operation" => operation).increment(1);
}

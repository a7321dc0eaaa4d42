//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! credentials + resilience produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder on its own
//! - Secrets are never logged or used as metric labels

pub mod logging;
pub mod metrics;

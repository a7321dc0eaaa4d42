//! Resilience subsystem: optimistic-concurrency retries.
//!
//! # Data Flow
//! ```text
//! Application unit of work
//!     → retries.rs (begin, run, commit; one transaction per attempt)
//!     → On failure: classify.rs (OCC conflict or fatal?)
//!         conflict → backoff.rs (exponential wait + jitter, cancellable) → next attempt
//!         fatal    → returned to the caller immediately
//!     → transaction.rs (resource and transaction boundary)
//! ```
//!
//! # Design Decisions
//! - Only OCC conflicts are retried; everything else is surfaced as-is
//! - Conflicts found at commit are retried like conflicts from the work itself
//! - Jittered backoff prevents synchronized retry storms
//! - The attempt budget and the caller's cancellation bound every call

pub mod backoff;
pub mod classify;
pub mod retries;
pub mod transaction;
pub mod types;

pub use backoff::Backoff;
pub use classify::{classify, is_occ_code, is_occ_error, is_occ_error_opt};
pub use retries::{exec_with_policy, exec_with_retry, with_retry};
pub use transaction::{DatabaseError, Transaction, TransactionalResource};
pub use types::{
    AttemptOutcome, RetryError, RetryPolicy, RetryResult, ERROR_CODE_MUTATION, ERROR_CODE_SCHEMA,
    SQLSTATE_SERIALIZATION_FAILURE,
};

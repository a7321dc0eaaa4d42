//! Resilience layer for Aurora DSQL clients.
//!
//! Two independent subsystems, composed by the caller's connection pool:
//! - [`credentials`]: cache of IAM authentication tokens with proactive refresh
//!   and at most one concurrent issuance per identity
//! - [`resilience`]: retry executor for transactions that fail with
//!   optimistic-concurrency conflicts
//!
//! ```text
//!  pool: before connect ──▶ CredentialCache::get_token ──▶ TokenIssuer (identity service)
//!  app:  business logic ──▶ with_retry ──▶ TransactionalResource (begin/commit/rollback)
//! ```

pub mod config;
pub mod credentials;
pub mod observability;
pub mod resilience;

pub use config::ResilienceConfig;
pub use credentials::{CredentialCache, TokenIssuer};
pub use resilience::{exec_with_retry, is_occ_error, with_retry, RetryError, RetryPolicy};

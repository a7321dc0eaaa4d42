//! Credential token cache subsystem.
//!
//! # Data Flow
//! ```text
//! Connection pool (before establishing a physical connection)
//!     → cache.rs (lookup by host/region/user/duration)
//!         fresh  → return cached token (read lock only)
//!         stale  → issuer.rs (identity service, under write lock)
//!                → types.rs (CachedToken stored, replacing the old record)
//!     → token used as the connection password
//! ```
//!
//! # Design Decisions
//! - One cache per resolved connection configuration, owned by the pool
//! - Tokens are refreshed once 80% of their lifetime has elapsed
//! - At most one issuance call per key at a time (double-checked write lock)
//! - A single write lock is held across issuance; cross-key issuance is serialized
//! - Failed or empty issuance results are never cached
//! - Tokens never appear in logs

pub mod cache;
pub mod issuer;
pub mod types;

pub use cache::{CredentialCache, TokenCacheSettings};
pub use issuer::{IssueError, IssueRequest, TokenIssuer};
pub use types::{
    CachedToken, TokenCacheKey, TokenError, TokenResult, ADMIN_USER, DEFAULT_REFRESH_BUFFER,
    DEFAULT_TOKEN_DURATION,
};

//! Identity service boundary.
//!
//! # Responsibilities
//! - Describe the parameters of a single issuance request
//! - Abstract the service that signs time-bounded tokens
//!
//! # Design Decisions
//! - Issuers are opaque: they may do network I/O and their own retries
//! - Any issuer error is an issuance failure; the cache never retries

use std::time::Duration;

use async_trait::async_trait;

use crate::credentials::types::{TokenCacheKey, ADMIN_USER};

/// Error returned by an identity service.
pub type IssueError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity parameters for a single issuance call.
#[derive(Debug, Clone, Copy)]
pub struct IssueRequest<'a> {
    pub host: &'a str,
    pub region: &'a str,
    pub user: &'a str,
    /// Requested validity. Zero means the issuer's own default.
    pub duration: Duration,
}

impl<'a> IssueRequest<'a> {
    /// True when the request is for the admin user, which needs an admin token.
    pub fn is_admin(&self) -> bool {
        self.user == ADMIN_USER
    }
}

impl<'a> From<&'a TokenCacheKey> for IssueRequest<'a> {
    fn from(key: &'a TokenCacheKey) -> Self {
        Self {
            host: &key.host,
            region: &key.region,
            user: &key.user,
            duration: key.duration,
        }
    }
}

/// Service that issues signed, time-bounded authentication tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue a new token for the given identity.
    async fn issue(&self, request: &IssueRequest<'_>) -> Result<String, IssueError>;
}

//! Cache keys, cached token records and error definitions.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Fraction of a token's lifetime, measured back from expiry, during which
/// the token is treated as stale (refresh once 80% has elapsed).
pub const DEFAULT_REFRESH_BUFFER: f64 = 0.2;

/// Lifetime assumed for a token when the caller requests a zero duration.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::from_secs(15 * 60);

/// Database user that receives admin tokens from the identity service.
pub const ADMIN_USER: &str = "admin";

/// Identity tuple a token is issued for.
///
/// The requested duration is part of the key: the identity service binds the
/// duration at issuance time, so different durations get different slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
    pub host: String,
    pub region: String,
    pub user: String,
    /// Requested token duration. Zero means "use the default".
    pub duration: Duration,
}

impl TokenCacheKey {
    pub fn new(
        host: impl Into<String>,
        region: impl Into<String>,
        user: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            region: region.into(),
            user: user.into(),
            duration,
        }
    }
}

/// An issued token with its validity window.
///
/// Records are never mutated; a refresh replaces the whole record.
#[derive(Clone)]
pub struct CachedToken {
    token: String,
    issued_at: Instant,
    expires_at: Instant,
}

impl CachedToken {
    /// Create a record for a token issued at `issued_at` and valid for `lifetime`.
    ///
    /// A zero lifetime is bumped to one millisecond so that `expires_at > issued_at` holds.
    pub fn new(token: String, issued_at: Instant, lifetime: Duration) -> Self {
        let lifetime = lifetime.max(Duration::from_millis(1));
        Self {
            token,
            issued_at,
            expires_at: issued_at + lifetime,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Total validity window of the token.
    pub fn lifetime(&self) -> Duration {
        self.expires_at.duration_since(self.issued_at)
    }

    /// Check if the token has expired at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Check if the token is expired or inside its refresh buffer at `now`.
    ///
    /// Stale once `now >= expires_at - buffer * lifetime`. `buffer` is clamped to
    /// `[0, 1]`; NaN is treated as [`DEFAULT_REFRESH_BUFFER`].
    pub fn is_expired_or_expiring_soon(&self, now: Instant, buffer: f64) -> bool {
        let buffer = if buffer.is_nan() {
            DEFAULT_REFRESH_BUFFER
        } else {
            buffer.clamp(0.0, 1.0)
        };
        let refresh_window = self.lifetime().mul_f64(buffer);
        let refresh_at = self.expires_at - refresh_window;
        now >= refresh_at
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Errors that can occur while obtaining a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The identity service failed to issue a token.
    #[error("failed to generate auth token for {user}@{host}: {source}")]
    Issuance {
        host: String,
        user: String,
        #[source]
        source: crate::credentials::IssueError,
    },

    /// The identity service returned an empty secret.
    #[error("generated auth token for {user}@{host} is empty")]
    EmptyToken { host: String, user: String },

    /// The caller cancelled the request.
    #[error("token request cancelled")]
    Cancelled,
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

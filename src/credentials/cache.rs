//! Token caching with proactive refresh.
//!
//! # Responsibilities
//! - Serve fresh tokens without touching the identity service
//! - Re-issue tokens that are missing, expired or inside the refresh buffer
//! - Collapse concurrent refreshes of the same key into one issuance call

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::credentials::issuer::{IssueRequest, TokenIssuer};
use crate::credentials::types::{
    CachedToken, TokenCacheKey, TokenError, TokenResult, DEFAULT_REFRESH_BUFFER,
    DEFAULT_TOKEN_DURATION,
};
use crate::observability::metrics;

/// Tunables for a [`CredentialCache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenCacheSettings {
    /// Fraction of the lifetime before expiry at which a token turns stale.
    pub refresh_buffer: f64,
    /// Lifetime recorded for tokens requested with a zero duration.
    pub default_token_duration: Duration,
}

impl Default for TokenCacheSettings {
    fn default() -> Self {
        Self {
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            default_token_duration: DEFAULT_TOKEN_DURATION,
        }
    }
}

/// A concurrency-safe cache of authentication tokens.
///
/// Construct one per resolved connection configuration and keep it alive
/// for as long as the owning pool.
pub struct CredentialCache {
    tokens: RwLock<HashMap<TokenCacheKey, CachedToken>>,
    issuer: Arc<dyn TokenIssuer>,
    settings: TokenCacheSettings,
}

impl CredentialCache {
    /// Create an empty cache with default settings.
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self::with_settings(issuer, TokenCacheSettings::default())
    }

    /// Create an empty cache with explicit settings.
    ///
    /// A non-finite `refresh_buffer` falls back to [`DEFAULT_REFRESH_BUFFER`];
    /// finite values are clamped to `[0, 1]` when tokens are checked.
    pub fn with_settings(issuer: Arc<dyn TokenIssuer>, mut settings: TokenCacheSettings) -> Self {
        if !settings.refresh_buffer.is_finite() {
            tracing::warn!(
                refresh_buffer = settings.refresh_buffer,
                "non-finite refresh buffer, using default"
            );
            settings.refresh_buffer = DEFAULT_REFRESH_BUFFER;
        }
        Self {
            tokens: RwLock::new(HashMap::new()),
            issuer,
            settings,
        }
    }

    /// Return a valid token for the identity, issuing a new one if needed.
    pub async fn get_token(
        &self,
        cancel: &CancellationToken,
        host: &str,
        region: &str,
        user: &str,
        duration: Duration,
    ) -> TokenResult<String> {
        let key = TokenCacheKey::new(host, region, user, duration);
        self.get_token_for(cancel, &key).await
    }

    /// Same as [`get_token`](Self::get_token) for an already-built key.
    #[tracing::instrument(
        skip(self, cancel, key),
        fields(host = %key.host, region = %key.region, user = %key.user)
    )]
    pub async fn get_token_for(
        &self,
        cancel: &CancellationToken,
        key: &TokenCacheKey,
    ) -> TokenResult<String> {
        // Readers queue behind an in-flight issuance, so the wait must be cancellable.
        let cached = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TokenError::Cancelled),
            tokens = self.tokens.read() => self.fresh_token(&tokens, key),
        };
        if let Some(token) = cached {
            metrics::record_cache_hit();
            tracing::debug!("using cached auth token");
            return Ok(token);
        }
        metrics::record_cache_miss();

        let mut tokens = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TokenError::Cancelled),
            guard = self.tokens.write() => guard,
        };

        // Another caller may have refreshed this key while we waited for the lock.
        if let Some(token) = self.fresh_token(&tokens, key) {
            tracing::debug!("token refreshed by a concurrent caller");
            return Ok(token);
        }

        let issued_at = Instant::now();
        let token = self.issue(cancel, key).await?;
        let lifetime = if key.duration.is_zero() {
            self.settings.default_token_duration
        } else {
            key.duration
        };

        tokens.insert(key.clone(), CachedToken::new(token.clone(), issued_at, lifetime));
        metrics::record_cache_size(tokens.len());
        tracing::info!(lifetime_secs = lifetime.as_secs(), "issued new auth token");

        Ok(token)
    }

    /// Remove all cached tokens. Subsequent lookups re-issue.
    pub async fn clear(&self) {
        let mut tokens = self.tokens.write().await;
        tokens.clear();
        metrics::record_cache_size(0);
        tracing::debug!("token cache cleared");
    }

    /// Number of cached tokens.
    pub async fn size(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub fn refresh_buffer(&self) -> f64 {
        self.settings.refresh_buffer
    }

    pub fn default_token_duration(&self) -> Duration {
        self.settings.default_token_duration
    }

    fn fresh_token(
        &self,
        tokens: &HashMap<TokenCacheKey, CachedToken>,
        key: &TokenCacheKey,
    ) -> Option<String> {
        let cached = tokens.get(key)?;
        if cached.is_expired_or_expiring_soon(Instant::now(), self.settings.refresh_buffer) {
            tracing::debug!("cached token is expired or expiring soon");
            return None;
        }
        Some(cached.token().to_string())
    }

    async fn issue(&self, cancel: &CancellationToken, key: &TokenCacheKey) -> TokenResult<String> {
        let request = IssueRequest::from(key);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                metrics::record_issuance("cancelled");
                return Err(TokenError::Cancelled);
            }
            result = self.issuer.issue(&request) => result,
        };

        match result {
            Ok(token) if token.is_empty() => {
                metrics::record_issuance("empty");
                Err(TokenError::EmptyToken {
                    host: key.host.clone(),
                    user: key.user.clone(),
                })
            }
            Ok(token) => {
                metrics::record_issuance("success");
                Ok(token)
            }
            Err(source) => {
                metrics::record_issuance("error");
                tracing::warn!(error = %source, "token issuance failed");
                Err(TokenError::Issuance {
                    host: key.host.clone(),
                    user: key.user.clone(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("refresh_buffer", &self.settings.refresh_buffer)
            .field("default_token_duration", &self.settings.default_token_duration)
            .finish_non_exhaustive()
    }
}

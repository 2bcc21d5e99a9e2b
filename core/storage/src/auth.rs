//! Access token caching shared by the provider clients.
//!
//! Each provider owns one [`TokenCache`]. The cache hands out the current
//! access token while it is valid and asks its [`TokenEndpoint`] for a new
//! one when it is absent or expired. Refreshes are not serialized: two
//! requests hitting a cold cache may both refresh, and the last write wins.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use projectdrive_common::{Error, Provider, Result, SecretString};

use crate::clock::Clock;

/// Subtracted from provider-reported lifetimes.
pub const DEFAULT_EXPIRY_MARGIN: std::time::Duration = std::time::Duration::from_secs(60);

/// Fallback when a token response omits `expires_in`.
pub(crate) const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: SecretString,
    /// Lifetime reported by the provider.
    pub expires_in: std::time::Duration,
}

/// Provider token endpoint able to mint access tokens from long-lived
/// credentials held in process configuration.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    fn provider(&self) -> Provider;

    /// Request a new access token.
    ///
    /// # Errors
    /// - `Error::Authentication` on a non-success status or malformed body
    /// - `Error::Network` if the endpoint is unreachable
    async fn request_token(&self) -> Result<IssuedToken>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Parse an OAuth2 token endpoint response.
pub(crate) async fn parse_token_response(
    provider: Provider,
    response: reqwest::Response,
) -> Result<IssuedToken> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Network(format!("Failed to read {} token response: {}", provider, e)))?;

    if !status.is_success() {
        return Err(Error::Authentication(format!(
            "{} token refresh failed: {} - {}",
            provider, status, body
        )));
    }

    let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        Error::Authentication(format!("Malformed {} token response: {}", provider, e))
    })?;

    if parsed.access_token.is_empty() {
        return Err(Error::Authentication(format!(
            "{} token response carried an empty access token",
            provider
        )));
    }

    Ok(IssuedToken {
        access_token: SecretString::from(parsed.access_token),
        expires_in: std::time::Duration::from_secs(
            parsed.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS),
        ),
    })
}

/// Cached access token with its expiry.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Process-local access token cache for one provider.
pub struct TokenCache {
    endpoint: Arc<dyn TokenEndpoint>,
    clock: Arc<dyn Clock>,
    margin: std::time::Duration,
    entry: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create an empty cache. The first call to [`access_token`](Self::access_token)
    /// hits the endpoint.
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, clock: Arc<dyn Clock>) -> Self {
        Self {
            endpoint,
            clock,
            margin: DEFAULT_EXPIRY_MARGIN,
            entry: RwLock::new(None),
        }
    }

    /// Set the safety margin subtracted from reported lifetimes.
    pub fn with_margin(mut self, margin: std::time::Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn provider(&self) -> Provider {
        self.endpoint.provider()
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// # Errors
    /// - Token refresh failed; nothing is cached and the next call retries
    pub async fn access_token(&self) -> Result<SecretString> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if !cached.is_expired(self.clock.now()) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        tracing::debug!(provider = %self.provider(), "Refreshing access token");

        let issued = self.endpoint.request_token().await?;

        // Lifetimes shorter than the margin are taken as reported.
        let lifetime = if issued.expires_in > self.margin {
            issued.expires_in - self.margin
        } else {
            issued.expires_in
        };
        let lifetime = Duration::from_std(lifetime).unwrap_or_else(|_| Duration::hours(1));
        let expires_at = self.clock.now() + lifetime;

        *self.entry.write().await = Some(CachedToken {
            access_token: issued.access_token.clone(),
            expires_at,
        });

        tracing::info!(provider = %self.provider(), %expires_at, "Access token refreshed");

        Ok(issued.access_token)
    }

    /// Expiry of the cached token, if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.entry.read().await.as_ref().map(|c| c.expires_at)
    }

    #[cfg(test)]
    pub(crate) async fn reset(&self) {
        *self.entry.write().await = None;
    }
}

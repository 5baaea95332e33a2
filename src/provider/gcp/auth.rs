//! # Access Tokens
//!
//! OAuth2 access tokens for the Compute API.
//!
//! Tokens are cached and refreshed shortly before they expire, so a busy
//! controller does not hit the token endpoint on every call.

use crate::config::TokenSource;
use crate::constants::COMPUTE_SCOPE;
use crate::provider::gcp::ssl::responses::{AltTokenResponse, TokenResponse};
use crate::provider::SslCertificateError;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tokens closer than this to expiry are refreshed
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at
            .is_none_or(|expires_at| now + REFRESH_MARGIN < expires_at)
    }
}

/// Access token provider backed by a [`TokenSource`]
pub struct AccessTokenProvider {
    http_client: Client,
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for AccessTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenProvider")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl AccessTokenProvider {
    #[must_use]
    pub fn new(http_client: Client, source: TokenSource) -> Self {
        Self {
            http_client,
            source,
            cached: Mutex::new(None),
        }
    }

    /// Current access token, fetched from the source when the cached one is stale
    ///
    /// # Errors
    ///
    /// Returns [`SslCertificateError::Auth`] when the token endpoint fails.
    pub async fn access_token(&self) -> Result<String, SslCertificateError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.token.clone());
        }

        let token = self.fetch().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> Result<CachedToken, SslCertificateError> {
        match &self.source {
            TokenSource::Static { token } => Ok(CachedToken {
                token: token.clone(),
                expires_at: None,
            }),
            TokenSource::Metadata { base_url } => self.fetch_from_metadata(base_url).await,
            TokenSource::AltToken {
                token_url,
                token_body,
            } => self.fetch_alt_token(token_url, token_body).await,
            TokenSource::ServiceAccount { credentials_path } => {
                fetch_service_account_token(credentials_path).await
            }
        }
    }

    async fn fetch_from_metadata(&self, base_url: &str) -> Result<CachedToken, SslCertificateError> {
        let url = format!("{base_url}/computeMetadata/v1/instance/service-accounts/default/token");
        let response = self
            .http_client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SslCertificateError::Auth(format!("metadata server not available: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SslCertificateError::Auth(format!(
                "metadata server returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            SslCertificateError::Auth(format!(
                "failed to parse token response from metadata server: {e}"
            ))
        })?;

        debug!("Retrieved access token from metadata server");
        Ok(CachedToken {
            token: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }

    async fn fetch_alt_token(
        &self,
        token_url: &str,
        token_body: &str,
    ) -> Result<CachedToken, SslCertificateError> {
        let response = self
            .http_client
            .post(token_url)
            .header("Content-Type", "application/json")
            .body(token_body.to_string())
            .send()
            .await
            .map_err(|e| SslCertificateError::Auth(format!("token endpoint not available: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SslCertificateError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: AltTokenResponse = response.json().await.map_err(|e| {
            SslCertificateError::Auth(format!("failed to parse token endpoint response: {e}"))
        })?;

        let expires_at = token.expire_time.and_then(|expire_time| {
            let remaining = (expire_time - chrono::Utc::now()).to_std().ok()?;
            Some(Instant::now() + remaining)
        });

        info!("Retrieved access token from alternate token endpoint");
        Ok(CachedToken {
            token: token.access_token,
            expires_at,
        })
    }
}

/// Exchange a JWT signed with the service account key for an access token
///
/// The key file is read on every refresh so a rotated secret is picked up.
async fn fetch_service_account_token(
    credentials_path: &str,
) -> Result<CachedToken, SslCertificateError> {
    let account = CustomServiceAccount::from_file(credentials_path).map_err(|e| {
        SslCertificateError::Auth(format!(
            "could not load service account key {credentials_path}: {e}"
        ))
    })?;

    let token = account.token(&[COMPUTE_SCOPE]).await.map_err(|e| {
        SslCertificateError::Auth(format!("service account token exchange failed: {e}"))
    })?;

    let expires_at = (token.expires_at() - chrono::Utc::now())
        .to_std()
        .ok()
        .map(|remaining| Instant::now() + remaining);

    info!("Retrieved access token for service account key");
    Ok(CachedToken {
        token: token.as_str().to_string(),
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = AccessTokenProvider::new(
            Client::new(),
            TokenSource::Static {
                token: "test-token".to_string(),
            },
        );

        assert_eq!(provider.access_token().await.unwrap(), "test-token");
        assert_eq!(provider.access_token().await.unwrap(), "test-token");
    }

    #[test]
    fn test_token_freshness() {
        let now = Instant::now();
        let fresh = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now + Duration::from_secs(3600)),
        };
        let stale = CachedToken {
            token: "t".to_string(),
            expires_at: Some(now + Duration::from_secs(30)),
        };
        let forever = CachedToken {
            token: "t".to_string(),
            expires_at: None,
        };

        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
        assert!(forever.is_fresh(now));
    }

    #[tokio::test]
    async fn test_unreachable_metadata_server_is_auth_error() {
        let provider = AccessTokenProvider::new(
            Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .unwrap(),
            TokenSource::Metadata {
                base_url: "http://127.0.0.1:1".to_string(),
            },
        );

        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, SslCertificateError::Auth(_)));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_service_account_key_is_auth_error() {
        let provider = AccessTokenProvider::new(
            Client::new(),
            TokenSource::ServiceAccount {
                credentials_path: "/nonexistent/key.json".to_string(),
            },
        );

        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, SslCertificateError::Auth(ref message) if message.contains("/nonexistent/key.json")));
    }
}

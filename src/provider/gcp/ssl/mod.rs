//! Compute Engine SslCertificates REST Client
//!
//! Native REST implementation of the `compute/v1` `sslCertificates` API.
//! Uses reqwest with rustls and a bearer token from [`AccessTokenProvider`].
//!
//! Every call is bounded by the client-side timeout the client was built with.
//!
//! References:
//! - [Compute Engine sslCertificates](https://cloud.google.com/compute/docs/reference/rest/v1/sslCertificates)

mod operations;
pub mod paths;
pub mod requests;
pub mod responses;

pub use responses::{ManagedSslCertificate, SslCertificate};

use crate::config::{GceConfig, TokenSource};
use crate::constants::COMPUTE_API_BASE_URL;
use crate::provider::gcp::auth::AccessTokenProvider;
use crate::provider::SslCertificateError;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::info;

/// Compute Engine SslCertificates REST client, scoped to one project
pub struct SslCertificatesREST {
    http_client: Client,
    base_url: String,
    project_id: String,
    tokens: AccessTokenProvider,
}

impl std::fmt::Debug for SslCertificatesREST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SslCertificatesREST")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SslCertificatesREST {
    /// Create a client for the project and token source of a resolved GCE configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GceConfig, timeout: Duration) -> Result<Self, SslCertificateError> {
        Self::with_base_url(
            COMPUTE_API_BASE_URL,
            config.project_id.clone(),
            config.token_source.clone(),
            timeout,
        )
    }

    /// Create a client against an explicit API endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        project_id: String,
        token_source: TokenSource,
        timeout: Duration,
    ) -> Result<Self, SslCertificateError> {
        // Create HTTP client with rustls (already configured in Cargo.toml)
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        info!(
            project.id = %project_id,
            "Initializing Compute Engine SslCertificates client for {}", base_url
        );

        Ok(Self {
            tokens: AccessTokenProvider::new(http_client.clone(), token_source),
            http_client,
            base_url,
            project_id,
        })
    }

    /// Build HTTP request with authentication headers
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::RequestBuilder, SslCertificateError> {
        let url = format!("{}/{}", self.base_url, path);
        let access_token = self.tokens.access_token().await?;

        // Format authorization header: add "Bearer " prefix if not already present
        let auth_header = if access_token.starts_with("Bearer ") {
            access_token
        } else {
            format!("Bearer {access_token}")
        };

        let mut request = self
            .http_client
            .request(method, &url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        Ok(request)
    }

    /// Convert a non-success response into an error
    ///
    /// 404, whether reported by status line or error envelope, is the only
    /// not-found classification.
    fn handle_error_response(
        name: &str,
        status: reqwest::StatusCode,
        error_text: &str,
    ) -> SslCertificateError {
        let (code, status_text, message) =
            match serde_json::from_str::<responses::GcpErrorResponse>(error_text) {
                Ok(error_response) => (
                    error_response.error.code,
                    error_response.error.status,
                    error_response.error.message,
                ),
                Err(_) => (
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default().to_string(),
                    error_text.to_string(),
                ),
            };

        if status == reqwest::StatusCode::NOT_FOUND || code == 404 {
            return SslCertificateError::NotFound {
                name: name.to_string(),
            };
        }

        SslCertificateError::Api {
            code,
            status: status_text,
            message,
        }
    }

    /// Get the project ID
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_from_status_line() {
        let err = SslCertificatesREST::handle_error_response(
            "mcrt-1",
            reqwest::StatusCode::NOT_FOUND,
            "Not Found",
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_api_error_envelope() {
        let body = r#"{"error":{"code":409,"message":"The resource 'mcrt-1' already exists","status":"ALREADY_EXISTS"}}"#;
        let err = SslCertificatesREST::handle_error_response(
            "mcrt-1",
            reqwest::StatusCode::CONFLICT,
            body,
        );

        assert!(!err.is_not_found());
        match err {
            SslCertificateError::Api { code, status, .. } => {
                assert_eq!(code, 409);
                assert_eq!(status, "ALREADY_EXISTS");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_omits_tokens() {
        let client = SslCertificatesREST::with_base_url(
            "http://localhost:1/",
            "my-project".to_string(),
            TokenSource::Static {
                token: "secret-token".to_string(),
            },
            Duration::from_secs(30),
        )
        .unwrap();

        let debug = format!("{client:?}");
        assert!(debug.contains("my-project"));
        assert!(!debug.contains("secret-token"));
        assert_eq!(client.base_url, "http://localhost:1");
    }
}

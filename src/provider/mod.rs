//! # Provider Modules
//!
//! Cloud provider clients used by the controller.
//!
//! The controller only needs one capability from the cloud: create, read and
//! delete managed SSL certificates. [`SslCertificateProvider`] is that seam;
//! the Compute Engine REST client implements it and tests substitute fakes.

use async_trait::async_trait;
use thiserror::Error;

pub mod gcp;

pub use gcp::ssl::{ManagedSslCertificate, SslCertificate};

/// Errors returned by SslCertificate operations
///
/// Callers only ever distinguish "not found" from everything else; see
/// [`SslCertificateError::is_not_found`].
#[derive(Debug, Error)]
pub enum SslCertificateError {
    #[error("SslCertificate {name} not found")]
    NotFound { name: String },
    #[error("Compute API error: {message} (code: {code}, status: {status})")]
    Api {
        code: u16,
        status: String,
        message: String,
    },
    #[error("request to Compute API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to obtain access token: {0}")]
    Auth(String),
}

impl SslCertificateError {
    /// Whether the provider reported the certificate as absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SslCertificateError::NotFound { .. })
    }
}

/// CRUD operations on managed SslCertificate resources of one project
#[async_trait]
pub trait SslCertificateProvider: Send + Sync {
    /// Create a managed certificate for the given domains, in order
    ///
    /// Issuance is asynchronous: success means the resource was accepted,
    /// not that the certificate is active.
    async fn create(&self, name: &str, domains: &[String]) -> Result<(), SslCertificateError>;

    /// Delete a certificate; deleting an absent certificate is a not-found error
    async fn delete(&self, name: &str) -> Result<(), SslCertificateError>;

    /// Fetch the full state of a certificate
    async fn get(&self, name: &str) -> Result<SslCertificate, SslCertificateError>;

    /// Whether a certificate exists
    ///
    /// Not-found collapses to `Ok(false)`; any other error propagates.
    async fn exists(&self, name: &str) -> Result<bool, SslCertificateError> {
        match self.get(name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

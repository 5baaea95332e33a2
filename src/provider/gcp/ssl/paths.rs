//! # Paths
//!
//! Compute Engine `sslCertificates` API paths.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathBuilderError {
    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(&'static str),
}

/// SslCertificate API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslOperation {
    Insert,
    Get,
    Delete,
}

impl SslOperation {
    /// Label used in spans and metrics
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SslOperation::Insert => "create",
            SslOperation::Get => "get",
            SslOperation::Delete => "delete",
        }
    }
}

/// Builder for `compute/v1` SslCertificate paths
///
/// # Example
///
/// ```rust
/// use managed_certificate_controller::provider::gcp::ssl::paths::{PathBuilder, SslOperation};
///
/// let path = PathBuilder::new()
///     .operation(SslOperation::Get)
///     .project("my-project")
///     .certificate("mcrt-1234")
///     .build_http_path()
///     .unwrap();
/// assert_eq!(path, "compute/v1/projects/my-project/global/sslCertificates/mcrt-1234");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    operation: Option<SslOperation>,
    project: Option<String>,
    certificate: Option<String>,
}

impl PathBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn operation(mut self, operation: SslOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificate = Some(certificate.into());
        self
    }

    /// Path relative to the API base URL, without a leading slash
    pub fn build_http_path(&self) -> Result<String, PathBuilderError> {
        let operation = self
            .operation
            .ok_or(PathBuilderError::MissingRequiredParameter("operation"))?;
        let project = self
            .project
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(PathBuilderError::MissingRequiredParameter("project"))?;
        let collection = format!("compute/v1/projects/{project}/global/sslCertificates");

        match operation {
            SslOperation::Insert => Ok(collection),
            SslOperation::Get | SslOperation::Delete => {
                let certificate = self
                    .certificate
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .ok_or(PathBuilderError::MissingRequiredParameter("certificate"))?;
                Ok(format!("{collection}/{certificate}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_path() {
        let path = PathBuilder::new()
            .operation(SslOperation::Insert)
            .project("my-project")
            .build_http_path();
        assert_eq!(
            path.as_deref(),
            Ok("compute/v1/projects/my-project/global/sslCertificates")
        );
    }

    #[test]
    fn test_delete_path_requires_certificate() {
        let path = PathBuilder::new()
            .operation(SslOperation::Delete)
            .project("my-project")
            .build_http_path();
        assert_eq!(
            path,
            Err(PathBuilderError::MissingRequiredParameter("certificate"))
        );
    }

    #[test]
    fn test_missing_project() {
        let path = PathBuilder::new()
            .operation(SslOperation::Get)
            .certificate("mcrt-1")
            .build_http_path();
        assert_eq!(path, Err(PathBuilderError::MissingRequiredParameter("project")));
    }
}

//! # CRUD Operations
//!
//! Implementation of [`SslCertificateProvider`] for the Compute Engine REST API.

use crate::observability::metrics;
use crate::provider::{SslCertificateError, SslCertificateProvider};
use async_trait::async_trait;
use reqwest::Method;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument, Span};

use super::paths::{PathBuilder, PathBuilderError, SslOperation};
use super::requests::InsertSslCertificateRequest;
use super::responses::{Operation, SslCertificate};
use super::SslCertificatesREST;

/// Tracks duration and outcome of one call for spans and metrics
struct OperationTracker {
    operation: SslOperation,
    start: Instant,
    span: Span,
}

impl OperationTracker {
    fn new(operation: SslOperation) -> Self {
        Self {
            operation,
            start: Instant::now(),
            span: Span::current(),
        }
    }

    fn record_success(&self) {
        let elapsed = self.start.elapsed();
        self.span.record("operation.success", true);
        self.span
            .record("operation.duration_ms", u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        metrics::record_ssl_certificate_operation(self.operation.as_str(), elapsed.as_secs_f64());
    }

    fn record_error(&self, error: &SslCertificateError) {
        self.span.record("operation.success", false);
        self.span.record("error.message", error.to_string().as_str());
        metrics::increment_ssl_certificate_operation_errors(self.operation.as_str());
    }
}

impl From<PathBuilderError> for SslCertificateError {
    fn from(e: PathBuilderError) -> Self {
        SslCertificateError::Api {
            code: 400,
            status: "INVALID_ARGUMENT".to_string(),
            message: e.to_string(),
        }
    }
}

impl SslCertificatesREST {
    fn path(&self, operation: SslOperation, name: &str) -> Result<String, SslCertificateError> {
        let builder = PathBuilder::new()
            .operation(operation)
            .project(self.project_id());
        let builder = match operation {
            SslOperation::Insert => builder,
            SslOperation::Get | SslOperation::Delete => builder.certificate(name),
        };
        Ok(builder.build_http_path()?)
    }

    /// Send a request, recording its outcome on the current span and in metrics
    async fn execute(
        &self,
        method: Method,
        operation: SslOperation,
        name: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, SslCertificateError> {
        let tracker = OperationTracker::new(operation);
        let result = self.send(method, operation, name, body).await;

        match &result {
            Ok(_) => tracker.record_success(),
            Err(e) => tracker.record_error(e),
        }
        result
    }

    async fn send(
        &self,
        method: Method,
        operation: SslOperation,
        name: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, SslCertificateError> {
        let path = self.path(operation, name)?;
        let response = self.make_request(method, &path, body).await?.send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(Self::handle_error_response(name, status, &error_text))
    }
}

#[async_trait]
impl SslCertificateProvider for SslCertificatesREST {
    async fn create(&self, name: &str, domains: &[String]) -> Result<(), SslCertificateError> {
        let span = info_span!(
            "gcp.ssl_certificate.create",
            certificate.name = name,
            project.id = self.project_id(),
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            error.message = tracing::field::Empty,
        );

        async move {
            info!("Creating SslCertificate {} for domains {:?}", name, domains);
            let request = InsertSslCertificateRequest::managed(name, domains);
            let body = serde_json::to_value(&request).map_err(|e| SslCertificateError::Api {
                code: 400,
                status: "INVALID_ARGUMENT".to_string(),
                message: e.to_string(),
            })?;

            let response = self
                .execute(Method::POST, SslOperation::Insert, name, Some(body))
                .await?;

            // Issuance continues asynchronously, the operation is only logged
            let operation: Operation = response.json().await.unwrap_or_default();
            debug!(
                operation.name = %operation.name,
                operation.status = %operation.status,
                "SslCertificate insert accepted"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), SslCertificateError> {
        let span = info_span!(
            "gcp.ssl_certificate.delete",
            certificate.name = name,
            project.id = self.project_id(),
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            error.message = tracing::field::Empty,
        );

        async move {
            info!("Deleting SslCertificate {}", name);
            let response = self
                .execute(Method::DELETE, SslOperation::Delete, name, None)
                .await?;

            let operation: Operation = response.json().await.unwrap_or_default();
            debug!(
                operation.name = %operation.name,
                operation.status = %operation.status,
                "SslCertificate delete accepted"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get(&self, name: &str) -> Result<SslCertificate, SslCertificateError> {
        let span = tracing::debug_span!(
            "gcp.ssl_certificate.get",
            certificate.name = name,
            project.id = self.project_id(),
            operation.success = tracing::field::Empty,
            operation.duration_ms = tracing::field::Empty,
            error.message = tracing::field::Empty,
        );

        async move {
            let response = self.execute(Method::GET, SslOperation::Get, name, None).await?;
            let certificate: SslCertificate = response.json().await?;
            Ok(certificate)
        }
        .instrument(span)
        .await
    }
}

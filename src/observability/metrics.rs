//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `managed_certificates_statuses` - ManagedCertificate count per certificate status, refreshed on every resync
//! - `managed_certificate_reconciliations_total` - Total number of reconciliations
//! - `managed_certificate_reconciliation_errors_total` - Total number of failed reconciliations
//! - `managed_certificate_reconciliation_duration_seconds` - Duration of reconciliations
//! - `managed_certificate_ssl_certificate_operations_total` - Compute Engine SslCertificate calls by operation
//! - `managed_certificate_ssl_certificate_operation_duration_seconds` - Duration of SslCertificate calls by operation
//! - `managed_certificate_ssl_certificate_operation_errors_total` - Failed SslCertificate calls by operation
//! - `managed_certificate_queue_depth` - Keys ready in the work queue
//! - `managed_certificate_requeues_total` - Keys re-added to the queue by reason

use crate::crd::CertificateStatus;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::collections::HashMap;
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static MANAGED_CERTIFICATES_STATUSES: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "managed_certificates_statuses",
            "Number of ManagedCertificate resources per certificate status",
        ),
        &["status"],
    )
    .expect("Failed to create MANAGED_CERTIFICATES_STATUSES metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_certificate_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "managed_certificate_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "managed_certificate_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SSL_CERTIFICATE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "managed_certificate_ssl_certificate_operations_total",
            "Total number of Compute Engine SslCertificate operations",
        ),
        &["operation"],
    )
    .expect("Failed to create SSL_CERTIFICATE_OPERATIONS_TOTAL metric - this should never happen")
});

static SSL_CERTIFICATE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "managed_certificate_ssl_certificate_operation_duration_seconds",
            "Duration of Compute Engine SslCertificate operations in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .expect(
        "Failed to create SSL_CERTIFICATE_OPERATION_DURATION metric - this should never happen",
    )
});

static SSL_CERTIFICATE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "managed_certificate_ssl_certificate_operation_errors_total",
            "Total number of failed Compute Engine SslCertificate operations",
        ),
        &["operation"],
    )
    .expect(
        "Failed to create SSL_CERTIFICATE_OPERATION_ERRORS_TOTAL metric - this should never happen",
    )
});

static QUEUE_DEPTH: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "managed_certificate_queue_depth",
        "Number of keys ready to be processed",
    )
    .expect("Failed to create QUEUE_DEPTH metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "managed_certificate_requeues_total",
            "Total number of keys re-added to the work queue",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
/// Register all metrics with the registry served on `/metrics`
///
/// Fails if called twice, since every metric can only be registered once.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(MANAGED_CERTIFICATES_STATUSES.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SSL_CERTIFICATE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SSL_CERTIFICATE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SSL_CERTIFICATE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

/// Replace the per-status gauge with a fresh histogram
///
/// Statuses absent from the histogram are dropped so a status nobody is in
/// anymore does not keep reporting its last count.
pub fn observe_managed_certificate_statuses(statuses: &HashMap<CertificateStatus, usize>) {
    MANAGED_CERTIFICATES_STATUSES.reset();
    for (status, count) in statuses {
        MANAGED_CERTIFICATES_STATUSES
            .with_label_values(&[status.as_str()])
            .set(i64::try_from(*count).unwrap_or(i64::MAX));
    }
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Record a completed SslCertificate call
pub fn record_ssl_certificate_operation(operation: &str, duration: f64) {
    SSL_CERTIFICATE_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
    SSL_CERTIFICATE_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_ssl_certificate_operation_errors(operation: &str) {
    SSL_CERTIFICATE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn set_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

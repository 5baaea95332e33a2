//! # Types
//!
//! Core types for the reconciler.

use crate::controller::reconciler::kube_api::ManagedCertificateApi;
use crate::controller::status_mapping::{CertificateStatusConfig, TranslationError};
use crate::provider::{SslCertificateError, SslCertificateProvider};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    SslCertificate(#[from] SslCertificateError),
    #[error("status translation failed: {0}")]
    Translation(#[from] TranslationError),
    #[error("domains of SslCertificate {name} differ from spec ({actual:?} != {desired:?}), certificate deleted")]
    DomainsChanged {
        name: String,
        actual: Vec<String>,
        desired: Vec<String>,
    },
}

/// Reconciliation context shared by every worker
#[derive(Clone)]
pub struct Reconciler {
    pub api: Arc<dyn ManagedCertificateApi>,
    pub ssl: Arc<dyn SslCertificateProvider>,
    pub statuses: Arc<CertificateStatusConfig>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        api: Arc<dyn ManagedCertificateApi>,
        ssl: Arc<dyn SslCertificateProvider>,
        statuses: CertificateStatusConfig,
    ) -> Self {
        Self {
            api,
            ssl,
            statuses: Arc::new(statuses),
        }
    }
}

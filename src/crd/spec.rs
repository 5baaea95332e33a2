//! # ManagedCertificate Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// Maximum number of domains a single managed SslCertificate accepts
pub const MAX_DOMAINS: usize = 100;

/// ManagedCertificate Custom Resource Definition
///
/// Declares a set of domains that should be served by a Google-managed
/// SSL certificate. The controller creates the backing SslCertificate,
/// reports its provisioning status and deletes it when the resource goes away.
///
/// # Example
///
/// ```yaml
/// apiVersion: networking.gke.io/v1
/// kind: ManagedCertificate
/// metadata:
///   name: site
///   namespace: default
/// spec:
///   domains:
///     - example.com
///     - www.example.com
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ManagedCertificate",
    group = "networking.gke.io",
    version = "v1",
    namespaced,
    status = "crate::crd::ManagedCertificateStatus",
    shortname = "mcrt",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.certificateStatus"}, {"name":"Certificate", "type":"string", "jsonPath":".status.certificateName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificateSpec {
    /// Domains the certificate is issued for
    /// Order is preserved when the SslCertificate is created
    #[schemars(length(min = 1, max = MAX_DOMAINS))]
    pub domains: Vec<String>,
}

impl ManagedCertificate {
    /// Certificate-level status, `Empty` when none was reported yet
    #[must_use]
    pub fn certificate_status(&self) -> crate::crd::CertificateStatus {
        self.status
            .as_ref()
            .and_then(|s| s.certificate_status)
            .unwrap_or_default()
    }

    /// Name of the backing SslCertificate recorded in status
    #[must_use]
    pub fn certificate_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.certificate_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

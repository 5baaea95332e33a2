//! # Response Types
//!
//! Compute Engine REST API response structures.
//!
//! API Reference: https://cloud.google.com/compute/docs/reference/rest/v1/sslCertificates

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SslCertificate resource
///
/// Status values are kept exactly as Compute Engine reports them; they are
/// translated into the controller vocabulary by the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SslCertificate {
    pub name: String,
    #[serde(rename = "type", default)]
    pub certificate_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<ManagedSslCertificate>,
    /// RFC3339 expiration of the issued certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl SslCertificate {
    /// Domains of the managed certificate, in the order they were requested
    #[must_use]
    pub fn domains(&self) -> &[String] {
        self.managed
            .as_ref()
            .map(|m| m.domains.as_slice())
            .unwrap_or_default()
    }
}

/// Managed part of an SslCertificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSslCertificate {
    #[serde(default)]
    pub domains: Vec<String>,
    /// Certificate-level status, e.g. `PROVISIONING`
    #[serde(default)]
    pub status: String,
    /// Per-domain status, e.g. `{"example.com": "FAILED_CAA_CHECKING"}`
    #[serde(default)]
    pub domain_status: BTreeMap<String, String>,
}

/// Operation returned by insert and delete calls
///
/// Only the fields the client logs are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub target_link: Option<String>,
}

/// GCP API error envelope
#[derive(Debug, Deserialize)]
pub struct GcpErrorResponse {
    pub error: GcpError,
}

#[derive(Debug, Deserialize)]
pub struct GcpError {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Access token returned by the metadata server
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Access token returned by the alternate token endpoint of `gce.conf`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AltTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expire_time: Option<chrono::DateTime<chrono::Utc>>,
}

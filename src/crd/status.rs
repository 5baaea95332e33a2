//! # ManagedCertificate Status
//!
//! Status types and the controller's status vocabulary.
//!
//! Every value stored here belongs to the controller vocabulary. Raw Compute
//! Engine values are translated by [`crate::controller::status_mapping`]
//! before they reach this module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Certificate-level status as exposed to cluster operators
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema,
)]
pub enum CertificateStatus {
    /// No status reported yet (also used for an unspecified cloud status)
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Certificate issued and serving
    Active,
    /// Issuance in progress
    Provisioning,
    /// Issuance failed, the provider keeps retrying
    ProvisioningFailed,
    /// Issuance failed and will not be retried by the provider
    ProvisioningFailedPermanently,
    /// Renewal of an issued certificate failed
    RenewalFailed,
}

impl CertificateStatus {
    /// Wire representation of the status
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Empty => "",
            CertificateStatus::Active => "Active",
            CertificateStatus::Provisioning => "Provisioning",
            CertificateStatus::ProvisioningFailed => "ProvisioningFailed",
            CertificateStatus::ProvisioningFailedPermanently => "ProvisioningFailedPermanently",
            CertificateStatus::RenewalFailed => "RenewalFailed",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-domain status as exposed to cluster operators
///
/// Domains never reach the permanently-failed or renewal-failed states of
/// [`CertificateStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
pub enum DomainStatus {
    Active,
    FailedCaaChecking,
    FailedCaaForbidden,
    FailedNotVisible,
    FailedRateLimited,
    Provisioning,
}

impl DomainStatus {
    /// Wire representation of the status
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Active => "Active",
            DomainStatus::FailedCaaChecking => "FailedCaaChecking",
            DomainStatus::FailedCaaForbidden => "FailedCaaForbidden",
            DomainStatus::FailedNotVisible => "FailedNotVisible",
            DomainStatus::FailedRateLimited => "FailedRateLimited",
            DomainStatus::Provisioning => "Provisioning",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single domain of the certificate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusEntry {
    /// Domain name as listed in the spec
    pub domain: String,
    /// Provisioning status of the domain
    pub status: DomainStatus,
}

/// Status of the ManagedCertificate resource
///
/// Overwritten wholesale on every successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCertificateStatus {
    /// Name of the backing SslCertificate (always starts with `mcrt-`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_name: Option<String>,
    /// Certificate-level status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_status: Option<CertificateStatus>,
    /// Per-domain statuses, ordered by domain
    #[serde(default)]
    pub domain_status: Vec<DomainStatusEntry>,
    /// Expiration time of the issued certificate (RFC3339), once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
}

impl ManagedCertificateStatus {
    /// Look up the status recorded for a domain
    #[must_use]
    pub fn domain(&self, domain: &str) -> Option<DomainStatus> {
        self.domain_status
            .iter()
            .find(|entry| entry.domain == domain)
            .map(|entry| entry.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_certificate_status_serializes_as_empty_string() {
        let json = serde_json::to_string(&CertificateStatus::Empty).unwrap();
        assert_eq!(json, "\"\"");
        let parsed: CertificateStatus = serde_json::from_str("\"\"").unwrap();
        assert_eq!(parsed, CertificateStatus::Empty);
    }

    #[test]
    fn test_status_serializes_in_camel_case() {
        let status = ManagedCertificateStatus {
            certificate_name: Some("mcrt-1234".to_string()),
            certificate_status: Some(CertificateStatus::Provisioning),
            domain_status: vec![DomainStatusEntry {
                domain: "example.com".to_string(),
                status: DomainStatus::FailedCaaChecking,
            }],
            expire_time: None,
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["certificateName"], "mcrt-1234");
        assert_eq!(value["certificateStatus"], "Provisioning");
        assert_eq!(value["domainStatus"][0]["domain"], "example.com");
        assert_eq!(value["domainStatus"][0]["status"], "FailedCaaChecking");
        assert!(value.get("expireTime").is_none());
    }

    #[test]
    fn test_domain_lookup() {
        let status = ManagedCertificateStatus {
            domain_status: vec![DomainStatusEntry {
                domain: "example.com".to_string(),
                status: DomainStatus::Active,
            }],
            ..Default::default()
        };

        assert_eq!(status.domain("example.com"), Some(DomainStatus::Active));
        assert_eq!(status.domain("other.com"), None);
    }
}

//! # Request Types
//!
//! Compute Engine `sslCertificates` request bodies.
//!
//! API Reference: https://cloud.google.com/compute/docs/reference/rest/v1/sslCertificates/insert

use serde::Serialize;

/// Certificate type of every certificate the controller creates
pub const CERTIFICATE_TYPE_MANAGED: &str = "MANAGED";

/// Request body for `POST projects/{project}/global/sslCertificates`
#[derive(Debug, Serialize)]
pub struct InsertSslCertificateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub certificate_type: &'static str,
    pub managed: ManagedDomains,
}

/// Domains of a managed certificate, in the order they were requested
#[derive(Debug, Serialize)]
pub struct ManagedDomains {
    pub domains: Vec<String>,
}

impl InsertSslCertificateRequest {
    /// Request for a Google-managed certificate
    #[must_use]
    pub fn managed(name: &str, domains: &[String]) -> Self {
        Self {
            name: name.to_string(),
            certificate_type: CERTIFICATE_TYPE_MANAGED,
            managed: ManagedDomains {
                domains: domains.to_vec(),
            },
        }
    }
}

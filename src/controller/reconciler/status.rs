//! # Status
//!
//! Builds the ManagedCertificate status from the state of its SslCertificate.

use crate::controller::status_mapping::{translate, CertificateStatusConfig, TranslationError};
use crate::crd::{DomainStatusEntry, ManagedCertificateStatus};
use crate::provider::SslCertificate;

/// Translate the state of an SslCertificate into a ManagedCertificate status
///
/// Domain statuses are ordered by domain name.
///
/// # Errors
///
/// Fails on any status value missing from the translation tables.
pub fn build_status(
    certificate_name: &str,
    certificate: &SslCertificate,
    statuses: &CertificateStatusConfig,
) -> Result<ManagedCertificateStatus, TranslationError> {
    let (cloud_status, cloud_domain_status) = match &certificate.managed {
        Some(managed) => (managed.status.as_str(), Some(&managed.domain_status)),
        None => ("", None),
    };

    let certificate_status = translate(cloud_status, &statuses.certificate)?;

    let domain_status = cloud_domain_status
        .into_iter()
        .flatten()
        .map(|(domain, status)| {
            Ok(DomainStatusEntry {
                domain: domain.clone(),
                status: translate(status, &statuses.domain)?,
            })
        })
        .collect::<Result<Vec<_>, TranslationError>>()?;

    Ok(ManagedCertificateStatus {
        certificate_name: Some(certificate_name.to_string()),
        certificate_status: Some(certificate_status),
        domain_status,
        expire_time: certificate.expire_time.clone(),
    })
}

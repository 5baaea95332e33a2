//! # Status Mapping
//!
//! Translation of Compute Engine status values into the controller vocabulary.
//!
//! The certificate-level and domain-level tables are distinct types with
//! distinct output vocabularies, so a domain status can never be stored where
//! a certificate status is expected. Both tables are built once at startup and
//! never mutated.
//!
//! A cloud value missing from a table is a data-integrity defect: translation
//! fails with [`TranslationError`] instead of falling back to a default.

use crate::crd::{CertificateStatus, DomainStatus};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Compute Engine status values as they appear on the wire
pub mod cloud {
    pub const ACTIVE: &str = "ACTIVE";
    pub const EMPTY: &str = "";
    pub const MANAGED_CERTIFICATE_STATUS_UNSPECIFIED: &str =
        "MANAGED_CERTIFICATE_STATUS_UNSPECIFIED";
    pub const PROVISIONING: &str = "PROVISIONING";
    pub const PROVISIONING_FAILED: &str = "PROVISIONING_FAILED";
    pub const PROVISIONING_FAILED_PERMANENTLY: &str = "PROVISIONING_FAILED_PERMANENTLY";
    pub const RENEWAL_FAILED: &str = "RENEWAL_FAILED";
    pub const FAILED_CAA_CHECKING: &str = "FAILED_CAA_CHECKING";
    pub const FAILED_CAA_FORBIDDEN: &str = "FAILED_CAA_FORBIDDEN";
    pub const FAILED_NOT_VISIBLE: &str = "FAILED_NOT_VISIBLE";
    pub const FAILED_RATE_LIMITED: &str = "FAILED_RATE_LIMITED";
}

/// Level a status table translates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Certificate,
    Domain,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::Certificate => f.write_str("certificate"),
            StatusLevel::Domain => f.write_str("domain"),
        }
    }
}

/// Error returned when a cloud status has no entry in the table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("unknown {level} status {value:?} reported by Compute Engine")]
    UnknownStatus { level: StatusLevel, value: String },
}

/// Immutable lookup table from cloud vocabulary to controller vocabulary
#[derive(Debug, Clone)]
pub struct StatusTable<V> {
    level: StatusLevel,
    entries: HashMap<&'static str, V>,
}

/// Certificate-level translation table
pub type CertificateStatusTable = StatusTable<CertificateStatus>;

/// Domain-level translation table
pub type DomainStatusTable = StatusTable<DomainStatus>;

impl<V: Copy> StatusTable<V> {
    fn from_entries(level: StatusLevel, entries: &[(&'static str, V)]) -> Self {
        Self {
            level,
            entries: entries.iter().copied().collect(),
        }
    }

    /// Whether the cloud value has an entry in this table
    #[must_use]
    pub fn contains(&self, cloud_status: &str) -> bool {
        self.entries.contains_key(cloud_status)
    }

    /// Cloud values known to this table
    pub fn cloud_values(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl CertificateStatusTable {
    /// Certificate-level table
    #[must_use]
    pub fn certificate() -> Self {
        Self::from_entries(
            StatusLevel::Certificate,
            &[
                (cloud::ACTIVE, CertificateStatus::Active),
                (cloud::EMPTY, CertificateStatus::Empty),
                (
                    cloud::MANAGED_CERTIFICATE_STATUS_UNSPECIFIED,
                    CertificateStatus::Empty,
                ),
                (cloud::PROVISIONING, CertificateStatus::Provisioning),
                (
                    cloud::PROVISIONING_FAILED,
                    CertificateStatus::ProvisioningFailed,
                ),
                (
                    cloud::PROVISIONING_FAILED_PERMANENTLY,
                    CertificateStatus::ProvisioningFailedPermanently,
                ),
                (cloud::RENEWAL_FAILED, CertificateStatus::RenewalFailed),
            ],
        )
    }
}

impl DomainStatusTable {
    /// Domain-level table
    #[must_use]
    pub fn domain() -> Self {
        Self::from_entries(
            StatusLevel::Domain,
            &[
                (cloud::ACTIVE, DomainStatus::Active),
                (cloud::FAILED_CAA_CHECKING, DomainStatus::FailedCaaChecking),
                (cloud::FAILED_CAA_FORBIDDEN, DomainStatus::FailedCaaForbidden),
                (cloud::FAILED_NOT_VISIBLE, DomainStatus::FailedNotVisible),
                (cloud::FAILED_RATE_LIMITED, DomainStatus::FailedRateLimited),
                (cloud::PROVISIONING, DomainStatus::Provisioning),
            ],
        )
    }
}

/// Translate a cloud status value through a table
///
/// # Errors
///
/// Returns [`TranslationError::UnknownStatus`] when the value is not a key of
/// the table.
pub fn translate<V: Copy>(cloud_status: &str, table: &StatusTable<V>) -> Result<V, TranslationError> {
    table
        .entries
        .get(cloud_status)
        .copied()
        .ok_or_else(|| TranslationError::UnknownStatus {
            level: table.level,
            value: cloud_status.to_string(),
        })
}

/// Both translation tables, as handed to the reconciliation engine
#[derive(Debug, Clone)]
pub struct CertificateStatusConfig {
    pub certificate: CertificateStatusTable,
    pub domain: DomainStatusTable,
}

impl Default for CertificateStatusConfig {
    fn default() -> Self {
        Self {
            certificate: CertificateStatusTable::certificate(),
            domain: DomainStatusTable::domain(),
        }
    }
}

//! # Custom Resource Definitions
//!
//! CRD types for the Managed Certificate Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `ManagedCertificate` resource and its spec
//! - `status.rs` - Status types and the controller status vocabulary

mod spec;
mod status;

// Re-export all public types
pub use spec::{ManagedCertificate, ManagedCertificateSpec, MAX_DOMAINS};
pub use status::{CertificateStatus, DomainStatus, DomainStatusEntry, ManagedCertificateStatus};

//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use managed_certificate_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (ManagedCertificate, CertificateStatus, etc.)
//! - The SslCertificate provider trait and its REST implementation
//! - Reconciler and dispatcher types
//! - Config types (ControllerConfig, GceConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Provider trait and implementation
pub use crate::provider::gcp::SslCertificatesREST;
pub use crate::provider::{SslCertificate, SslCertificateError, SslCertificateProvider};

// Reconciler types - core controller functionality
pub use crate::controller::dispatcher::{Dispatcher, Reconcile, StatusMetrics};
pub use crate::controller::lister::{Lister, StoreLister};
pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};
pub use crate::controller::resource_id::ResourceId;
pub use crate::controller::status_mapping::{CertificateStatusConfig, TranslationError};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, GceConfig, TokenSource};

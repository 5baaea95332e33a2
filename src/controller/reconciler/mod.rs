//! # Reconciler
//!
//! Reconciles one ManagedCertificate with its backing SslCertificate.
//!
//! ## Module Structure
//!
//! - `types.rs` - Reconciler context and error types
//! - `kube_api.rs` - Kubernetes operations the reconciler performs
//! - `finalizer.rs` - Finalizer handling and cleanup on deletion
//! - `status.rs` - Status built from the SslCertificate
//! - `reconcile.rs` - Main reconciliation flow

mod finalizer;
mod kube_api;
mod reconcile;
mod status;
mod types;

pub use kube_api::{KubeManagedCertificateApi, ManagedCertificateApi};
pub use reconcile::reconcile;
pub use status::build_status;
pub use types::{Reconciler, ReconcilerError};

#[cfg(test)]
mod tests;

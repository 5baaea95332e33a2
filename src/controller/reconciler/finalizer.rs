//! # Finalizer
//!
//! Keeps ManagedCertificate resources around until their SslCertificate is deleted.

use crate::constants::MANAGED_CERTIFICATE_FINALIZER;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::resource_id::ResourceId;
use crate::crd::ManagedCertificate;
use tracing::{debug, info, warn};

pub(crate) fn has_finalizer(mcrt: &ManagedCertificate) -> bool {
    mcrt.metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|f| f == MANAGED_CERTIFICATE_FINALIZER))
}

/// Add the controller finalizer if it is missing
pub(crate) async fn ensure_finalizer(
    ctx: &Reconciler,
    id: &ResourceId,
    mcrt: &ManagedCertificate,
) -> Result<(), ReconcilerError> {
    if has_finalizer(mcrt) {
        return Ok(());
    }

    debug!("Adding finalizer {}", MANAGED_CERTIFICATE_FINALIZER);
    ctx.api
        .add_finalizer(id, MANAGED_CERTIFICATE_FINALIZER)
        .await?;
    Ok(())
}

/// Delete the backing SslCertificate, then release the resource
pub(crate) async fn finalize(
    ctx: &Reconciler,
    id: &ResourceId,
    mcrt: &ManagedCertificate,
) -> Result<(), ReconcilerError> {
    if let Some(name) = mcrt.certificate_name() {
        if ctx.ssl.exists(name).await? {
            info!(certificate.name = name, "Deleting SslCertificate of deleted ManagedCertificate");
            match ctx.ssl.delete(name).await {
                Ok(()) => {}
                // Deleted between the probe and the delete
                Err(e) if e.is_not_found() => {
                    warn!(certificate.name = name, "SslCertificate already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if has_finalizer(mcrt) {
        ctx.api
            .remove_finalizer(id, MANAGED_CERTIFICATE_FINALIZER)
            .await?;
        info!("Removed finalizer {}", MANAGED_CERTIFICATE_FINALIZER);
    }
    Ok(())
}

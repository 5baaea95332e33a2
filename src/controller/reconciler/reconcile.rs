//! # Reconcile
//!
//! Main reconciliation flow.
//!
//! Every step is idempotent, so a reconciliation that fails half way can be
//! retried from the start. The work queue guarantees a single reconciliation
//! per resource at a time.

use crate::constants::SSL_CERTIFICATE_NAME_PREFIX;
use crate::controller::reconciler::finalizer::{ensure_finalizer, finalize};
use crate::controller::reconciler::status::build_status;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::controller::resource_id::ResourceId;
use crate::crd::{ManagedCertificate, ManagedCertificateStatus};
use std::collections::BTreeSet;
use tracing::{debug, info, info_span, warn, Instrument};

/// Generate a fresh SslCertificate name
#[must_use]
pub fn new_certificate_name() -> String {
    format!("{}{}", SSL_CERTIFICATE_NAME_PREFIX, uuid::Uuid::new_v4())
}

/// Reconcile one ManagedCertificate
///
/// A resource that no longer exists is a success.
///
/// # Errors
///
/// Any error means the reconciliation should be retried later.
pub async fn reconcile(ctx: &Reconciler, id: &ResourceId) -> Result<(), ReconcilerError> {
    let span = info_span!(
        "controller.reconcile",
        resource.namespace = %id.namespace,
        resource.name = %id.name,
    );

    async move {
        let Some(mcrt) = ctx.api.get(id).await? else {
            debug!("ManagedCertificate no longer exists, nothing to do");
            return Ok(());
        };

        if mcrt.metadata.deletion_timestamp.is_some() {
            return finalize(ctx, id, &mcrt).await;
        }

        ensure_finalizer(ctx, id, &mcrt).await?;

        let certificate_name = certificate_name(ctx, id, &mcrt).await?;
        ensure_certificate(ctx, &certificate_name, &mcrt.spec.domains).await?;

        let certificate = ctx.ssl.get(&certificate_name).await?;
        if !same_domains(certificate.domains(), &mcrt.spec.domains) {
            return replace_certificate(ctx, id, &mcrt, &certificate_name, certificate.domains())
                .await;
        }

        let status = build_status(&certificate_name, &certificate, &ctx.statuses)?;
        if mcrt.status.as_ref() == Some(&status) {
            debug!(certificate.name = %certificate_name, "Status unchanged");
            return Ok(());
        }

        ctx.api.patch_status(id, &status).await?;
        info!(
            certificate.name = %certificate_name,
            certificate.status = %status.certificate_status.unwrap_or_default(),
            "Updated ManagedCertificate status"
        );
        Ok(())
    }
    .instrument(span)
    .await
}

/// Name recorded in status, or a fresh one persisted before anything is created
async fn certificate_name(
    ctx: &Reconciler,
    id: &ResourceId,
    mcrt: &ManagedCertificate,
) -> Result<String, ReconcilerError> {
    if let Some(name) = mcrt.certificate_name() {
        return Ok(name.to_string());
    }

    let name = new_certificate_name();
    let status = ManagedCertificateStatus {
        certificate_name: Some(name.clone()),
        ..mcrt.status.clone().unwrap_or_default()
    };
    ctx.api.patch_status(id, &status).await?;
    info!(certificate.name = %name, "Assigned SslCertificate name");
    Ok(name)
}

/// Create the SslCertificate unless it already exists
async fn ensure_certificate(
    ctx: &Reconciler,
    name: &str,
    domains: &[String],
) -> Result<(), ReconcilerError> {
    if ctx.ssl.exists(name).await? {
        return Ok(());
    }

    match ctx.ssl.create(name, domains).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // A create that timed out may still have gone through
            if ctx.ssl.exists(name).await? {
                warn!(certificate.name = name, error = %e, "Create failed but SslCertificate exists");
                Ok(())
            } else {
                Err(e.into())
            }
        }
    }
}

/// Delete a certificate whose domains no longer match and forget its name
async fn replace_certificate(
    ctx: &Reconciler,
    id: &ResourceId,
    mcrt: &ManagedCertificate,
    name: &str,
    actual: &[String],
) -> Result<(), ReconcilerError> {
    warn!(
        certificate.name = name,
        "SslCertificate domains {:?} differ from spec {:?}, recreating", actual, mcrt.spec.domains
    );

    match ctx.ssl.delete(name).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let status = ManagedCertificateStatus {
        certificate_name: None,
        ..mcrt.status.clone().unwrap_or_default()
    };
    ctx.api.patch_status(id, &status).await?;

    Err(ReconcilerError::DomainsChanged {
        name: name.to_string(),
        actual: actual.to_vec(),
        desired: mcrt.spec.domains.clone(),
    })
}

/// Compare domain sets, ignoring order and duplicates
fn same_domains(actual: &[String], desired: &[String]) -> bool {
    let actual: BTreeSet<&str> = actual.iter().map(String::as_str).collect();
    let desired: BTreeSet<&str> = desired.iter().map(String::as_str).collect();
    actual == desired
}

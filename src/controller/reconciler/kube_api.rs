//! # Kubernetes API
//!
//! The Kubernetes operations the reconciler performs on ManagedCertificate resources.

use crate::constants::FIELD_MANAGER;
use crate::controller::resource_id::ResourceId;
use crate::crd::{ManagedCertificate, ManagedCertificateStatus};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;

/// ManagedCertificate reads and writes
#[async_trait]
pub trait ManagedCertificateApi: Send + Sync {
    /// Fetch a resource, `None` when it does not exist
    async fn get(&self, id: &ResourceId) -> Result<Option<ManagedCertificate>, kube::Error>;

    /// Overwrite the status of a resource
    async fn patch_status(
        &self,
        id: &ResourceId,
        status: &ManagedCertificateStatus,
    ) -> Result<(), kube::Error>;

    /// Add a finalizer unless it is already present
    async fn add_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error>;

    /// Remove a finalizer if it is present
    async fn remove_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error>;
}

/// Status as a merge patch that replaces every field
///
/// Absent optional fields are sent as `null` so a merge patch clears them.
#[must_use]
pub fn status_patch(status: &ManagedCertificateStatus) -> serde_json::Value {
    json!({
        "status": {
            "certificateName": status.certificate_name,
            "certificateStatus": status.certificate_status,
            "domainStatus": status.domain_status,
            "expireTime": status.expire_time,
        }
    })
}

/// [`ManagedCertificateApi`] backed by the cluster
#[derive(Clone)]
pub struct KubeManagedCertificateApi {
    client: Client,
}

impl std::fmt::Debug for KubeManagedCertificateApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeManagedCertificateApi").finish_non_exhaustive()
    }
}

impl KubeManagedCertificateApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, id: &ResourceId) -> Api<ManagedCertificate> {
        if id.namespace.is_empty() {
            Api::default_namespaced(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), &id.namespace)
        }
    }

    async fn patch_finalizers(
        &self,
        id: &ResourceId,
        edit: impl FnOnce(&mut Vec<String>) -> bool + Send,
    ) -> Result<(), kube::Error> {
        let api = self.api(id);
        let Some(mcrt) = api.get_opt(&id.name).await? else {
            return Ok(());
        };

        let mut finalizers = mcrt.metadata.finalizers.unwrap_or_default();
        if !edit(&mut finalizers) {
            return Ok(());
        }

        // resourceVersion turns a concurrent finalizer change into a conflict
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": mcrt.metadata.resource_version,
            }
        });
        api.patch(&id.name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ManagedCertificateApi for KubeManagedCertificateApi {
    async fn get(&self, id: &ResourceId) -> Result<Option<ManagedCertificate>, kube::Error> {
        self.api(id).get_opt(&id.name).await
    }

    async fn patch_status(
        &self,
        id: &ResourceId,
        status: &ManagedCertificateStatus,
    ) -> Result<(), kube::Error> {
        self.api(id)
            .patch_status(
                &id.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(status_patch(status)),
            )
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error> {
        self.patch_finalizers(id, |finalizers| {
            if finalizers.iter().any(|f| f == finalizer) {
                return false;
            }
            finalizers.push(finalizer.to_string());
            true
        })
        .await
    }

    async fn remove_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), kube::Error> {
        self.patch_finalizers(id, |finalizers| {
            let before = finalizers.len();
            finalizers.retain(|f| f != finalizer);
            finalizers.len() != before
        })
        .await
    }
}

//! # Lister
//!
//! Read access to every ManagedCertificate known to the controller.

use crate::crd::ManagedCertificate;
use async_trait::async_trait;
use kube_runtime::reflector::store::WriterDropped;
use kube_runtime::reflector::Store;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListerError {
    #[error("ManagedCertificate cache will never become ready: {0}")]
    CacheClosed(#[from] WriterDropped),
}

/// Lists all ManagedCertificate resources
#[async_trait]
pub trait Lister: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Arc<ManagedCertificate>>, ListerError>;
}

/// [`Lister`] backed by a reflector cache
///
/// Listing waits for the initial sync so an empty cache is never mistaken
/// for an empty cluster.
#[derive(Clone)]
pub struct StoreLister {
    store: Store<ManagedCertificate>,
}

impl std::fmt::Debug for StoreLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLister")
            .field("cached", &self.store.len())
            .finish()
    }
}

impl StoreLister {
    #[must_use]
    pub fn new(store: Store<ManagedCertificate>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Lister for StoreLister {
    async fn list_all(&self) -> Result<Vec<Arc<ManagedCertificate>>, ListerError> {
        self.store.wait_until_ready().await?;
        Ok(self.store.state())
    }
}

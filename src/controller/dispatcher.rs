//! # Dispatcher
//!
//! Owns the work queue and the worker pool that drains it.
//!
//! Keys are `namespace/name` strings. Every key a worker takes is handed
//! back to the queue exactly once, whatever the outcome of its
//! reconciliation:
//!
//! - success forgets the key's retry history
//! - failure re-adds the key with exponential backoff
//! - a key that does not parse is dropped

use crate::controller::lister::{Lister, ListerError};
use crate::controller::queue::WorkQueue;
use crate::controller::rate_limiter::RateLimiter;
use crate::controller::reconciler::{self, Reconciler, ReconcilerError};
use crate::controller::resource_id::ResourceId;
use crate::crd::{CertificateStatus, ManagedCertificate};
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Reconciles one resource
#[async_trait]
pub trait Reconcile: Send + Sync {
    type Error: Display + Send + Sync;

    /// Idempotent; an error means the resource should be retried later
    async fn reconcile(&self, id: &ResourceId) -> Result<(), Self::Error>;
}

#[async_trait]
impl Reconcile for Reconciler {
    type Error = ReconcilerError;

    async fn reconcile(&self, id: &ResourceId) -> Result<(), ReconcilerError> {
        reconciler::reconcile(self, id).await
    }
}

/// Receives the certificate status histogram computed on every resync
pub trait StatusMetrics: Send + Sync {
    fn observe_statuses(&self, statuses: &HashMap<CertificateStatus, usize>);
}

/// [`StatusMetrics`] reporting to the Prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusStatusMetrics;

impl StatusMetrics for PrometheusStatusMetrics {
    fn observe_statuses(&self, statuses: &HashMap<CertificateStatus, usize>) {
        metrics::observe_managed_certificate_statuses(statuses);
    }
}

/// Calls [`WorkQueue::done`] when dropped
struct DoneGuard<'a> {
    queue: &'a WorkQueue<String>,
    key: &'a String,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.queue.done(self.key);
    }
}

pub struct Dispatcher<R> {
    queue: WorkQueue<String>,
    reconciler: R,
    lister: Arc<dyn Lister>,
    status_metrics: Arc<dyn StatusMetrics>,
}

impl<R> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl<R: Reconcile + 'static> Dispatcher<R> {
    #[must_use]
    pub fn new(
        reconciler: R,
        lister: Arc<dyn Lister>,
        status_metrics: Arc<dyn StatusMetrics>,
        rate_limiter: Arc<dyn RateLimiter<String>>,
    ) -> Self {
        Self {
            queue: WorkQueue::new(rate_limiter),
            reconciler,
            lister,
            status_metrics,
        }
    }

    #[must_use]
    pub fn queue(&self) -> &WorkQueue<String> {
        &self.queue
    }

    /// Add a key with the delay chosen by the rate limiter
    pub fn enqueue(&self, key: String) {
        self.queue.add_rate_limited(key);
        metrics::set_queue_depth(self.queue.len());
    }

    /// Enqueue the key of a resource
    pub fn enqueue_resource(&self, mcrt: &ManagedCertificate) {
        match ResourceId::from_object(mcrt) {
            Some(id) => self.enqueue(id.key()),
            None => warn!("Ignoring ManagedCertificate without a name"),
        }
    }

    /// Report the status histogram and enqueue every known resource
    ///
    /// # Errors
    ///
    /// Returns an error if the resources cannot be listed.
    pub async fn enqueue_all(&self) -> Result<(), ListerError> {
        let resources = self.lister.list_all().await?;
        if resources.is_empty() {
            info!("No ManagedCertificates to resync");
            return Ok(());
        }

        let mut statuses: HashMap<CertificateStatus, usize> = HashMap::new();
        for mcrt in &resources {
            *statuses.entry(mcrt.certificate_status()).or_default() += 1;
        }
        self.status_metrics.observe_statuses(&statuses);

        debug!(resources = resources.len(), "Enqueuing all ManagedCertificates");
        for mcrt in &resources {
            self.enqueue_resource(mcrt);
        }
        Ok(())
    }

    /// Process one key
    ///
    /// Returns `false` once the queue is shutting down.
    pub async fn process_next(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };
        let _done = DoneGuard {
            queue: &self.queue,
            key: &key,
        };
        metrics::set_queue_depth(self.queue.len());

        let id = match key.parse::<ResourceId>() {
            Ok(id) => id,
            Err(e) => {
                error!(key = %key, error = %e, "Dropping malformed queue key");
                self.queue.forget(&key);
                return true;
            }
        };

        metrics::increment_reconciliations();
        let start = Instant::now();
        let result = self.reconciler.reconcile(&id).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                debug!(resource.namespace = %id.namespace, resource.name = %id.name, "Reconciled");
                self.queue.forget(&key);
            }
            Err(e) => {
                let retries = self.queue.num_requeues(&key);
                handle_reconciliation_error(&id, &e, retries);
                self.queue.add_rate_limited(key.clone());
            }
        }
        true
    }

    /// Run `workers` concurrent processing loops until the queue shuts down
    pub async fn run_workers(self: Arc<Self>, workers: usize) {
        let mut tasks = JoinSet::new();
        for worker in 0..workers.max(1) {
            let dispatcher = Arc::clone(&self);
            tasks.spawn(async move {
                debug!(worker, "Worker started");
                while dispatcher.process_next().await {}
                debug!(worker, "Worker stopped");
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("Worker task failed: {}", e);
            }
        }
    }

    /// Stop handing out keys; in-flight reconciliations finish
    pub fn shutdown(&self) {
        info!("Shutting down work queue");
        self.queue.shut_down();
    }
}

/// Log and count a failed reconciliation; the key is retried with backoff
fn handle_reconciliation_error(id: &ResourceId, error: &impl Display, retries: u32) {
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.name = %id.name,
        resource.namespace = %id.namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation of {} failed: {}", id, error);
    if let Some(failures) = repeated_failures(retries) {
        warn!("{} has failed {} times in a row", id, failures);
    }
    metrics::increment_reconciliation_errors();
    metrics::increment_requeues_total("error-backoff");
}

/// Consecutive failures worth a warning, given the requeue count seen when an attempt failed
///
/// The initial enqueue already counts once, so the count equals the failures
/// including the one being handled.
fn repeated_failures(retries: u32) -> Option<u32> {
    (retries > 1).then_some(retries)
}

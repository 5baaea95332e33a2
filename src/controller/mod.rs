//! # Controller
//!
//! Core controller modules for the Managed Certificate Controller.
//!
//! - `backoff`: Exponential backoff for per-key retries
//! - `dispatcher`: Work queue owner and worker pool
//! - `lister`: Cached listing of ManagedCertificate resources
//! - `queue`: Deduplicating, rate-limited work queue
//! - `rate_limiter`: Per-key retry delays
//! - `reconciler`: Core reconciliation logic
//! - `resource_id`: Queue keys of ManagedCertificate resources
//! - `server`: HTTP server for metrics and health checks
//! - `status_mapping`: Compute Engine to controller status translation

pub mod backoff;
pub mod dispatcher;
pub mod lister;
pub mod queue;
pub mod rate_limiter;
pub mod reconciler;
pub mod resource_id;
pub mod server;
pub mod status_mapping;

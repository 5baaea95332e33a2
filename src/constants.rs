//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Prefix carried by every SslCertificate the controller creates.
///
/// External tooling identifies controller-owned certificates by this prefix,
/// so it must never change.
pub const SSL_CERTIFICATE_NAME_PREFIX: &str = "mcrt-";

/// Finalizer placed on ManagedCertificate resources so the backing
/// SslCertificate can be deleted before the resource disappears
pub const MANAGED_CERTIFICATE_FINALIZER: &str = "networking.gke.io/managed-certificate-controller";

/// Field manager name used for status and metadata patches
pub const FIELD_MANAGER: &str = "managed-certificate-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8910;

/// Default number of worker loops draining the work queue
pub const DEFAULT_WORKERS: usize = 2;

/// Default interval between full resyncs (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default initial per-key retry delay (milliseconds)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 5;

/// Default maximum per-key retry delay (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 1000;

/// Default client-side timeout for Compute Engine API calls (seconds)
pub const DEFAULT_CLOUD_TIMEOUT_SECS: u64 = 30;

/// Default delay before restarting the resource watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Compute Engine API base URL
pub const COMPUTE_API_BASE_URL: &str = "https://compute.googleapis.com";

/// GCE metadata server base URL (project id and Workload Identity tokens)
pub const METADATA_SERVER_URL: &str = "http://metadata.google.internal";

/// Environment variable naming a service account key file
pub const GOOGLE_APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// OAuth2 scope requested for service account tokens
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

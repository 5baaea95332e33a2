//! # Error Policy
//!
//! Handling of watch stream errors.
//!
//! Reconciliation errors never reach this layer: the dispatcher retries them
//! with per-key backoff. Watch errors are classified from their message and
//! delay the next poll of the stream, which makes the watcher re-list or
//! re-watch.

use std::time::Duration;
use tracing::{error, warn};

/// Class of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// Credentials rejected, RBAC may have been revoked
    Unauthorized,
    /// Resource version too old, the watcher re-lists on its own
    Expired,
    /// API server overloaded or still starting
    TooManyRequests,
    /// CRD missing or not served
    NotFound,
    Other,
}

/// Classify a watch error from its message
///
/// 404 is checked before 401 since a not-found body can also mention a
/// failed watch.
#[must_use]
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    let is_not_found = error.contains("ObjectNotFound")
        || error.contains("404")
        || error.contains("not found");
    if is_not_found {
        return WatchErrorKind::NotFound;
    }
    if error.contains("401") || error.contains("Unauthorized") || error.contains("403") {
        return WatchErrorKind::Unauthorized;
    }
    if error.contains("410") || error.contains("too old resource version") || error.contains("Gone")
    {
        return WatchErrorKind::Expired;
    }
    if error.contains("429") || error.contains("TooManyRequests") {
        return WatchErrorKind::TooManyRequests;
    }
    WatchErrorKind::Other
}

/// Log a watch error and return how long to wait before polling the stream again
#[must_use]
pub fn handle_watch_stream_error(error: &str, restart_delay: Duration) -> Duration {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error) {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch of ManagedCertificates was rejected, check the controller's RBAC: {}",
                error
            );
            restart_delay
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired, watch will restart");
            Duration::ZERO
        }
        WatchErrorKind::TooManyRequests => {
            warn!("API server is throttling the watch, backing off: {}", error);
            restart_delay
        }
        WatchErrorKind::NotFound => {
            error!(
                "ManagedCertificate API not found, is the CRD installed? {}",
                error
            );
            restart_delay
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error);
            restart_delay
        }
    }
}

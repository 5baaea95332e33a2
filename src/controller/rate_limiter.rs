//! # Rate Limiter
//!
//! Per-key retry delays for the work queue.
//!
//! Every key owns an independent [`ExponentialBackoff`], so one resource that
//! keeps failing never slows down the others. State for a key lives until
//! [`RateLimiter::forget`] is called, normally after a successful reconciliation.

use crate::controller::backoff::ExponentialBackoff;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Decides how long a key waits before it is handed out again
pub trait RateLimiter<K>: Send + Sync {
    /// Delay for the next add of `key`, advancing its retry state
    fn when(&self, key: &K) -> Duration;

    /// Drop all retry state of `key`
    fn forget(&self, key: &K);

    /// Number of rate-limited adds of `key` since it was last forgotten
    fn num_requeues(&self, key: &K) -> u32;
}

/// Exponential, capped, per-key rate limiter
#[derive(Debug)]
pub struct ItemExponentialRateLimiter<K> {
    base: Duration,
    max: Duration,
    backoff_states: Mutex<HashMap<K, ExponentialBackoff>>,
}

impl<K> ItemExponentialRateLimiter<K> {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Hash + Eq + Clone + Send> RateLimiter<K> for ItemExponentialRateLimiter<K> {
    fn when(&self, key: &K) -> Duration {
        // A poisoned map only means another worker panicked mid-update;
        // the backoff values themselves are still usable
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.clone())
            .or_insert_with(|| ExponentialBackoff::new(self.base, self.max))
            .next_backoff()
    }

    fn forget(&self, key: &K) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn num_requeues(&self, key: &K) -> u32 {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, ExponentialBackoff::failures)
    }
}

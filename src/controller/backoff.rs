//! # Exponential Backoff
//!
//! Provides a capped exponential backoff for retrying failed reconciliations.
//!
//! Each failure doubles the delay, starting from a small base so a transient
//! error is retried almost immediately, while a resource that keeps failing
//! settles at the cap instead of hammering the Compute API.
//!
//! Sequence with the default settings: 5ms, 10ms, 20ms, 40ms, ... capped at 1000s.
//!
//! ## Usage
//!
//! ```rust
//! use managed_certificate_controller::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_millis(5), Duration::from_secs(1000));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(5));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(10));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(20));
//! ```

use std::time::Duration;

/// Exponential backoff calculator
///
/// Generates `base * 2^n` for the n-th consecutive failure, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay for the first failure
    base: Duration,
    /// Upper bound of any delay
    max: Duration,
    /// Consecutive failures seen so far
    failures: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff
    ///
    /// # Arguments
    ///
    /// * `base` - Delay returned for the first failure
    /// * `max` - Cap applied to every delay
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Get the next backoff duration and advance the sequence
    ///
    /// # Example
    ///
    /// ```
    /// use managed_certificate_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(3));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(3)); // capped
    /// ```
    pub fn next_backoff(&mut self) -> Duration {
        let delay = self.peek();
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Delay the next call to [`ExponentialBackoff::next_backoff`] would return
    #[must_use]
    pub fn peek(&self) -> Duration {
        // 2^31 times any sane base is already far beyond the cap
        let factor = 1u32.checked_shl(self.failures.min(31)).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Consecutive failures so far
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

//! # Work Queue
//!
//! Deduplicating, rate-limited work queue shared by the worker loops.
//!
//! Guarantees:
//!
//! - A key waiting to be processed is stored once, however often it is added.
//!   When a delayed key is added again the earlier ready time wins.
//! - A key handed out by [`WorkQueue::get`] is never handed to a second worker
//!   before [`WorkQueue::done`]. Adding it in the meantime marks it dirty, and
//!   `done` puts it back on the queue.
//! - After [`WorkQueue::shut_down`] no key is handed out; waiting workers are
//!   woken and receive `None`.
//!
//! Workers only suspend inside `get`. All other operations take a short,
//! synchronous lock.

use crate::controller::rate_limiter::RateLimiter;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug)]
struct QueueState<K> {
    /// Keys ready to be handed out, in order
    queue: VecDeque<K>,
    /// Keys that need processing (queued, or re-added while in flight)
    dirty: HashSet<K>,
    /// Keys currently held by a worker
    processing: HashSet<K>,
    /// Delayed keys and the instant they become ready
    waiting: HashMap<K, Instant>,
    shutting_down: bool,
}

impl<K: Hash + Eq + Clone> QueueState<K> {
    fn insert_ready(&mut self, key: K) -> bool {
        if self.dirty.contains(&key) {
            return false;
        }
        self.dirty.insert(key.clone());
        if self.processing.contains(&key) {
            // Deferred until done()
            return false;
        }
        self.queue.push_back(key);
        true
    }

    /// Move every delayed key whose ready time has passed onto the queue
    fn promote_ready(&mut self, now: Instant) {
        let ready: Vec<K> = self
            .waiting
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in ready {
            self.waiting.remove(&key);
            self.insert_ready(key);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.waiting.values().min().copied()
    }
}

/// Deduplicating, rate-limited queue of keys
pub struct WorkQueue<K> {
    state: Mutex<QueueState<K>>,
    notify: Notify,
    rate_limiter: Arc<dyn RateLimiter<K>>,
}

impl<K> std::fmt::Debug for WorkQueue<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").finish_non_exhaustive()
    }
}

impl<K: Hash + Eq + Clone + Send + 'static> WorkQueue<K> {
    #[must_use]
    pub fn new(rate_limiter: Arc<dyn RateLimiter<K>>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                waiting: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            rate_limiter,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<K>> {
        // Queue state is updated atomically under the lock, so a poisoned
        // lock still guards consistent data
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a key that is ready now
    pub fn add(&self, key: K) {
        let mut state = self.lock();
        if state.shutting_down {
            return;
        }
        state.waiting.remove(&key);
        if state.insert_ready(key) {
            self.notify.notify_waiters();
        }
    }

    /// Add a key that becomes ready after `delay`
    pub fn add_after(&self, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let mut state = self.lock();
        if state.shutting_down || (state.dirty.contains(&key) && !state.processing.contains(&key))
        {
            // Already queued and ready
            return;
        }

        let ready_at = Instant::now() + delay;
        state
            .waiting
            .entry(key)
            .and_modify(|at| *at = (*at).min(ready_at))
            .or_insert(ready_at);
        // Sleeping workers recompute their deadline
        self.notify.notify_waiters();
    }

    /// Add a key after the delay chosen by the rate limiter
    pub fn add_rate_limited(&self, key: K) {
        let delay = self.rate_limiter.when(&key);
        self.add_after(key, delay);
    }

    /// Clear the retry state of a key
    pub fn forget(&self, key: &K) {
        self.rate_limiter.forget(key);
    }

    /// Number of rate-limited adds of a key since it was last forgotten
    pub fn num_requeues(&self, key: &K) -> u32 {
        self.rate_limiter.num_requeues(key)
    }

    /// Wait for the next ready key
    ///
    /// Returns `None` once the queue is shutting down. Every `Some(key)` must
    /// be paired with exactly one [`WorkQueue::done`].
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so no wakeup is lost
            notified.as_mut().enable();

            let deadline = {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                state.promote_ready(Instant::now());
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                state.next_deadline()
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark a key handed out by [`WorkQueue::get`] as processed
    pub fn done(&self, key: &K) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            self.notify.notify_waiters();
        }
    }

    /// Stop handing out keys and wake every waiting worker
    pub fn shut_down(&self) {
        let mut state = self.lock();
        state.shutting_down = true;
        self.notify.notify_waiters();
    }

    /// Number of keys ready to be handed out
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys waiting for their delay to pass
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.lock().waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::rate_limiter::ItemExponentialRateLimiter;

    fn queue() -> Arc<WorkQueue<String>> {
        Arc::new(WorkQueue::new(Arc::new(ItemExponentialRateLimiter::new(
            Duration::from_millis(5),
            Duration::from_secs(1000),
        ))))
    }

    #[tokio::test]
    async fn test_add_deduplicates() {
        let queue = queue();
        queue.add("default/site".to_string());
        queue.add("default/site".to_string());
        queue.add("default/other".to_string());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get().await.as_deref(), Some("default/site"));
        assert_eq!(queue.get().await.as_deref(), Some("default/other"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_add_while_processing_is_deferred_until_done() {
        let queue = queue();
        let key = "default/site".to_string();
        queue.add(key.clone());

        let got = queue.get().await.unwrap();
        queue.add(key.clone());
        assert!(queue.is_empty(), "in-flight key must not be queued twice");

        queue.done(&got);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_waits_for_delay() {
        let queue = queue();
        let start = Instant::now();
        queue.add_after("default/site".to_string(), Duration::from_secs(3));

        assert_eq!(queue.waiting_len(), 1);
        assert_eq!(queue.get().await.as_deref(), Some("default/site"));
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_ready_time_wins() {
        let queue = queue();
        let start = Instant::now();
        queue.add_after("default/site".to_string(), Duration::from_secs(10));
        queue.add_after("default/site".to_string(), Duration::from_secs(1));
        queue.add_after("default/site".to_string(), Duration::from_secs(5));

        assert_eq!(queue.waiting_len(), 1);
        assert_eq!(queue.get().await.as_deref(), Some("default/site"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_add_wakes_sleeping_worker() {
        let queue = queue();
        let worker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.add_after("default/site".to_string(), Duration::from_millis(50));
        assert_eq!(worker.await.unwrap().as_deref(), Some("default/site"));
    }

    #[tokio::test]
    async fn test_shut_down_wakes_waiting_workers() {
        let queue = queue();
        let worker = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.shut_down();
        assert_eq!(worker.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shut_down_stops_handing_out_keys() {
        let queue = queue();
        queue.add("default/site".to_string());
        queue.shut_down();

        assert_eq!(queue.get().await, None);
        queue.add("default/other".to_string());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_rate_limited_uses_growing_delays() {
        let queue = queue();
        let key = "default/site".to_string();

        queue.add_rate_limited(key.clone());
        let start = Instant::now();
        let got = queue.get().await.unwrap();
        queue.done(&got);
        assert!(start.elapsed() >= Duration::from_millis(5));

        queue.add_rate_limited(key.clone());
        let start = Instant::now();
        let got = queue.get().await.unwrap();
        queue.done(&got);
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(queue.num_requeues(&key), 2);

        queue.forget(&key);
        assert_eq!(queue.num_requeues(&key), 0);
    }
}

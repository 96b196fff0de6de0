//! Deduplicating, rate-limited work queue
//!
//! Feeds reconcile workers with namespace/name keys while enforcing two
//! invariants: a key is never queued twice (duplicate adds coalesce into one
//! pending occurrence), and a key is never handed to two workers at once
//! (an add while the key is in flight is redelivered only after `done`).
//!
//! Failed keys come back through [`WorkQueue::add_rate_limited`], which
//! delays redelivery by `base * 2^failures` up to a cap; [`WorkQueue::forget`]
//! resets the failure counter on success.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::trace;

/// Work queue keyed by `K`, shared between notification handlers and workers.
///
/// All methods take `&self`; the queue is intended to live in an [`Arc`].
/// Delayed adds (`add_after`, `add_rate_limited`) spawn a timer task and
/// therefore take `self: Arc<Self>`.
pub struct WorkQueue<K> {
    inner: Mutex<Inner<K>>,
    wakeup: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

struct Inner<K> {
    /// Keys ready for delivery, in arrival order
    ready: VecDeque<K>,
    /// Distinct keys enqueued or awaiting redelivery (the pending set)
    pending: HashSet<K>,
    /// Keys currently held by a worker between `get` and `done`
    in_flight: HashSet<K>,
    /// Consecutive rate-limited requeues per key
    failures: HashMap<K, u32>,
    shutting_down: bool,
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: VecDeque::new(),
                pending: HashSet::new(),
                in_flight: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            wakeup: Notify::new(),
            base_delay,
            max_delay,
        }
    }

    /// Enqueue `key` for processing.
    ///
    /// A key already pending is left alone; a key currently in flight is
    /// marked for redelivery after its `done`. Adds after shutdown are
    /// ignored.
    pub fn add(&self, key: K) {
        let mut inner = self.locked();
        if inner.shutting_down {
            trace!(?key, "queue shutting down, dropping add");
            return;
        }
        if !inner.pending.insert(key.clone()) {
            return;
        }
        if inner.in_flight.contains(&key) {
            // Redelivered by done() once the current pass finishes
            return;
        }
        inner.ready.push_back(key);
        drop(inner);
        self.wakeup.notify_one();
    }

    /// Enqueue `key` after `delay`.
    pub fn add_after(self: Arc<Self>, key: K, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        if self.locked().shutting_down {
            return;
        }
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.add(key);
        });
    }

    /// Enqueue `key` after an exponential per-key backoff delay.
    pub fn add_rate_limited(self: Arc<Self>, key: K) {
        let delay = {
            let mut inner = self.locked();
            let failures = inner.failures.entry(key.clone()).or_insert(0);
            let delay = backoff_delay(self.base_delay, self.max_delay, *failures);
            *failures += 1;
            delay
        };
        trace!(?key, ?delay, "requeueing with backoff");
        self.add_after(key, delay);
    }

    /// Number of rate-limited requeues recorded for `key`.
    pub fn num_requeues(&self, key: &K) -> u32 {
        self.locked().failures.get(key).copied().unwrap_or(0)
    }

    /// Reset the failure counter for `key`. Called after a successful pass.
    pub fn forget(&self, key: &K) {
        self.locked().failures.remove(key);
    }

    /// Wait for the next key.
    ///
    /// Returns `None` once the queue has been shut down and drained. A
    /// returned key is in flight until [`WorkQueue::done`] is called for it.
    pub async fn get(&self) -> Option<K> {
        loop {
            {
                let mut inner = self.locked();
                if let Some(key) = inner.ready.pop_front() {
                    inner.pending.remove(&key);
                    inner.in_flight.insert(key.clone());
                    if !inner.ready.is_empty() || inner.shutting_down {
                        // Chain the wakeup so sibling workers drain the rest
                        self.wakeup.notify_one();
                    }
                    return Some(key);
                }
                if inner.shutting_down {
                    // Wake the next blocked worker so all observe shutdown
                    self.wakeup.notify_one();
                    return None;
                }
            }
            self.wakeup.notified().await;
        }
    }

    /// Mark a pass over `key` finished. Must be called exactly once per
    /// successful `get`. If the key was re-added while in flight it becomes
    /// ready again immediately.
    pub fn done(&self, key: &K) {
        let mut inner = self.locked();
        inner.in_flight.remove(key);
        if inner.pending.contains(key) {
            inner.ready.push_back(key.clone());
            drop(inner);
            self.wakeup.notify_one();
        }
    }

    /// Shut the queue down. Idempotent. Already-queued keys still drain;
    /// once empty, every blocked and future `get` returns `None`.
    pub fn shut_down(&self) {
        let mut inner = self.locked();
        inner.shutting_down = true;
        drop(inner);
        self.wakeup.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.locked().shutting_down
    }

    /// Number of keys ready for delivery (excludes in-flight keys).
    pub fn len(&self) -> usize {
        self.locked().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locked(&self) -> MutexGuard<'_, Inner<K>> {
        // Poisoning only matters mid-panic; the state itself stays consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `base * 2^attempt`, saturating at `max`.
fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |d| d.min(max))
}

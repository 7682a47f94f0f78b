//! Time-bounded memoization with a single-flight guarantee.
//!
//! Entries are keyed by value (for the pipeline: the resolved source files
//! and their modification times). Concurrent callers asking for the same key
//! while it is being computed block on that one computation instead of
//! starting their own. A failed computation is not cached and leaves no
//! entry behind once no caller is still waiting on it; the next caller
//! retries.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

struct Slot<V> {
    created: Instant,
    value: Arc<OnceCell<Arc<V>>>,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            created: Instant::now(),
            value: Arc::new(OnceCell::new()),
        }
    }

    /// In-flight slots never expire, otherwise waiters could be overtaken by
    /// a second computation of the same key.
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.value.get().is_none() || self.created.elapsed() < ttl
    }
}

/// Memoizes values of type `V` by key for a fixed time-to-live.
pub struct MemoCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key`, computing it with `compute` when
    /// absent or expired. At most one computation per key runs at a time.
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let cell = {
            let mut slots = self.slots.lock();
            slots.retain(|_, slot| slot.is_fresh(self.ttl));
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
            Arc::clone(&slot.value)
        };

        if let Some(value) = cell.get() {
            debug!("memoized value reused");
            return Ok(Arc::clone(value));
        }
        match cell.get_or_try_init(|| compute().map(Arc::new)) {
            Ok(value) => Ok(Arc::clone(value)),
            Err(error) => {
                self.discard_failed(key, &cell);
                Err(error)
            }
        }
    }

    /// Removes the slot left behind by a failed computation, unless another
    /// caller already holds it and will retry the initialisation itself.
    fn discard_failed(&self, key: &K, cell: &Arc<OnceCell<Arc<V>>>) {
        let mut slots = self.slots.lock();
        let orphaned = slots.get(key).is_some_and(|slot| {
            Arc::ptr_eq(&slot.value, cell)
                && slot.value.get().is_none()
                && Arc::strong_count(cell) == 2
        });
        if orphaned {
            slots.remove(key);
            debug!("failed computation discarded");
        }
    }

    /// Drops the entry for `key` so the next request recomputes it.
    pub fn invalidate(&self, key: &K) -> bool {
        self.slots.lock().remove(key).is_some()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of live entries, in-flight computations included.
    pub fn len(&self) -> usize {
        let mut slots = self.slots.lock();
        slots.retain(|_, slot| slot.is_fresh(self.ttl));
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

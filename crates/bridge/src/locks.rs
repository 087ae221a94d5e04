//! Keyed async mutexes.
//!
//! Operations on the same key run one at a time; different keys never
//! contend. A key's mutex is dropped from the table once nobody holds or
//! waits on it.

use std::{hash::Hash, sync::Arc};

use {
    dashmap::DashMap,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

type Slot = Arc<Mutex<()>>;

pub struct KeyedLocks<K: Eq + Hash> {
    slots: DashMap<K, Slot>,
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let slot = Arc::clone(&*self.slots.entry(key.clone()).or_default());
        let guard = slot.lock_owned().await;
        KeyGuard {
            slots: &self.slots,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub struct KeyGuard<'a, K: Eq + Hash> {
    slots: &'a DashMap<K, Slot>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        // Release first so the strong count only reflects waiters.
        self.guard.take();
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}

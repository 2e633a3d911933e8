//! Per-key lock table
//!
//! Each key gets its own mutex, created on first use and evicted once no
//! caller holds or waits on it. A `LockSet` holds any number of keys at once;
//! keys are taken in sorted order so two callers locking overlapping sets
//! cannot deadlock.

use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type Slots<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

/// Lock table keyed by `K`
pub struct KeyedLocks<K: Eq + Hash> {
    slots: Slots<K>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Block until `key` is held exclusively.
    pub fn lock(&self, key: K) -> LockSet<K> {
        self.lock_all([key])
    }

    /// Block until every key is held exclusively. Duplicates are ignored.
    pub fn lock_all(&self, keys: impl IntoIterator<Item = K>) -> LockSet<K> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let guards = keys.iter().map(|key| self.slot(key).lock_arc()).collect();
        LockSet {
            slots: Arc::clone(&self.slots),
            keys,
            guards,
        }
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    // The shard guard is dropped before the caller blocks on the mutex.
    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.slots.entry(key.clone()).or_default())
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> fmt::Debug for KeyedLocks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Keys held by one caller; released on drop
pub struct LockSet<K: Eq + Hash> {
    slots: Slots<K>,
    keys: Vec<K>,
    guards: Vec<ArcMutexGuard<RawMutex, ()>>,
}

impl<K: Eq + Hash + Ord> LockSet<K> {
    /// Whether `key` is part of this set
    pub fn covers(&self, key: &K) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Held keys, sorted
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K: Eq + Hash> Drop for LockSet<K> {
    fn drop(&mut self) {
        self.guards.clear();
        // The table's own handle is the only one left when nobody else
        // holds or is about to lock the slot.
        for key in &self.keys {
            self.slots.remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for LockSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockSet").field("keys", &self.keys).finish()
    }
}

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use.
///
/// Guards are owned so they can be held across `.await` points while the
/// holder talks to the stores. Callers that need both an order lock and an
/// account lock must take the order lock first.
pub struct LockRegistry<K: Eq + Hash + Clone> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> LockRegistry<K> {
    pub fn new() -> Self {
        LockRegistry {
            locks: DashMap::new(),
        }
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held while waiting
        let lock = self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the entry for `key` if nobody holds or waits on it.
    pub fn release_idle(&self, key: &K) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for LockRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

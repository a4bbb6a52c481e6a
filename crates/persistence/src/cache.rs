//! Bounded LRU cache for reference data.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::metrics::record_cache_lookup;

/// Default number of entries kept per reference cache.
pub const DEFAULT_CAPACITY: usize = 32;

/// Thread-safe LRU map shared by the reference lookups.
///
/// Values are cloned out so the lock is never held across an await.
pub struct ReferenceCache<K, V> {
    name: &'static str,
    entries: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> ReferenceCache<K, V> {
    /// A capacity of zero falls back to one entry.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.lock().get(key).cloned();
        record_cache_lookup(self.name, value.is_some());
        value
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().put(key, value);
    }

    /// Drops every entry.
    pub fn invalidate(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

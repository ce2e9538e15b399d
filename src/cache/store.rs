//! Eviction Cache Module
//!
//! Bounded key to bytes store combining a slot index with LRU ordering and
//! lazy TTL expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::{CacheEntry, CacheStats, LruList};

// == Store Inner ==
/// State guarded by the cache lock.
///
/// `index` and `order` always hold exactly the same key set.
#[derive(Debug, Default)]
struct StoreInner {
    index: HashMap<String, usize>,
    order: LruList<CacheEntry>,
    stats: CacheStats,
    generation: u64,
}

impl StoreInner {
    fn insert(&mut self, key: String, value: Vec<u8>, ttl: Duration, max_entries: usize) {
        if let Some(&slot) = self.index.get(&key) {
            if let Some(entry) = self.order.get_mut(slot) {
                entry.refresh(value, ttl);
            }
            self.order.move_to_front(slot);
            return;
        }

        let slot = self.order.push_front(CacheEntry::new(key.clone(), value, ttl));
        self.index.insert(key, slot);

        // Only one entry is added per call, so at most one is evicted
        if max_entries > 0 && self.order.len() > max_entries {
            if let Some(evicted) = self.order.pop_back() {
                self.index.remove(&evicted.key);
                self.stats.record_eviction();
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.order.remove(slot);
                true
            }
            None => false,
        }
    }
}

// == Eviction Cache ==
/// Thread-safe TTL cache with least-recently-used eviction.
///
/// Every operation takes the same exclusive lock, `get` included, because a
/// hit reorders the recency list. Expired entries are only purged when a
/// `get` touches them; there is no background sweep.
///
/// The cache also keeps a generation counter that `clear` bumps. Writers that
/// read their value from somewhere else first can capture the generation up
/// front and use [`EvictionCache::set_if_generation`] so that a value read
/// before a `clear` never lands after it.
#[derive(Debug)]
pub struct EvictionCache {
    inner: Mutex<StoreInner>,
    /// Maximum number of entries, 0 means unbounded
    max_entries: usize,
}

impl EvictionCache {
    // == Constructor ==
    /// Creates an empty cache holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            max_entries,
        }
    }

    // == Set ==
    /// Inserts or replaces `key`, expiring `ttl` from now.
    ///
    /// The entry becomes most recently used. If a new key pushes the cache
    /// over capacity, the least recently used entry is evicted.
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>, ttl: Duration) {
        let mut inner = self.inner.lock();
        inner.insert(key.into(), value, ttl, self.max_entries);
    }

    /// Like [`EvictionCache::set`], but only if no `clear` happened since
    /// `generation` was read. Returns whether the value was stored.
    pub fn set_if_generation(
        &self,
        key: impl Into<String>,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.insert(key.into(), value, ttl, self.max_entries);
        true
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry is purged as a side effect. A hit promotes the entry
    /// to most recently used.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_with(key, |bytes| Some(bytes.to_vec()))
    }

    // == Get With ==
    /// Looks up `key` and converts the stored bytes with `convert` under the
    /// lock.
    ///
    /// Only a successful conversion counts as a hit and promotes the entry.
    /// If `convert` returns `None` the entry is purged and the lookup counts
    /// as a miss.
    pub fn get_with<T>(&self, key: &str, convert: impl FnOnce(&[u8]) -> Option<T>) -> Option<T> {
        let mut inner = self.inner.lock();

        let Some(&slot) = inner.index.get(key) else {
            inner.stats.record_miss();
            return None;
        };

        let expired = inner
            .order
            .get(slot)
            .map_or(true, |entry| entry.is_expired_at(Instant::now()));
        if expired {
            inner.remove(key);
            inner.stats.record_expiration();
            inner.stats.record_miss();
            return None;
        }

        let converted = inner
            .order
            .get(slot)
            .and_then(|entry| convert(&entry.value));
        match converted {
            Some(value) => {
                inner.order.move_to_front(slot);
                inner.stats.record_hit();
                Some(value)
            }
            None => {
                inner.remove(key);
                inner.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key` if present. Returns whether an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().remove(key)
    }

    // == Clear ==
    /// Removes every entry and starts a new generation, which is returned.
    pub fn clear(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.index.clear();
        inner.order.clear();
        inner.generation = inner.generation.wrapping_add(1);
        inner.generation
    }

    /// Current generation, bumped by every `clear`.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.order.len());
        stats
    }

    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.order.iter().map(|entry| entry.key.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn index_len(&self) -> usize {
        self.inner.lock().index.len()
    }
}

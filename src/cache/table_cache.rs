//! Table-level cache context: key resolution, row encoding and the
//! eviction cache bound together under one table's settings.

use tracing::debug;

use crate::cache::codec::{decode_row, encode_row};
use crate::cache::resolver::{key_from_row, resolve_cache_key};
use crate::cache::{CacheConfig, CacheStats, EvictionCache};
use crate::db::Row;
use crate::error::CacheError;
use crate::query::FilterArg;

/// One table's cache. Failures on this path are logged and absorbed; none of
/// these methods return an error to the table operation.
#[derive(Debug)]
pub struct TableCache {
    table: String,
    config: CacheConfig,
    store: EvictionCache,
}

impl TableCache {
    // == Constructor ==
    /// Creates an empty cache for `table` sized by `config.max_entries`.
    pub fn new(table: impl Into<String>, config: CacheConfig) -> Self {
        let store = EvictionCache::new(config.max_entries);
        Self {
            table: table.into(),
            config,
            store,
        }
    }

    /// Settings this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Underlying eviction cache.
    pub fn store(&self) -> &EvictionCache {
        &self.store
    }

    // == Key Resolution ==
    /// Cache key named by filter arguments.
    pub fn resolve_key(&self, args: &[FilterArg]) -> Result<String, CacheError> {
        resolve_cache_key(Some(&self.config), args)
    }

    /// Cache key of a result row.
    pub fn row_key(&self, row: &Row) -> Result<String, CacheError> {
        key_from_row(Some(&self.config), row)
    }

    // == Lookup ==
    /// Returns the cached row the filter arguments point at, if any.
    ///
    /// An entry that no longer decodes is purged and reported as a miss.
    pub fn try_get(&self, args: &[FilterArg]) -> Option<Row> {
        let key = match self.resolve_key(args) {
            Ok(key) => key,
            Err(e) => {
                debug!(table = %self.table, "cache lookup skipped: {}", e);
                return None;
            }
        };

        let table = &self.table;
        let row = self.store.get_with(&key, |bytes| {
            decode_row(bytes)
                .map_err(|e| debug!(table = %table, key = %key, "purging undecodable entry: {}", e))
                .ok()
        })?;
        debug!(table = %self.table, key = %key, "cache hit");
        Some(row)
    }

    // == Generation ==
    /// Generation to capture before a data-store read whose result will be
    /// populated later.
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    // == Populate ==
    /// Stores `row` under its key. Best-effort.
    pub fn populate(&self, row: &Row) {
        if let Some((key, bytes)) = self.prepare(row) {
            self.store.set(key, bytes, self.config.ttl);
        }
    }

    /// Stores `row` unless the cache was cleared since `generation`.
    /// Returns whether it was stored.
    pub fn populate_at(&self, row: &Row, generation: u64) -> bool {
        let Some((key, bytes)) = self.prepare(row) else {
            return false;
        };
        let stored = self
            .store
            .set_if_generation(key.as_str(), bytes, self.config.ttl, generation);
        if !stored {
            debug!(table = %self.table, key = %key, "dropping stale cache populate");
        }
        stored
    }

    fn prepare(&self, row: &Row) -> Option<(String, Vec<u8>)> {
        let key = self
            .row_key(row)
            .map_err(|e| debug!(table = %self.table, "cache populate skipped: {}", e))
            .ok()?;
        let bytes = encode_row(row)
            .map_err(|e| debug!(table = %self.table, key = %key, "cache populate skipped: {}", e))
            .ok()?;
        Some((key, bytes))
    }

    // == Invalidation ==
    /// Removes one key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.store.delete(key)
    }

    /// Removes the entry for `row`'s key, if it resolves.
    pub fn invalidate_row(&self, row: &Row) -> bool {
        match self.row_key(row) {
            Ok(key) => self.invalidate(&key),
            Err(_) => false,
        }
    }

    /// Clears every entry and returns the generation that starts.
    pub fn invalidate_all(&self) -> u64 {
        debug!(table = %self.table, "clearing cache");
        self.store.clear()
    }

    // == Stats ==
    /// Hit, miss and eviction counters of this table's cache.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

//! Table Module
//!
//! CRUD operations on one database table, with an optional read-through
//! cache in front of the data store.
//!
//! Cache policy:
//! - single-row reads are served from the cache when the filters resolve to
//!   a cached key, and populate it synchronously on a miss
//! - multi-row reads and inserts populate it in the background
//! - updates and deletes clear the whole cache before returning

mod raw;
mod read;
mod schema;
mod write;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheConfig, CacheStats, TableCache};
use crate::db::{DataStore, Row};
use crate::error::{Result, TableError};
use crate::query::{is_valid_identifier, Column, Statement};
use crate::tasks::{CacheJob, CacheWorker};

/// A table's cache together with the worker that applies its detached jobs.
struct CacheContext {
    cache: Arc<TableCache>,
    worker: CacheWorker,
}

/// A database table and its declared columns.
pub struct Table {
    name: String,
    columns: Vec<Column>,
    store: Arc<dyn DataStore>,
    cache: Option<CacheContext>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("cache", &self.cache.as_ref().map(|ctx| ctx.cache.config()))
            .finish()
    }
}

impl Table {
    // == Constructor ==
    /// Creates a table handle. The table name and every column name must be
    /// plain identifiers.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        store: Arc<dyn DataStore>,
    ) -> Result<Self> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(TableError::InvalidIdentifier(name));
        }
        if let Some(bad) = columns.iter().find(|c| !is_valid_identifier(&c.name)) {
            return Err(TableError::InvalidIdentifier(bad.name.clone()));
        }

        Ok(Self {
            name,
            columns,
            store,
            cache: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    // == Cache Control ==
    /// Turns caching on with `config`.
    ///
    /// Enabling with the configuration already in effect keeps the existing
    /// cache; any other configuration starts from an empty one. A disabled
    /// configuration turns caching off. Fails with
    /// [`TableError::NoRuntime`] outside a tokio runtime, leaving the current
    /// cache in place.
    pub fn enable_cache(&mut self, config: CacheConfig) -> Result<()> {
        if !config.enabled {
            self.disable_cache();
            return Ok(());
        }
        if self
            .cache
            .as_ref()
            .is_some_and(|ctx| ctx.cache.config() == &config)
        {
            return Ok(());
        }

        debug!(
            table = %self.name,
            key_field = %config.key_field,
            ttl_secs = config.ttl.as_secs(),
            max_entries = config.max_entries,
            "enabling cache"
        );
        let capacity = config.queue_capacity;
        let cache = Arc::new(TableCache::new(self.name.clone(), config));
        let worker = CacheWorker::spawn(cache.clone(), capacity).map_err(TableError::NoRuntime)?;
        self.cache = Some(CacheContext { cache, worker });
        Ok(())
    }

    /// Drops the cache and stops its worker.
    pub fn disable_cache(&mut self) {
        if self.cache.take().is_some() {
            debug!(table = %self.name, "cache disabled");
        }
    }

    pub fn cache(&self) -> Option<&Arc<TableCache>> {
        self.cache.as_ref().map(|ctx| &ctx.cache)
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache().map(|cache| cache.stats())
    }

    /// Waits until all background cache work queued so far has been applied.
    pub async fn flush_cache_tasks(&self) {
        if let Some(ctx) = &self.cache {
            ctx.worker.flush().await;
        }
    }

    // == Internal Helpers ==
    fn cached(&self) -> Option<&TableCache> {
        self.cache.as_ref().map(|ctx| ctx.cache.as_ref())
    }

    /// Generation to tag rows that are about to be read.
    fn cache_generation(&self) -> Option<u64> {
        self.cached().map(TableCache::generation)
    }

    fn schedule(&self, job: CacheJob) {
        if let Some(ctx) = &self.cache {
            ctx.worker.submit(job);
        }
    }

    /// Queues `rows` for population if they were read at `generation`.
    fn schedule_populate(&self, rows: &[Row], generation: Option<u64>) {
        if let Some(generation) = generation {
            if !rows.is_empty() {
                self.schedule(CacheJob::Populate {
                    rows: rows.to_vec(),
                    generation,
                });
            }
        }
    }

    async fn run_query(&self, operation: &'static str, stmt: Statement) -> Result<Vec<Row>> {
        debug!(table = %self.name, operation, sql = %stmt.sql, params = ?stmt.params, "executing");
        self.store
            .query(&stmt.sql, stmt.params)
            .await
            .map_err(|e| TableError::from_store(operation, e))
    }

    async fn run_execute(&self, operation: &'static str, stmt: Statement) -> Result<u64> {
        debug!(table = %self.name, operation, sql = %stmt.sql, params = ?stmt.params, "executing");
        self.store
            .execute(&stmt.sql, stmt.params)
            .await
            .map_err(|e| TableError::from_store(operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DataType;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    struct NoStore;

    #[async_trait]
    impl DataStore for NoStore {
        async fn query(&self, _: &str, _: Vec<Value>) -> std::result::Result<Vec<Row>, sqlx::Error> {
            Ok(Vec::new())
        }

        async fn execute(&self, _: &str, _: Vec<Value>) -> std::result::Result<u64, sqlx::Error> {
            Ok(0)
        }
    }

    fn table() -> Table {
        Table::new(
            "users",
            vec![Column::new("id", DataType::serial().primary_key())],
            Arc::new(NoStore),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_names() {
        let err = Table::new("users; drop", Vec::new(), Arc::new(NoStore)).unwrap_err();
        assert!(matches!(err, TableError::InvalidIdentifier(name) if name == "users; drop"));

        let columns = vec![Column::new("bad name", DataType::text())];
        let err = Table::new("users", columns, Arc::new(NoStore)).unwrap_err();
        assert!(matches!(err, TableError::InvalidIdentifier(name) if name == "bad name"));
    }

    #[tokio::test]
    async fn test_enable_cache_is_idempotent_for_same_config() {
        let mut table = table();
        let config = CacheConfig::new("id", Duration::from_secs(5));

        table.enable_cache(config.clone()).unwrap();
        let first = table.cache().cloned().unwrap();
        table.enable_cache(config).unwrap();
        assert!(Arc::ptr_eq(&first, table.cache().unwrap()));

        table.enable_cache(CacheConfig::new("id", Duration::from_secs(9))).unwrap();
        assert!(!Arc::ptr_eq(&first, table.cache().unwrap()));
    }

    #[tokio::test]
    async fn test_disable_cache() {
        let mut table = table();
        table.enable_cache(CacheConfig::new("id", Duration::from_secs(5))).unwrap();
        assert!(table.cache_stats().is_some());

        table.enable_cache(CacheConfig::disabled()).unwrap();
        assert!(table.cache().is_none());

        table.enable_cache(CacheConfig::new("id", Duration::from_secs(5))).unwrap();
        table.disable_cache();
        assert!(table.cache_stats().is_none());
        table.flush_cache_tasks().await;
    }

    #[test]
    fn test_enable_cache_outside_runtime_is_an_error() {
        let mut table = table();
        let err = table
            .enable_cache(CacheConfig::new("id", Duration::from_secs(5)))
            .unwrap_err();
        assert!(matches!(err, TableError::NoRuntime(_)));
        assert!(table.cache().is_none());

        // Turning caching off needs no runtime
        table.enable_cache(CacheConfig::disabled()).unwrap();
    }
}

//! Write operations.
//!
//! Inserts only add entries to the cache. Updates and deletes clear it
//! outright: once they return, no entry read before the write can be
//! served or stored.

use tracing::debug;

use crate::db::Row;
use crate::error::{Result, TableError};
use crate::query::{statement, FilterArg};
use crate::table::Table;
use crate::tasks::CacheJob;

impl Table {
    /// Inserts `data` and returns the stored row. Keys that are not declared
    /// columns are ignored.
    pub async fn insert(&self, data: &Row) -> Result<Row> {
        let stmt = statement::insert(&self.name, &self.columns, data)?;
        let generation = self.cache_generation();
        let row = self
            .run_query("insert", stmt)
            .await?
            .into_iter()
            .next()
            .ok_or(TableError::NoRowsReturned("insert"))?;

        self.schedule_populate(std::slice::from_ref(&row), generation);
        Ok(row)
    }

    /// Inserts all rows in one statement. The column set is taken from the
    /// first row.
    pub async fn insert_many(&self, rows: &[Row]) -> Result<Vec<Row>> {
        let stmt = statement::insert_many(&self.name, &self.columns, rows)?;
        let generation = self.cache_generation();
        let inserted = self.run_query("insert many", stmt).await?;
        if inserted.is_empty() {
            return Err(TableError::NoRowsReturned("insert many"));
        }

        self.schedule_populate(&inserted, generation);
        Ok(inserted)
    }

    /// Updates the rows matching `filters` and returns them.
    ///
    /// The cache is cleared first. The updated rows are then queued for
    /// population against the fresh cache, unless another write cleared it
    /// while this one was in flight: its rows may already be superseded.
    pub async fn update(&self, data: &Row, filters: &[FilterArg]) -> Result<Vec<Row>> {
        let stmt = statement::update(&self.name, &self.columns, data, filters)?;
        let before = self.cache_generation();
        let updated = self.run_query("update", stmt).await?;

        if let Some(cache) = self.cached() {
            let cleared = cache.invalidate_all();
            match before {
                Some(before) if before.wrapping_add(1) == cleared => {
                    self.schedule_populate(&updated, Some(cleared));
                }
                _ => debug!(table = %self.name, "concurrent write, skipping repopulate"),
            }
        }
        Ok(updated)
    }

    /// Deletes the rows matching `filters` and returns them.
    pub async fn delete(&self, filters: &[FilterArg]) -> Result<Vec<Row>> {
        let stmt = statement::delete(&self.name, &self.columns, filters);
        let deleted = self.run_query("delete", stmt).await?;

        if let Some(cache) = self.cached() {
            if !deleted.is_empty() {
                self.schedule(CacheJob::Evict {
                    rows: deleted.clone(),
                });
            }
            cache.invalidate_all();
        }
        Ok(deleted)
    }
}

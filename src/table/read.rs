//! Read operations.

use serde_json::Value;
use tracing::debug;

use crate::db::Row;
use crate::error::{Result, TableError};
use crate::query::{is_valid_identifier, statement, FilterArg, SortOrder};
use crate::table::Table;

const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_ORDER_BY: &str = "id";

impl Table {
    /// Fetches the first row matching `filters`.
    ///
    /// Served from the cache when the filters resolve to a cached key;
    /// otherwise the row read from the store is cached before returning.
    pub async fn fetch_one(&self, filters: &[FilterArg]) -> Result<Option<Row>> {
        if let Some(row) = self.cached().and_then(|cache| cache.try_get(filters)) {
            return Ok(Some(row));
        }

        let generation = self.cache_generation();
        let stmt = statement::select(&self.name, &self.columns, filters, Some(1));
        let row = self.run_query("fetch one", stmt).await?.into_iter().next();

        if let (Some(cache), Some(row), Some(generation)) = (self.cached(), &row, generation) {
            cache.populate_at(row, generation);
        }
        Ok(row)
    }

    /// Fetches every row matching `filters`. Never served from the cache.
    pub async fn fetch_many(&self, filters: &[FilterArg]) -> Result<Vec<Row>> {
        let generation = self.cache_generation();
        let stmt = statement::select(&self.name, &self.columns, filters, None);
        let rows = self.run_query("fetch many", stmt).await?;
        self.schedule_populate(&rows, generation);
        Ok(rows)
    }

    pub async fn fetch_all(&self) -> Result<Vec<Row>> {
        let generation = self.cache_generation();
        let stmt = statement::select(&self.name, &self.columns, &[], None);
        let rows = self.run_query("fetch all", stmt).await?;
        self.schedule_populate(&rows, generation);
        Ok(rows)
    }

    /// Fetches one page of rows.
    ///
    /// Pages start at 1; `page <= 0` means the first page and `limit <= 0`
    /// means 10 rows. An empty `order_by` sorts by `id`.
    pub async fn get_page(
        &self,
        page: i64,
        limit: i64,
        order_by: &str,
        order: SortOrder,
        filters: &[FilterArg],
    ) -> Result<Vec<Row>> {
        let (limit, offset, order_by) = page_window(page, limit, order_by)?;
        let generation = self.cache_generation();
        let stmt = statement::select_page(
            &self.name,
            &self.columns,
            filters,
            order_by,
            order,
            limit,
            offset,
        );
        let rows = self.run_query("get page", stmt).await?;
        self.schedule_populate(&rows, generation);
        Ok(rows)
    }

    /// Like [`Table::get_page`], plus the number of rows matching `filters`
    /// across all pages.
    pub async fn get_page_with_total(
        &self,
        page: i64,
        limit: i64,
        order_by: &str,
        order: SortOrder,
        filters: &[FilterArg],
    ) -> Result<(Vec<Row>, i64)> {
        let (limit, offset, order_by) = page_window(page, limit, order_by)?;

        let counted = self
            .run_query("count", statement::count(&self.name, &self.columns, filters))
            .await?;
        let total = counted
            .first()
            .and_then(|row| row.get("total"))
            .and_then(Value::as_i64)
            .ok_or(TableError::NoRowsReturned("count"))?;

        let generation = self.cache_generation();
        let stmt = statement::select_page(
            &self.name,
            &self.columns,
            filters,
            order_by,
            order,
            limit,
            offset,
        );
        let rows = self.run_query("get page", stmt).await?;
        self.schedule_populate(&rows, generation);

        debug!(table = %self.name, total, returned = rows.len(), "page fetched");
        Ok((rows, total))
    }
}

/// Normalises paging input to `(limit, offset, order_by)`.
fn page_window(page: i64, limit: i64, order_by: &str) -> Result<(u64, u64, &str)> {
    let page = page.max(1) as u64;
    let limit = (if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit }) as u64;
    let order_by = if order_by.is_empty() {
        DEFAULT_ORDER_BY
    } else {
        order_by
    };
    if !is_valid_identifier(order_by) {
        return Err(TableError::InvalidIdentifier(order_by.to_string()));
    }
    Ok((limit, (page - 1).saturating_mul(limit), order_by))
}

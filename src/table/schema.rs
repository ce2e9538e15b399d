//! Schema operations.

use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::query::statement;
use crate::table::Table;

impl Table {
    /// Creates the table if missing, then brings its columns in line with
    /// the declared ones: missing columns are added, undeclared ones dropped.
    pub async fn create_table(&self) -> Result<()> {
        self.run_execute("create table", statement::create_table(&self.name, &self.columns))
            .await?;
        self.sync_columns().await
    }

    /// Column names currently present in the database, in table order.
    pub async fn columns_from_db(&self) -> Result<Vec<String>> {
        let rows = self
            .run_query("list columns", statement::list_columns(&self.name))
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("column_name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    pub async fn drop_table(&self) -> Result<()> {
        self.run_execute("drop table", statement::drop_table(&self.name))
            .await?;
        if let Some(cache) = self.cached() {
            cache.invalidate_all();
        }
        Ok(())
    }

    async fn sync_columns(&self) -> Result<()> {
        let existing = self.columns_from_db().await?;

        for column in &self.columns {
            if !existing.iter().any(|name| name == &column.name) {
                info!(table = %self.name, column = %column.name, "adding column");
                self.run_execute("add column", statement::add_column(&self.name, column))
                    .await?;
            }
        }

        for name in &existing {
            if !self.columns.iter().any(|c| &c.name == name) {
                info!(table = %self.name, column = %name, "dropping column");
                self.run_execute("drop column", statement::drop_column(&self.name, name))
                    .await?;
            }
        }
        Ok(())
    }
}

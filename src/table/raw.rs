//! Custom SQL.

use serde_json::Value;

use crate::db::Row;
use crate::error::Result;
use crate::query::Statement;
use crate::table::Table;

impl Table {
    /// Runs caller-written SQL with `$1..$n` params. Bypasses the cache in
    /// both directions.
    pub async fn query_raw(&self, sql: impl Into<String>, params: Vec<Value>) -> Result<Vec<Row>> {
        let stmt = Statement {
            sql: sql.into(),
            params,
        };
        self.run_query("custom query", stmt).await
    }
}

//! Data store client.
//!
//! Table operations talk to the database only through [`DataStore`], so the
//! cache orchestration can be exercised without a live server.

mod pg;

use async_trait::async_trait;
use serde_json::Value;

pub use pg::{PgStore, PoolStats};

/// A result row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Executes parameterized SQL. Placeholders are `$1..$n`, bound in order
/// from `params`.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Runs a statement and returns every row it produced.
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>, sqlx::Error>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, sqlx::Error>;
}

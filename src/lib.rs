//! pgcrud - PostgreSQL table access with a read-through row cache
//!
//! Builds parameterized SQL for table CRUD and schema sync, and keeps a
//! per-table TTL/LRU cache consistent with writes.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod query;
pub mod table;
pub mod tasks;

pub use cache::{CacheConfig, CacheStats};
pub use config::Config;
pub use db::{DataStore, PgStore, Row};
pub use error::{CacheError, Result, TableError};
pub use query::{Column, Condition, DataType, FieldMap, FilterArg, SortOrder};
pub use table::Table;
pub use tasks::spawn_health_check;

//! Error types for the table layer
//!
//! Cache-path failures and data-store failures are kept in separate enums:
//! a `CacheError` is always absorbed by the table operation that hit it, a
//! `TableError` is what the caller sees.

use thiserror::Error;

// == Cache Error Enum ==
/// Failures on the caching path. Never returned from a table operation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The table has no cache configured, or it is switched off
    #[error("caching is not enabled for this table")]
    CacheDisabled,

    /// The cache is enabled but no key field was configured
    #[error("cache key field is not defined for this table")]
    KeyFieldUndefined,

    /// None of the arguments supplied a value for the key field
    #[error("cache key field '{0}' not found in arguments")]
    KeyNotFound(String),

    /// Row could not be serialized for storage
    #[error("failed to encode cached row: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Stored bytes could not be turned back into a row
    #[error("failed to decode cached row: {0}")]
    Decoding(#[source] serde_json::Error),
}

// == Table Error Enum ==
/// Errors surfaced by table operations.
#[derive(Error, Debug)]
pub enum TableError {
    /// No connection could be obtained from the pool
    #[error("failed to acquire connection: {0}")]
    Connection(#[source] sqlx::Error),

    /// The data store rejected or failed the statement
    #[error("failed to execute {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A table, column or ordering name is not a plain SQL identifier
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// None of the supplied keys matched a declared column
    #[error("no valid columns provided for {0}")]
    NoValidColumns(&'static str),

    /// The operation was given nothing to work with
    #[error("no data provided to {0}")]
    EmptyData(&'static str),

    /// A statement with RETURNING produced no rows
    #[error("no rows returned by {0}")]
    NoRowsReturned(&'static str),

    /// Caching was enabled outside a tokio runtime
    #[error("cache worker needs a tokio runtime: {0}")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),
}

impl TableError {
    // == Store Error Classification ==
    /// Wraps a data-store error with the name of the operation that failed.
    ///
    /// Pool, transport and configuration failures count as connection errors;
    /// everything else is a query error.
    pub fn from_store(operation: &'static str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => TableError::Connection(source),
            other => TableError::Query {
                operation,
                source: other,
            },
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

//! PostgreSQL store backed by a `sqlx` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::Decimal;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{DataStore, Row};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fractional digits of MONEY values under the usual locales.
const MONEY_SCALE: u32 = 2;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub active: u32,
}

/// Pooled PostgreSQL connection. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    fn pool_options(config: &Config) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections())
            .acquire_timeout(ACQUIRE_TIMEOUT)
    }

    /// Opens the pool and verifies one connection.
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(config)
            .connect(&config.database_url)
            .await?;
        info!(
            "Connected to database (max connections: {}, min: {})",
            config.max_connections,
            config.min_connections()
        );
        Ok(Self { pool })
    }

    /// Builds the pool without connecting; connections open on first use.
    pub fn connect_lazy(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = Self::pool_options(config).connect_lazy(&config.database_url)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips `SELECT 1`.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool_stats(&self) -> PoolStats {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;
        PoolStats {
            size,
            idle,
            active: size.saturating_sub(idle),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>, sqlx::Error> {
        debug!(sql, ?params, "query");
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, sqlx::Error> {
        debug!(sql, ?params, "execute");
        let result = bind_values(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// == Parameter Binding ==
/// Binds each value by its JSON kind. Arrays and objects go over as JSON.
fn bind_values(
    mut query: Query<'_, Postgres, PgArguments>,
    values: Vec<Value>,
) -> Query<'_, Postgres, PgArguments> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => query.bind(i),
                (None, Some(f)) => query.bind(f),
                _ => query.bind(n.to_string()),
            },
            Value::String(s) => query.bind(s),
            Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value)),
        };
    }
    query
}

// == Row Decoding ==
/// Converts a result row into a column map. Values without a decoder become
/// `null` and are logged at debug level.
fn row_to_map(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let idx = column.ordinal();
            let type_name = column.type_info().name();
            let value = match decode_column(row, idx, type_name) {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(e) => {
                    debug!(column = column.name(), type_name, "undecodable column, using null: {}", e);
                    Value::Null
                }
            };
            (column.name().to_string(), value)
        })
        .collect()
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Option<Value>, sqlx::Error> {
    let value = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .map(|v| Value::from(f64::from(v))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
        // Text keeps the full precision
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "MONEY" => row
            .try_get::<Option<PgMoney>, _>(idx)?
            .map(|v| Value::String(v.to_decimal(MONEY_SCALE).to_string())),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIMETZ" => row
            .try_get::<Option<PgTimeTz<chrono::NaiveTime, chrono::FixedOffset>>, _>(idx)?
            .map(|v| Value::String(format!("{}{}", v.time, v.offset))),
        "INTERVAL" => row.try_get::<Option<PgInterval>, _>(idx)?.map(interval_to_json),
        "INET" | "CIDR" => row
            .try_get::<Option<IpNetwork>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|v| Value::String(bytea_to_hex(&v))),
        "INT2[]" => row.try_get::<Option<Vec<Option<i16>>>, _>(idx)?.map(Value::from),
        "INT4[]" => row.try_get::<Option<Vec<Option<i32>>>, _>(idx)?.map(Value::from),
        "INT8[]" => row.try_get::<Option<Vec<Option<i64>>>, _>(idx)?.map(Value::from),
        "FLOAT8[]" => row.try_get::<Option<Vec<Option<f64>>>, _>(idx)?.map(Value::from),
        "BOOL[]" => row.try_get::<Option<Vec<Option<bool>>>, _>(idx)?.map(Value::from),
        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Option<Vec<Option<String>>>, _>(idx)?
            .map(Value::from),
        "UUID[]" => row.try_get::<Option<Vec<Option<uuid::Uuid>>>, _>(idx)?.map(|items| {
            let ids: Vec<Option<String>> = items
                .into_iter()
                .map(|v| v.map(|id| id.to_string()))
                .collect();
            Value::from(ids)
        }),
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::String),
    };
    Ok(value)
}

/// Postgres hex output format, e.g. `\x0aff`.
fn bytea_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

fn interval_to_json(interval: PgInterval) -> Value {
    serde_json::json!({
        "months": interval.months,
        "days": interval.days,
        "microseconds": interval.microseconds,
    })
}

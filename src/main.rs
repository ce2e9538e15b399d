//! pgcrud demo
//!
//! Walks a cached table through a read-through and invalidation cycle
//! against a live PostgreSQL server given by `DATABASE_URL`.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pgcrud::{
    spawn_health_check, Column, Condition, Config, DataType, FieldMap, FilterArg, PgStore, Row,
    SortOrder, Table,
};

const DEMO_TABLE: &str = "pgcrud_demo_users";

/// Demo entry point.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the pool and start the health check
/// 4. Create a cached demo table
/// 5. Insert, read through the cache, update and delete
/// 6. Drop the table and shut down
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgcrud=info,pgcrud_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_connections={}, cache_ttl={}s, cache_max_entries={}",
        config.max_connections, config.cache_ttl, config.cache_max_entries
    );

    let store = PgStore::connect(&config)
        .await
        .context("failed to connect to database")?;
    let health = config
        .reconnect
        .then(|| spawn_health_check(store.clone(), config.health_check_interval));

    let mut users = Table::new(
        DEMO_TABLE,
        vec![
            Column::new("id", DataType::serial().primary_key()),
            Column::new("name", DataType::varchar(100).not_null()),
            Column::new("email", DataType::varchar(255).unique()),
            Column::new("age", DataType::integer().check("age >= 0")),
            Column::new("created_at", DataType::timestamptz().default_value("CURRENT_TIMESTAMP")),
        ],
        Arc::new(store.clone()),
    )?;
    users.enable_cache(config.cache_config("id"))?;

    let outcome = run_scenario(&users).await;

    if let Err(e) = users.drop_table().await {
        warn!("Failed to drop demo table: {}", e);
    }
    if let Some(handle) = health {
        handle.abort();
    }
    store.close().await;

    outcome?;
    info!("Demo complete");
    Ok(())
}

async fn run_scenario(users: &Table) -> Result<()> {
    users.create_table().await?;
    info!("Columns in database: {:?}", users.columns_from_db().await?);

    let alice = users
        .insert(&row(json!({"name": "Alice", "email": "alice@example.com", "age": 25})))
        .await?;
    let alice_id = alice.get("id").cloned().unwrap_or(Value::Null);
    let inserted = Value::Object(alice);
    info!("Inserted {}", inserted);
    users.flush_cache_tasks().await;

    let by_id: Vec<FilterArg> = vec![FieldMap::new().eq("id", alice_id.clone()).into()];

    // Served from the cache populated by the insert
    let first = users.fetch_one(&by_id).await?;
    let second = users.fetch_one(&by_id).await?;
    info!("Fetched twice, identical: {}", first == second);
    report_stats(users);

    users
        .insert_many(&[
            row(json!({"name": "Bob", "email": "bob@example.com", "age": 31})),
            row(json!({"name": "Carol", "email": "carol@example.com", "age": 42})),
        ])
        .await?;

    let adults: Vec<FilterArg> = vec![FieldMap::new()
        .cond("age", Condition::between(Some(18), Some(40)))
        .into()];
    let many = users.fetch_many(&adults).await?;
    info!("Rows aged 18-40: {}", many.len());

    let (page, total) = users
        .get_page_with_total(1, 2, "age", SortOrder::Desc, &[])
        .await?;
    info!("Page 1 holds {} of {} rows", page.len(), total);

    users
        .update(&row(json!({"age": 26})), &by_id)
        .await?;
    users.flush_cache_tasks().await;

    let pair_lookup = [FilterArg::pair("id", alice_id)];
    let updated = users
        .fetch_one(&pair_lookup)
        .await?
        .map(Value::Object)
        .unwrap_or_default();
    info!("After update: {}", updated);

    let removed = users
        .delete(&[FilterArg::raw("age > $1", vec![json!(40)])])
        .await?;
    info!("Deleted {} rows", removed.len());

    let counted = users
        .query_raw(
            format!("SELECT COUNT(*) AS remaining FROM \"{}\"", DEMO_TABLE),
            Vec::new(),
        )
        .await?;
    info!("Remaining: {:?}", counted.first().and_then(|r| r.get("remaining")));

    report_stats(users);
    Ok(())
}

fn report_stats(users: &Table) {
    if let Some(stats) = users.cache_stats() {
        info!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            entries = stats.total_entries,
            "Cache hit rate {:.0}%",
            stats.hit_rate() * 100.0
        );
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

//! Connection Health Check Task
//!
//! Background task that periodically pings the database and reports pool
//! occupancy. It never touches table caches.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::PgStore;

/// Spawns a task that pings `store` every `interval_secs` seconds.
///
/// Failures are logged and the loop keeps going; the pool reopens
/// connections on its own once the server is reachable again. Abort the
/// returned handle to stop the task.
///
/// # Example
/// ```ignore
/// let store = PgStore::connect(&config).await?;
/// let health = spawn_health_check(store.clone(), config.health_check_interval);
/// // Later, during shutdown:
/// health.abort();
/// ```
pub fn spawn_health_check(store: PgStore, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting connection health check with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match store.ping().await {
                Ok(()) => {
                    let stats = store.pool_stats();
                    debug!(
                        size = stats.size,
                        idle = stats.idle,
                        active = stats.active,
                        "Health check: database reachable"
                    );
                }
                Err(e) => {
                    let stats = store.pool_stats();
                    warn!(
                        size = stats.size,
                        idle = stats.idle,
                        "Health check failed: {}",
                        e
                    );
                }
            }
        }
    })
}

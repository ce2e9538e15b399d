//! Cache Population Worker
//!
//! Background task that applies cache populates and evictions handed off by
//! table operations, so callers never wait on cache bookkeeping.

use std::sync::Arc;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::TableCache;
use crate::db::Row;

/// Work queued for a table's cache.
#[derive(Debug)]
pub enum CacheJob {
    /// Store rows read at `generation`
    Populate { rows: Vec<Row>, generation: u64 },
    /// Remove the entries keyed by these rows
    Evict { rows: Vec<Row> },
    /// Signals once every job queued before it has been applied
    Flush(oneshot::Sender<()>),
}

/// Handle to one table's cache worker.
///
/// Jobs are applied in submission order. Submission never blocks: when the
/// queue is full the job is dropped. Dropping the handle stops the worker.
#[derive(Debug)]
pub struct CacheWorker {
    sender: mpsc::Sender<CacheJob>,
    handle: JoinHandle<()>,
}

impl CacheWorker {
    /// Spawns the worker on the current tokio runtime. Fails when called
    /// outside one.
    pub fn spawn(cache: Arc<TableCache>, capacity: usize) -> Result<Self, TryCurrentError> {
        let runtime = Handle::try_current()?;
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));

        let handle = runtime.spawn(async move {
            while let Some(job) = receiver.recv().await {
                apply(&cache, job);
            }
            debug!("cache worker stopped");
        });

        Ok(Self { sender, handle })
    }

    /// Queues `job`. Returns false if it was dropped.
    pub fn submit(&self, job: CacheJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                debug!("dropping cache job: {}", e);
                false
            }
        }
    }

    /// Waits until every job submitted so far has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(CacheJob::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

impl Drop for CacheWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn apply(cache: &TableCache, job: CacheJob) {
    match job {
        CacheJob::Populate { rows, generation } => {
            let stored = rows
                .iter()
                .filter(|row| cache.populate_at(row, generation))
                .count();
            debug!(stored, total = rows.len(), "applied cache populate");
        }
        CacheJob::Evict { rows } => {
            for row in &rows {
                cache.invalidate_row(row);
            }
        }
        CacheJob::Flush(done) => {
            let _ = done.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::query::FilterArg;
    use serde_json::json;
    use std::time::Duration;

    fn row(id: i64) -> Row {
        match json!({"id": id}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn table_cache() -> Arc<TableCache> {
        Arc::new(TableCache::new(
            "users",
            CacheConfig::new("id", Duration::from_secs(60)),
        ))
    }

    #[tokio::test]
    async fn test_populate_visible_after_flush() {
        let cache = table_cache();
        let worker = CacheWorker::spawn(cache.clone(), 8).unwrap();

        assert!(worker.submit(CacheJob::Populate {
            rows: vec![row(1), row(2)],
            generation: cache.generation(),
        }));
        worker.flush().await;

        assert_eq!(cache.store().len(), 2);
        assert!(cache.try_get(&[FilterArg::pair("id", 2)]).is_some());
    }

    #[tokio::test]
    async fn test_evict_job() {
        let cache = table_cache();
        cache.populate(&row(1));
        let worker = CacheWorker::spawn(cache.clone(), 8).unwrap();

        worker.submit(CacheJob::Evict { rows: vec![row(1)] });
        worker.flush().await;

        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_stale_populate_is_dropped() {
        let cache = table_cache();
        let worker = CacheWorker::spawn(cache.clone(), 8).unwrap();
        let generation = cache.generation();
        cache.invalidate_all();

        worker.submit(CacheJob::Populate {
            rows: vec![row(1)],
            generation,
        });
        worker.flush().await;

        assert!(cache.store().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_jobs() {
        let cache = table_cache();
        let worker = CacheWorker::spawn(cache.clone(), 1).unwrap();
        let generation = cache.generation();

        // The worker cannot run until this task yields
        assert!(worker.submit(CacheJob::Populate { rows: vec![row(1)], generation }));
        assert!(!worker.submit(CacheJob::Populate { rows: vec![row(2)], generation }));

        worker.flush().await;
        assert_eq!(cache.store().keys(), vec!["1".to_string()]);
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        assert!(CacheWorker::spawn(table_cache(), 8).is_err());
    }

    #[tokio::test]
    async fn test_drop_stops_worker() {
        let cache = table_cache();
        let worker = CacheWorker::spawn(cache.clone(), 8).unwrap();
        drop(worker);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&cache), 1);
    }
}

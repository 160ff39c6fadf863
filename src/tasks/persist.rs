//! Persist Task
//!
//! Background task that periodically writes the cache to its backing file.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::NamespacedCache;

/// Spawns a background task that periodically persists the cache.
///
/// The task sleeps for the interval, then runs [`NamespacedCache::persist`]
/// on the blocking pool so file I/O never stalls the runtime. A failed pass
/// is logged and retried on the next tick.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `persist_interval_secs` - Interval in seconds between passes (minimum 1)
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(NamespacedCache::open("data/cache_data.txt")?);
/// let persist_handle = spawn_persist_task(cache.clone(), 30);
/// // Later, during shutdown:
/// persist_handle.abort();
/// let _ = persist_handle.await;
/// cache.persist()?;
/// ```
pub fn spawn_persist_task<V>(
    cache: Arc<NamespacedCache<V>>,
    persist_interval_secs: u64,
) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    let interval = Duration::from_secs(persist_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache persist task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let snapshot_cache = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || snapshot_cache.persist()).await {
                Ok(Ok(written)) => debug!("Cache persist: wrote {} records", written),
                Ok(Err(err)) => warn!(error = %err, "Cache persist failed, retrying next tick"),
                Err(err) => warn!(error = %err, "Cache persist task panicked"),
            }
        }
    })
}

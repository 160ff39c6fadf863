//! Cache demo - a sample client of the namespaced TTL cache
//!
//! Loads the cache from `CACHE_FILE`, fills two namespaces, lets some entries
//! expire, then persists the result back to disk.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_namespace_cache::{spawn_persist_task, Config, NamespacedCache, Ttl};

/// Short enough to watch expire, long enough to read before it does.
const SHORT_TTL: Ttl = Ttl::Seconds(2);
const PAUSE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_namespace_cache=info,cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_file={}, create_if_missing={}, persist_interval={}s",
        config.cache_file.display(),
        config.create_if_missing,
        config.persist_interval
    );

    if let Some(parent) = config.cache_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    // A cache that cannot load is unusable; stop here.
    let cache: Arc<NamespacedCache<Value>> = Arc::new(
        NamespacedCache::from_config(&config).context("failed to load cache file")?,
    );

    let persist_handle = (config.persist_interval > 0)
        .then(|| spawn_persist_task(cache.clone(), config.persist_interval));

    cache.add_namespace("icp");
    cache.add_key("icp", "baidu.com", json!("山东"), SHORT_TTL)?;
    cache.add_key("icp", "163.com", json!({"icp": "东beu"}), Ttl::Never)?;
    cache.add_key("icp", "google.com", json!("beijing"), Ttl::Never)?;
    cache.add_namespace("ip_location");
    cache.add_key("ip_location", "baidu.com", json!("山东"), Ttl::Seconds(100))?;
    cache.add_key("ip_location", "163.com", json!("东beu"), Ttl::Never)?;
    cache.add_key("ip_location", "google.com", json!("beijing"), Ttl::Never)?;

    tokio::time::sleep(PAUSE).await;

    let baidu_icp = cache.get("icp", "baidu.com");
    let baidu_location = cache.get("ip_location", "baidu.com");
    info!("icp baidu.com: {:?}", baidu_icp);
    info!("ip_location baidu.com: {:?}", baidu_location);
    ensure!(baidu_icp.is_none(), "icp baidu.com should have expired");
    ensure!(baidu_location == Some(json!("山东")), "ip_location baidu.com should be live");

    cache.set("icp", "baidu.com", json!("广东"), Ttl::Never)?;
    cache.set("icp", "163.com", json!("xxxxzzzz"), Ttl::Seconds(100))?;
    cache.set("ip_location", "google.com", json!("ggggggggg"), SHORT_TTL)?;

    tokio::time::sleep(PAUSE).await;

    let baidu_icp = cache.get("icp", "baidu.com");
    let icp_163 = cache.get("icp", "163.com");
    let google_location = cache.get("ip_location", "google.com");
    info!("after set icp baidu.com: {:?}", baidu_icp);
    info!("after set icp 163.com: {:?}", icp_163);
    info!("after set ip_location google.com: {:?}", google_location);
    ensure!(baidu_icp == Some(json!("广东")), "icp baidu.com should hold the new value");
    ensure!(icp_163 == Some(json!("xxxxzzzz")), "icp 163.com should hold the new value");
    ensure!(google_location.is_none(), "ip_location google.com should have expired");

    if let Some(handle) = persist_handle {
        handle.abort();
        // A pass already on the blocking pool still finishes; the final
        // persist below queues behind it on the cache's persist lock.
        let _ = handle.await;
    }

    let written = cache.persist().context("failed to persist cache")?;
    let stats = cache.stats();
    info!(
        "Persisted {} records: hits={}, misses={}, expired={}, hit_rate={:.2}",
        written,
        stats.hits,
        stats.misses,
        stats.expired,
        stats.hit_rate()
    );

    Ok(())
}

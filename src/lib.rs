//! TTL Namespace Cache - an embedded, process-local cache
//!
//! Stores values in named namespaces with per-entry TTL expiry, one lock per
//! namespace, and a flat-file snapshot for persistence across restarts.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod tasks;

pub use cache::{CacheBuilder, CacheStats, NamespacedCache, Ttl};
pub use config::Config;
pub use error::{CacheError, Result};
pub use logging::{CacheLogger, TracingLogger};
pub use tasks::spawn_persist_task;

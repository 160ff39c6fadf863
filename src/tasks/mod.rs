//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the host.
//!
//! # Tasks
//! - Persist: Snapshots the cache to its backing file at configured intervals

mod persist;

pub use persist::spawn_persist_task;

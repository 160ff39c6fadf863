//! Cache Module
//!
//! Provides namespaced in-memory caching with TTL expiration and flat-file
//! persistence.

mod clock;
pub mod codec;
mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CodecError, DELIMITER};
pub use entry::{CacheEntry, Ttl};
pub use stats::CacheStats;
pub use store::{CacheBuilder, NamespacedCache};

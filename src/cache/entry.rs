//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use serde::{Deserialize, Serialize};

// == TTL ==
/// Lifetime of an entry, counted from its last write.
///
/// On the wire this is a signed number of seconds where `-1` means the entry
/// never expires. Any negative value is read as [`Ttl::Never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Ttl {
    #[default]
    Never,
    Seconds(u64),
}

impl Ttl {
    /// Builds a TTL from signed seconds, negative meaning "never".
    pub fn from_secs(secs: i64) -> Self {
        Ttl::from(secs)
    }

    /// Returns the signed wire form (`-1` for [`Ttl::Never`]).
    pub fn as_secs(self) -> i64 {
        i64::from(self)
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        if secs < 0 {
            Ttl::Never
        } else {
            Ttl::Seconds(secs as u64)
        }
    }
}

impl From<Ttl> for i64 {
    fn from(ttl: Ttl) -> Self {
        match ttl {
            Ttl::Never => -1,
            Ttl::Seconds(secs) => i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }
}

// == Cache Entry ==
/// A stored value together with its write time and TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Time of the most recent write (Unix milliseconds)
    pub written_at: i64,
    /// Lifetime measured from `written_at`
    pub ttl: Ttl,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped with `now_ms`.
    pub fn new(value: V, ttl: Ttl, now_ms: i64) -> Self {
        Self {
            value,
            written_at: now_ms,
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now_ms`.
    ///
    /// Expiry is strict: an entry read exactly `ttl` seconds after its write
    /// is still live. A clock that moved backwards counts as zero elapsed.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.ttl {
            Ttl::Never => false,
            Ttl::Seconds(secs) => {
                let elapsed_ms = now_ms.saturating_sub(self.written_at).max(0) as u64;
                elapsed_ms > secs.saturating_mul(1000)
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_from_signed_seconds() {
        assert_eq!(Ttl::from_secs(-1), Ttl::Never);
        assert_eq!(Ttl::from_secs(-30), Ttl::Never);
        assert_eq!(Ttl::from_secs(0), Ttl::Seconds(0));
        assert_eq!(Ttl::from_secs(5), Ttl::Seconds(5));
        assert_eq!(Ttl::Never.as_secs(), -1);
        assert_eq!(Ttl::Seconds(5).as_secs(), 5);
    }

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CacheEntry::new("value", Ttl::Never, 0);
        assert!(!entry.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("value", Ttl::Seconds(5), 10_000);

        // Exactly at the boundary is still a hit
        assert!(!entry.is_expired_at(15_000));
        // One millisecond past it is a miss
        assert!(entry.is_expired_at(15_001));
    }

    #[test]
    fn test_zero_ttl() {
        let entry = CacheEntry::new("value", Ttl::Seconds(0), 1_000);
        assert!(!entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_clock_going_backwards() {
        let entry = CacheEntry::new("value", Ttl::Seconds(1), 5_000);
        assert!(!entry.is_expired_at(0));
    }

    #[test]
    fn test_ttl_serializes_as_signed_seconds() {
        let entry = CacheEntry::new("v".to_string(), Ttl::Never, 42);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"value":"v","written_at":42,"ttl":-1}"#);

        let back: CacheEntry<String> =
            serde_json::from_str(r#"{"value":"v","written_at":42,"ttl":30}"#).unwrap();
        assert_eq!(back.ttl, Ttl::Seconds(30));
    }
}

//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CodecError;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Lookup and write failures (`NamespaceNotFound`, `KeyNotFound`, `Expired`)
/// are ordinary outcomes. `Load` and `Io` raised while opening the cache are
/// fatal for construction; raised from `persist` they only fail that pass.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Namespace was never created
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Key is absent from an existing namespace
    #[error("Key not found: {namespace}/{key}")]
    KeyNotFound { namespace: String, key: String },

    /// Key exists but its TTL has elapsed
    #[error("Key expired: {namespace}/{key}")]
    Expired { namespace: String, key: String },

    /// A record in the backing file could not be parsed
    #[error("Malformed record in {} at line {line}: {source}", path.display())]
    Load {
        path: PathBuf,
        line: usize,
        #[source]
        source: CodecError,
    },

    /// An entry could not be written in the persisted format
    #[error("Cannot encode {namespace}/{key}: {source}")]
    Encode {
        namespace: String,
        key: String,
        #[source]
        source: CodecError,
    },

    /// Reading or writing the backing file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Returns true for the outcomes a plain lookup maps to a miss.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            CacheError::NamespaceNotFound(_)
                | CacheError::KeyNotFound { .. }
                | CacheError::Expired { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_classification() {
        assert!(CacheError::NamespaceNotFound("icp".into()).is_miss());
        assert!(CacheError::Expired {
            namespace: "icp".into(),
            key: "baidu.com".into()
        }
        .is_miss());

        let io_err = CacheError::io("cache.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(!io_err.is_miss());
    }

    #[test]
    fn test_load_error_mentions_line() {
        let err = CacheError::Load {
            path: PathBuf::from("data/cache.txt"),
            line: 7,
            source: CodecError::FieldCount { found: 2 },
        };
        let message = err.to_string();
        assert!(message.contains("data/cache.txt"));
        assert!(message.contains("line 7"));
    }
}

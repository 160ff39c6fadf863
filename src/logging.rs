//! Logging Module
//!
//! The cache reports through [`CacheLogger`] so hosts can route messages to
//! whatever sink they use. [`TracingLogger`] is the default and forwards to
//! `tracing`.

use std::error::Error;

use tracing::{error, info, warn};

/// Optional structured detail attached to a log message.
pub type ErrorDetail<'a> = Option<&'a (dyn Error + 'static)>;

/// Leveled message sink used by the cache.
pub trait CacheLogger: Send + Sync {
    fn info(&self, message: &str, detail: ErrorDetail<'_>);
    fn warn(&self, message: &str, detail: ErrorDetail<'_>);
    fn error(&self, message: &str, detail: ErrorDetail<'_>);
}

// == Tracing Logger ==
/// Forwards cache messages to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn info(&self, message: &str, detail: ErrorDetail<'_>) {
        match detail {
            Some(err) => info!(error = %err, "{}", message),
            None => info!("{}", message),
        }
    }

    fn warn(&self, message: &str, detail: ErrorDetail<'_>) {
        match detail {
            Some(err) => warn!(error = %err, "{}", message),
            None => warn!("{}", message),
        }
    }

    fn error(&self, message: &str, detail: ErrorDetail<'_>) {
        match detail {
            Some(err) => error!(error = %err, "{}", message),
            None => error!("{}", message),
        }
    }
}

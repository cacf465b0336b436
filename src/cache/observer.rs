//! Cache Observer Module
//!
//! Event hooks fired by the cache store.

use std::fmt;

use tracing::{debug, warn};

use crate::error::CacheError;

/// Operation during which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    Get,
    Set,
    Import,
    Export,
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Import => "import",
            Self::Export => "export",
        };
        f.write_str(name)
    }
}

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Explicit `delete`, `delete_prefix` or a failed read
    Deleted,
    /// TTL elapsed, caught by the reaper or a read
    Expired,
    /// Removed to make room for a new key
    Evicted,
}

// == Cache Observer ==
/// Receives cache events. Every method defaults to a no-op.
///
/// Observers are called synchronously from inside store operations and must
/// not block.
pub trait CacheObserver: Send + Sync {
    fn on_hit(&self, _key: &str) {}

    fn on_miss(&self, _key: &str) {}

    fn on_set(&self, _key: &str, _size: usize) {}

    fn on_remove(&self, _key: &str, _cause: RemovalCause) {}

    /// Non-fatal error; the operation continued with a fallback.
    fn on_error(&self, _error: &CacheError, _operation: CacheOperation, _key: Option<&str>) {}
}

// == Tracing Observer ==
/// Default observer that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_hit(&self, key: &str) {
        debug!(key, "cache hit");
    }

    fn on_miss(&self, key: &str) {
        debug!(key, "cache miss");
    }

    fn on_set(&self, key: &str, size: usize) {
        debug!(key, size, "cache set");
    }

    fn on_remove(&self, key: &str, cause: RemovalCause) {
        match cause {
            RemovalCause::Deleted => debug!(key, "cache delete"),
            RemovalCause::Expired => debug!(key, "cache entry expired"),
            RemovalCause::Evicted => debug!(key, "cache entry evicted"),
        }
    }

    fn on_error(&self, error: &CacheError, operation: CacheOperation, key: Option<&str>) {
        warn!(%error, %operation, key = key.unwrap_or("-"), "cache operation degraded");
    }
}

//! Cache Module
//!
//! In-memory key/value store with TTL expiration, pluggable eviction
//! (LRU, LFU, FIFO, TTL), optional compression and statistics.

pub mod compression;
mod entry;
mod eviction;
mod observer;
mod order;
mod snapshot;
mod stats;
mod store;


use std::sync::Arc;
use tokio::sync::RwLock;

// Re-export public types
pub use crate::config::CacheConfig;
pub use entry::{current_timestamp_ms, CacheEntry, Payload};
pub use eviction::{EvictionPolicy, EvictionView};
pub use observer::{CacheObserver, CacheOperation, RemovalCause, TracingObserver};
pub use order::KeyOrder;
pub use snapshot::{CacheSnapshot, ExportedEntry};
pub use stats::{CacheStats, StatsCollector};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Cache store shared between handlers, the loader and the reaper.
pub type SharedCache = Arc<RwLock<CacheStore>>;

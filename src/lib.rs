//! Resilient Cache - an in-memory cache with a resilient remote-call layer
//!
//! Provides a TTL cache with pluggable eviction (LRU, LFU, FIFO, TTL), an
//! HTTP executor that retries transient upstream failures with exponential
//! backoff, and a read-through loader that ties the two together.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheStats, CacheStore, EvictionPolicy, SharedCache};
pub use config::{CacheConfig, Config, RetryConfig, UpstreamConfig};
pub use error::{ApiError, CacheError, ErrorKind};
pub use executor::{ApiRequest, ApiResponse, RequestExecutor};
pub use loader::CacheLoader;
pub use tasks::{spawn_reaper, ReaperHandle};

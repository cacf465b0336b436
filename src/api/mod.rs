//! API Module
//!
//! HTTP handlers and routing for the caching gateway.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `GET /keys` - Live keys
//! - `GET|PUT|DELETE /cache/:key` - Read, store or delete one entry
//! - `DELETE /cache` - Clear the cache
//! - `GET /export`, `POST /import` - Snapshot the cache or restore a snapshot
//! - `GET /api/*path` - Cached read-through proxy to the upstream API
//! - `POST|PUT|DELETE /api/*path` - Uncached passthrough with invalidation

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

//! Request and Response models for the gateway API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.
//! Cache statistics and snapshots are served in their own wire format from
//! the `cache` module.

pub mod requests;
pub mod responses;

pub use requests::SetRequest;
pub use responses::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, ImportResponse, KeysResponse,
    SetResponse,
};

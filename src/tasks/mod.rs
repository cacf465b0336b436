//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Reaper: Removes expired cache entries at the configured interval

mod reaper;

pub use reaper::{spawn_reaper, ReaperHandle};

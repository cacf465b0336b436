//! Snapshot Module
//!
//! Export format of a cache store: `key -> {value, expiresAt}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exported entry. `expires_at` is absolute (Unix epoch milliseconds), so
/// TTLs keep counting down across an export/import round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub value: Value,
    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
}

/// Flat map of exported entries, ordered by key.
pub type CacheSnapshot = BTreeMap<String, ExportedEntry>;

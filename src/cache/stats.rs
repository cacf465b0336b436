//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and expirations.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::CacheEntry;

// == Stats Collector ==
/// Cumulative counters owned by a cache store.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    total_size: usize,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    // == Size Accounting ==
    pub fn add_size(&mut self, size: usize) {
        self.total_size = self.total_size.saturating_add(size);
    }

    pub fn remove_size(&mut self, size: usize) {
        self.total_size = self.total_size.saturating_sub(size);
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    // == Hit Rate ==
    /// Hit rate as a percentage: `hits / (hits + misses) * 100`.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Snapshot ==
    /// Builds a report, scanning `entries` for the oldest and most accessed keys.
    pub fn snapshot(&self, entries: &HashMap<String, CacheEntry>) -> CacheStats {
        let oldest_entry = entries
            .iter()
            .min_by_key(|(_, entry)| entry.created_at)
            .map(|(key, _)| key.clone());
        let most_accessed = entries
            .iter()
            .max_by_key(|(_, entry)| entry.access_count)
            .map(|(key, _)| key.clone());

        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            total_size: self.total_size,
            entry_count: entries.len(),
            hit_rate: self.hit_rate(),
            oldest_entry,
            most_accessed,
        }
    }
}

// == Cache Stats ==
/// Point-in-time statistics report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries removed to make room
    pub evictions: u64,
    /// Number of entries removed after their TTL elapsed
    pub expirations: u64,
    /// Sum of the size estimates of live entries, in bytes
    pub total_size: usize,
    /// Current number of entries in the cache
    pub entry_count: usize,
    /// Percentage of lookups that were hits
    pub hit_rate: f64,
    pub oldest_entry: Option<String>,
    pub most_accessed: Option<String>,
}

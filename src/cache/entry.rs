//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Payload ==
/// Stored form of a cached value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Value kept as-is
    Plain(Value),
    /// zlib-compressed JSON encoding of the value
    Compressed(Vec<u8>),
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub payload: Payload,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), always greater than `created_at`
    pub expires_at: u64,
    /// Last read timestamp (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of reads since the entry was last written
    pub access_count: u64,
    /// Estimated size in bytes of the stored payload
    pub size: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_seconds` from now.
    pub fn new(payload: Payload, size: usize, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();
        Self::with_expiry(payload, size, now, now + ttl_seconds * 1000)
    }

    /// Creates an entry with an absolute expiry, used when restoring snapshots.
    pub fn with_expiry(payload: Payload, size: usize, now: u64, expires_at: u64) -> Self {
        Self {
            payload,
            created_at: now,
            expires_at,
            last_accessed: now,
            access_count: 0,
            size,
        }
    }

    // == Replace ==
    /// Overwrites the payload in place, resetting the access counter.
    ///
    /// `created_at` is kept.
    pub fn replace(&mut self, payload: Payload, size: usize, now: u64, expires_at: u64) {
        self.payload = payload;
        self.size = size;
        self.expires_at = expires_at;
        self.last_accessed = now;
        self.access_count = 0;
    }

    // == Record Access ==
    /// Updates access metadata on a read.
    pub fn record_access(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.payload, Payload::Compressed(_))
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }

    /// Returns remaining TTL in whole seconds, rounded up.
    ///
    /// An entry with 400ms left reports 1 second, so a live entry never reports 0.
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms().div_ceil(1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

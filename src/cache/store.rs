//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with access/insertion ordering,
//! policy-driven eviction and TTL expiration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::compression::{self, Encoded};
use crate::cache::{
    current_timestamp_ms, CacheConfig, CacheEntry, CacheObserver, CacheOperation, CacheSnapshot,
    CacheStats, EvictionView, ExportedEntry, KeyOrder, RemovalCause, StatsCollector,
    TracingObserver, MAX_KEY_LENGTH,
};
use crate::config::MAX_TTL;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// In-memory key/value store with TTL expiry and configurable eviction.
///
/// Every read path checks expiry itself, so the periodic reaper only
/// reclaims memory earlier.
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Keys by last access, least recent first
    access_order: KeyOrder,
    /// Keys by first insertion
    insertion_order: KeyOrder,
    stats: StatsCollector,
    config: CacheConfig,
    observer: Arc<dyn CacheObserver>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore after validating the configuration.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            access_order: KeyOrder::new(),
            insertion_order: KeyOrder::new(),
            stats: StatsCollector::new(),
            config,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replaces the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Get ==
    /// Retrieves a value by key, counting a hit or a miss.
    ///
    /// Expired entries are removed on the spot and count as a miss.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = current_timestamp_ms();
        if !self.live(key, now) {
            self.stats.record_miss();
            self.observer.on_miss(key);
            return None;
        }

        let decoded = match self.entries.get_mut(key) {
            Some(entry) => {
                entry.record_access(now);
                compression::decode(&entry.payload)
            }
            None => return None,
        };
        self.access_order.touch(key);

        match decoded {
            Ok(value) => {
                self.stats.record_hit();
                self.observer.on_hit(key);
                Some(value)
            }
            Err(e) => {
                self.observer.on_error(&e, CacheOperation::Get, Some(key));
                self.remove_entry(key, RemovalCause::Deleted);
                self.stats.record_miss();
                self.observer.on_miss(key);
                None
            }
        }
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry for the key.
    ///
    /// Uses `default_ttl` when `ttl` is None. Inserting a new key into a full
    /// store evicts one entry first, chosen by the configured policy.
    pub fn set(&mut self, key: String, value: Value, ttl: Option<u64>) -> Result<()> {
        validate_key(&key)?;
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        if !(1..=MAX_TTL).contains(&ttl) {
            return Err(CacheError::InvalidRequest(format!(
                "TTL must be between 1 and {} seconds",
                MAX_TTL
            )));
        }

        let encoded = self.encode(value, CacheOperation::Set, &key);
        let now = current_timestamp_ms();
        self.insert_entry(key, encoded, now, now + ttl * 1000)
    }

    // == Delete ==
    /// Removes an entry by key. Returns false if the key was absent.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key, RemovalCause::Deleted).is_some()
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn delete_prefix(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            self.remove_entry(key, RemovalCause::Deleted);
        }
        matching.len()
    }

    // == Has ==
    /// Returns true if the key holds a live entry. Counts as an access.
    pub fn has(&mut self, key: &str) -> bool {
        let now = current_timestamp_ms();
        if !self.live(key, now) {
            return false;
        }
        if let Some(entry) = self.entries.get_mut(key) {
            entry.record_access(now);
        }
        self.access_order.touch(key);
        true
    }

    // == TTL ==
    /// Remaining lifetime of a key in seconds, or -1 if absent or expired.
    pub fn ttl(&mut self, key: &str) -> i64 {
        if !self.live(key, current_timestamp_ms()) {
            return -1;
        }
        self.entries
            .get(key)
            .map(|entry| entry.ttl_remaining() as i64)
            .unwrap_or(-1)
    }

    // == Keys / Values / Size ==
    /// Live keys in insertion order.
    pub fn keys(&mut self) -> Vec<String> {
        self.cleanup_expired();
        self.insertion_order.iter().map(str::to_string).collect()
    }

    /// Live values in insertion order. Does not count as access.
    pub fn values(&mut self) -> Vec<Value> {
        self.cleanup_expired();
        let keys: Vec<String> = self.insertion_order.iter().map(str::to_string).collect();

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let decoded = match self.entries.get(&key) {
                Some(entry) => compression::decode(&entry.payload),
                None => continue,
            };
            match decoded {
                Ok(value) => values.push(value),
                Err(e) => {
                    self.observer.on_error(&e, CacheOperation::Get, Some(&key));
                    self.remove_entry(&key, RemovalCause::Deleted);
                }
            }
        }
        values
    }

    /// Number of live entries.
    pub fn size(&mut self) -> usize {
        self.cleanup_expired();
        self.entries.len()
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Clear ==
    /// Drops every entry and resets counters and orderings.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
        self.insertion_order.clear();
        self.stats.reset();
    }

    // == Stats ==
    /// Statistics over live entries. Sweeps expired entries first, like
    /// `keys()` and `size()`.
    pub fn stats(&mut self) -> CacheStats {
        self.cleanup_expired();
        self.stats.snapshot(&self.entries)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key, RemovalCause::Expired);
        }
        expired_keys.len()
    }

    // == Export / Import ==
    /// Serializes every non-expired entry with its absolute expiry.
    pub fn export(&self) -> CacheSnapshot {
        let now = current_timestamp_ms();
        let mut snapshot = CacheSnapshot::new();

        for (key, entry) in &self.entries {
            if entry.is_expired_at(now) {
                continue;
            }
            match compression::decode(&entry.payload) {
                Ok(value) => {
                    snapshot.insert(
                        key.clone(),
                        ExportedEntry {
                            value,
                            expires_at: entry.expires_at,
                        },
                    );
                }
                Err(e) => self.observer.on_error(&e, CacheOperation::Export, Some(key)),
            }
        }
        snapshot
    }

    /// Restores entries from a snapshot, skipping those already expired.
    ///
    /// Restored entries keep their original expiry. Returns the number restored.
    pub fn import(&mut self, snapshot: CacheSnapshot) -> usize {
        let mut restored = 0;

        for (key, exported) in snapshot {
            let now = current_timestamp_ms();
            if exported.expires_at <= now {
                continue;
            }
            if exported.expires_at > now.saturating_add(MAX_TTL * 1000) {
                let e = CacheError::InvalidRequest(format!(
                    "expiry of '{}' is more than {} seconds away",
                    key, MAX_TTL
                ));
                self.observer.on_error(&e, CacheOperation::Import, Some(&key));
                continue;
            }
            if let Err(e) = validate_key(&key) {
                self.observer.on_error(&e, CacheOperation::Import, Some(&key));
                continue;
            }

            let encoded = self.encode(exported.value, CacheOperation::Import, &key);
            match self.insert_entry(key.clone(), encoded, now, exported.expires_at) {
                Ok(()) => restored += 1,
                Err(e) => self.observer.on_error(&e, CacheOperation::Import, Some(&key)),
            }
        }
        restored
    }

    // == Internals ==

    /// True if the key exists and has not expired. An expired entry is removed.
    fn live(&mut self, key: &str, now: u64) -> bool {
        match self.entries.get(key) {
            None => false,
            Some(entry) if entry.is_expired_at(now) => {
                self.remove_entry(key, RemovalCause::Expired);
                false
            }
            Some(_) => true,
        }
    }

    fn encode(&self, value: Value, operation: CacheOperation, key: &str) -> Encoded {
        let (encoded, error) = compression::encode(
            value,
            self.config.enable_compression,
            self.config.compression_threshold,
        );
        if let Some(e) = error {
            self.observer.on_error(&e, operation, Some(key));
        }
        encoded
    }

    fn insert_entry(
        &mut self,
        key: String,
        encoded: Encoded,
        now: u64,
        expires_at: u64,
    ) -> Result<()> {
        let size = encoded.size;

        if let Some(entry) = self.entries.get_mut(&key) {
            let old_size = entry.size;
            entry.replace(encoded.payload, size, now, expires_at);
            self.stats.remove_size(old_size);
        } else {
            if self.entries.len() >= self.config.max_size {
                let needed = self.entries.len() + 1 - self.config.max_size;
                self.evict(needed)?;
            }
            self.entries.insert(
                key.clone(),
                CacheEntry::with_expiry(encoded.payload, size, now, expires_at),
            );
            self.insertion_order.insert(&key);
        }

        self.access_order.touch(&key);
        self.stats.add_size(size);
        self.observer.on_set(&key, size);
        Ok(())
    }

    fn evict(&mut self, count: usize) -> Result<()> {
        let victims = {
            let view = EvictionView {
                entries: &self.entries,
                access_order: &self.access_order,
                insertion_order: &self.insertion_order,
            };
            self.config
                .eviction_policy
                .select_for_eviction(&view, count)
        };

        if victims.len() < count {
            return Err(CacheError::Internal(format!(
                "eviction policy {} selected {} of {} entries",
                self.config.eviction_policy,
                victims.len(),
                count
            )));
        }

        for key in &victims {
            self.remove_entry(key, RemovalCause::Evicted);
        }
        Ok(())
    }

    /// Single deletion path: entries, both orderings, size and counters.
    fn remove_entry(&mut self, key: &str, cause: RemovalCause) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.access_order.remove(key);
        self.insertion_order.remove(key);
        self.stats.remove_size(entry.size);

        match cause {
            RemovalCause::Expired => self.stats.record_expiration(),
            RemovalCause::Evicted => self.stats.record_eviction(),
            RemovalCause::Deleted => {}
        }
        self.observer.on_remove(key, cause);
        Some(entry)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

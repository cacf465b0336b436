//! Eviction Module
//!
//! Policy-driven victim selection for a full cache.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, KeyOrder};
use crate::error::CacheError;

// == Eviction Policy ==
/// Rule used to pick victims when the store is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least recently touched entry
    #[default]
    Lru,
    /// Entry with the fewest reads; ties fall to table iteration order
    Lfu,
    /// First inserted entry
    Fifo,
    /// Entry closest to expiring
    Ttl,
}

/// Read-only view of the store handed to the evictor.
pub struct EvictionView<'a> {
    pub entries: &'a HashMap<String, CacheEntry>,
    pub access_order: &'a KeyOrder,
    pub insertion_order: &'a KeyOrder,
}

impl EvictionPolicy {
    // == Select For Eviction ==
    /// Picks up to `count` keys to evict, in eviction order.
    ///
    /// Selection only reads the view; the store removes the returned keys.
    pub fn select_for_eviction(&self, view: &EvictionView<'_>, count: usize) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }
        match self {
            Self::Lru => view
                .access_order
                .iter()
                .take(count)
                .map(str::to_string)
                .collect(),
            Self::Fifo => view
                .insertion_order
                .iter()
                .take(count)
                .map(str::to_string)
                .collect(),
            Self::Lfu => smallest_by(view.entries, count, |e| e.access_count),
            Self::Ttl => smallest_by(view.entries, count, |e| e.expires_at),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Lfu => "lfu",
            Self::Fifo => "fifo",
            Self::Ttl => "ttl",
        }
    }
}

/// Keys of the `count` entries with the smallest rank.
fn smallest_by<F>(entries: &HashMap<String, CacheEntry>, count: usize, rank: F) -> Vec<String>
where
    F: Fn(&CacheEntry) -> u64,
{
    if count == 1 {
        return entries
            .iter()
            .min_by_key(|(_, entry)| rank(entry))
            .map(|(key, _)| vec![key.clone()])
            .unwrap_or_default();
    }

    let mut ranked: Vec<(&String, u64)> = entries
        .iter()
        .map(|(key, entry)| (key, rank(entry)))
        .collect();
    ranked.sort_by_key(|(_, r)| *r);
    ranked
        .into_iter()
        .take(count)
        .map(|(key, _)| key.clone())
        .collect()
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "lfu" => Ok(Self::Lfu),
            "fifo" => Ok(Self::Fifo),
            "ttl" => Ok(Self::Ttl),
            other => Err(CacheError::InvalidConfig(format!(
                "Unknown eviction policy '{}', expected one of lru, lfu, fifo, ttl",
                other
            ))),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Payload;
    use serde_json::json;

    struct Fixture {
        entries: HashMap<String, CacheEntry>,
        access: KeyOrder,
        insertion: KeyOrder,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                entries: HashMap::new(),
                access: KeyOrder::new(),
                insertion: KeyOrder::new(),
            }
        }

        fn add(&mut self, key: &str, access_count: u64, expires_at: u64) {
            let mut entry = CacheEntry::with_expiry(Payload::Plain(json!(key)), 1, 0, expires_at);
            entry.access_count = access_count;
            self.entries.insert(key.to_string(), entry);
            self.access.touch(key);
            self.insertion.insert(key);
        }

        fn select(&self, policy: EvictionPolicy, count: usize) -> Vec<String> {
            let view = EvictionView {
                entries: &self.entries,
                access_order: &self.access,
                insertion_order: &self.insertion,
            };
            policy.select_for_eviction(&view, count)
        }
    }

    #[test]
    fn test_lru_selects_least_recently_touched() {
        let mut f = Fixture::new();
        f.add("a", 0, 100);
        f.add("b", 0, 100);
        f.add("c", 0, 100);
        f.access.touch("a");

        assert_eq!(f.select(EvictionPolicy::Lru, 1), vec!["b"]);
        assert_eq!(f.select(EvictionPolicy::Lru, 2), vec!["b", "c"]);
    }

    #[test]
    fn test_fifo_ignores_access() {
        let mut f = Fixture::new();
        f.add("a", 0, 100);
        f.add("b", 0, 100);
        f.access.touch("a");

        assert_eq!(f.select(EvictionPolicy::Fifo, 1), vec!["a"]);
    }

    #[test]
    fn test_lfu_selects_fewest_reads() {
        let mut f = Fixture::new();
        f.add("hot", 10, 100);
        f.add("cold", 1, 100);
        f.add("warm", 5, 100);

        assert_eq!(f.select(EvictionPolicy::Lfu, 1), vec!["cold"]);
        assert_eq!(f.select(EvictionPolicy::Lfu, 2), vec!["cold", "warm"]);
    }

    #[test]
    fn test_ttl_selects_soonest_expiry() {
        let mut f = Fixture::new();
        f.add("late", 0, 300);
        f.add("soon", 0, 100);
        f.add("mid", 0, 200);

        assert_eq!(f.select(EvictionPolicy::Ttl, 1), vec!["soon"]);
        assert_eq!(f.select(EvictionPolicy::Ttl, 3), vec!["soon", "mid", "late"]);
    }

    #[test]
    fn test_select_on_empty_and_zero_count() {
        let f = Fixture::new();
        for policy in [
            EvictionPolicy::Lru,
            EvictionPolicy::Lfu,
            EvictionPolicy::Fifo,
            EvictionPolicy::Ttl,
        ] {
            assert!(f.select(policy, 1).is_empty());
        }

        let mut f = Fixture::new();
        f.add("a", 0, 100);
        assert!(f.select(EvictionPolicy::Lru, 0).is_empty());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("LFU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lfu);
        assert_eq!(" fifo ".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Fifo);
        assert_eq!("ttl".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Ttl);
        assert!(matches!(
            "random".parse::<EvictionPolicy>(),
            Err(CacheError::InvalidConfig(_))
        ));
        assert_eq!(EvictionPolicy::Fifo.to_string(), "fifo");
    }
}

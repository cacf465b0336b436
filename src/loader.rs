//! Read-through Loader
//!
//! Composes the cache and the request executor: check the cache, on a miss
//! fetch from the remote API, then populate the cache. Concurrent misses on
//! the same key share a single fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::ApiError;
use crate::executor::{ApiRequest, RequestExecutor};

type LoadResult = Result<Value, ApiError>;

enum Role {
    Leader(broadcast::Sender<LoadResult>),
    Follower(broadcast::Receiver<LoadResult>),
}

// == Cache Loader ==
pub struct CacheLoader {
    cache: SharedCache,
    executor: RequestExecutor,
    /// Fetches in progress, keyed by cache key
    in_flight: Mutex<HashMap<String, broadcast::Sender<LoadResult>>>,
}

impl CacheLoader {
    pub fn new(cache: SharedCache, executor: RequestExecutor) -> Self {
        Self {
            cache,
            executor,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    // == Fetch ==
    /// Cached GET-style fetch keyed by `request.cache_key()`.
    pub async fn fetch(&self, request: &ApiRequest, ttl: Option<u64>) -> LoadResult {
        let key = request.cache_key();
        self.get_or_load(&key, ttl, || async {
            self.executor.execute(request).await.map(|response| response.body)
        })
        .await
    }

    // == Get Or Load ==
    /// Returns the cached value for `key`, or runs `load` and caches its result.
    ///
    /// Only one `load` runs per key at a time; concurrent callers wait for it
    /// and receive the same result, error included. Errors are never cached.
    pub async fn get_or_load<F, Fut>(&self, key: &str, ttl: Option<u64>, load: F) -> LoadResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult>,
    {
        if let Some(value) = self.cache.write().await.get(key) {
            return Ok(value);
        }

        let role = {
            let mut in_flight = self.lock_in_flight();
            match in_flight.get(key) {
                Some(tx) => Role::Follower(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    in_flight.insert(key.to_string(), tx.clone());
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => match rx.recv().await {
                Ok(result) => {
                    debug!(key, "joined in-flight fetch");
                    result
                }
                Err(_) => {
                    // Leader was dropped before finishing
                    debug!(key, "in-flight fetch abandoned, loading directly");
                    self.load_and_store(key, ttl, load).await
                }
            },
            Role::Leader(tx) => {
                let guard = InFlightGuard {
                    loader: self,
                    key,
                };

                let result = self.load_and_store(key, ttl, load).await;

                drop(guard);
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    /// Removes cached reads whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.cache.write().await.delete_prefix(prefix)
    }

    /// Removes cached reads of `/<collection>`, its query variants and every
    /// path beneath it. `payments` does not match `payments_methods`.
    pub async fn invalidate_collection(&self, collection: &str) -> usize {
        let collection = collection.trim_matches('/');
        let base = format!("GET:/{}", collection);
        let mut cache = self.cache.write().await;
        if collection.is_empty() {
            return cache.delete_prefix(&base);
        }

        let mut removed = cache.delete_prefix(&format!("{}/", base))
            + cache.delete_prefix(&format!("{}?", base));
        if cache.delete(&base) {
            removed += 1;
        }
        removed
    }

    async fn load_and_store<F, Fut>(&self, key: &str, ttl: Option<u64>, load: F) -> LoadResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoadResult>,
    {
        let value = load().await?;

        let stored = self
            .cache
            .write()
            .await
            .set(key.to_string(), value.clone(), ttl);
        if let Err(e) = stored {
            warn!(key, error = %e, "failed to cache loaded value");
        }
        Ok(value)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<LoadResult>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the in-flight slot when the leader finishes or is cancelled.
struct InFlightGuard<'a> {
    loader: &'a CacheLoader,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.loader.lock_in_flight().remove(self.key);
    }
}

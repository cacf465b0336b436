//! Configuration Module
//!
//! Cache, retry and upstream settings, loaded from environment variables and
//! validated before any component is built.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Longest TTL accepted by `set`, in seconds.
pub const MAX_TTL: u64 = 86_400;

/// Shortest allowed reaper interval, in milliseconds.
pub const MIN_CLEANUP_INTERVAL_MS: u64 = 1_000;

// == Cache Config ==
/// Settings for a single cache store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// TTL in seconds for entries set without an explicit TTL
    pub default_ttl: u64,
    /// Reaper interval in milliseconds
    pub cleanup_interval_ms: u64,
    pub eviction_policy: EvictionPolicy,
    /// Values whose JSON encoding is larger than this are compressed
    pub compression_threshold: usize,
    pub enable_compression: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: 300,
            cleanup_interval_ms: 60_000,
            eviction_policy: EvictionPolicy::Lru,
            compression_threshold: 1024,
            enable_compression: false,
        }
    }
}

impl CacheConfig {
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_default_ttl(mut self, seconds: u64) -> Self {
        self.default_ttl = seconds;
        self
    }

    pub fn with_cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.cleanup_interval_ms = ms;
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    pub fn with_compression(mut self, threshold: usize) -> Self {
        self.enable_compression = true;
        self.compression_threshold = threshold;
        self
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    // == Validate ==
    pub fn validate(&self) -> Result<()> {
        if self.max_size < 1 {
            return Err(CacheError::InvalidConfig(
                "max_size must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_TTL).contains(&self.default_ttl) {
            return Err(CacheError::InvalidConfig(format!(
                "default_ttl must be between 1 and {} seconds",
                MAX_TTL
            )));
        }
        if self.cleanup_interval_ms < MIN_CLEANUP_INTERVAL_MS {
            return Err(CacheError::InvalidConfig(format!(
                "cleanup_interval must be at least {} ms",
                MIN_CLEANUP_INTERVAL_MS
            )));
        }
        Ok(())
    }
}

// == Retry Config ==
/// Retry budget and backoff schedule for the request executor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Add a ±10% perturbation to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(CacheError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(CacheError::InvalidConfig(
                "max_delay must not be smaller than initial_delay".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(CacheError::InvalidConfig(
                "backoff_multiplier must be a finite number >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

// == Upstream Config ==
/// Remote payment API the executor talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CacheError::InvalidConfig(format!(
                "upstream base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "upstream timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// == Config ==
/// Full configuration of the gateway binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub upstream: UpstreamConfig,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            upstream: UpstreamConfig::default(),
            server_port: 3000,
        }
    }
}

impl Config {
    /// Creates a Config by loading values from environment variables.
    ///
    /// Unset or unparseable numeric variables fall back to their defaults. An
    /// unknown eviction policy is an error.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE`, `CACHE_DEFAULT_TTL`, `CACHE_CLEANUP_INTERVAL_MS`,
    ///   `CACHE_EVICTION_POLICY`, `CACHE_ENABLE_COMPRESSION`,
    ///   `CACHE_COMPRESSION_THRESHOLD`
    /// - `RETRY_MAX_ATTEMPTS`, `RETRY_INITIAL_DELAY_MS`, `RETRY_MAX_DELAY_MS`,
    ///   `RETRY_BACKOFF_MULTIPLIER`, `RETRY_JITTER`
    /// - `UPSTREAM_BASE_URL`, `UPSTREAM_API_KEY`, `UPSTREAM_TIMEOUT_MS`
    /// - `SERVER_PORT` (default: 3000)
    pub fn from_env() -> Result<Self> {
        let cache_defaults = CacheConfig::default();
        let retry_defaults = RetryConfig::default();
        let upstream_defaults = UpstreamConfig::default();

        let eviction_policy = match env::var("CACHE_EVICTION_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => cache_defaults.eviction_policy,
        };

        let config = Self {
            cache: CacheConfig {
                max_size: env_or("CACHE_MAX_SIZE", cache_defaults.max_size),
                default_ttl: env_or("CACHE_DEFAULT_TTL", cache_defaults.default_ttl),
                cleanup_interval_ms: env_or(
                    "CACHE_CLEANUP_INTERVAL_MS",
                    cache_defaults.cleanup_interval_ms,
                ),
                eviction_policy,
                compression_threshold: env_or(
                    "CACHE_COMPRESSION_THRESHOLD",
                    cache_defaults.compression_threshold,
                ),
                enable_compression: env_or(
                    "CACHE_ENABLE_COMPRESSION",
                    cache_defaults.enable_compression,
                ),
            },
            retry: RetryConfig {
                max_attempts: env_or("RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts),
                initial_delay_ms: env_or("RETRY_INITIAL_DELAY_MS", retry_defaults.initial_delay_ms),
                max_delay_ms: env_or("RETRY_MAX_DELAY_MS", retry_defaults.max_delay_ms),
                backoff_multiplier: env_or(
                    "RETRY_BACKOFF_MULTIPLIER",
                    retry_defaults.backoff_multiplier,
                ),
                jitter: env_or("RETRY_JITTER", retry_defaults.jitter),
            },
            upstream: UpstreamConfig {
                base_url: env::var("UPSTREAM_BASE_URL").unwrap_or(upstream_defaults.base_url),
                api_key: env::var("UPSTREAM_API_KEY").ok().filter(|k| !k.is_empty()),
                timeout_ms: env_or("UPSTREAM_TIMEOUT_MS", upstream_defaults.timeout_ms),
            },
            server_port: env_or("SERVER_PORT", 3000),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.retry.validate()?;
        self.upstream.validate()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

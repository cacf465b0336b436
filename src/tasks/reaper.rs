//! TTL Reaper
//!
//! Background task that periodically sweeps expired cache entries. Reads
//! already check expiry lazily; the sweep only reclaims memory held by keys
//! nobody reads.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::cache::SharedCache;
use crate::config::MIN_CLEANUP_INTERVAL_MS;
use crate::error::{CacheError, Result};

/// Handle to a running reaper.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signals the reaper to exit and waits for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            if e.is_panic() {
                error!(error = %e, "TTL reaper panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns the reaper on the current runtime.
///
/// The first sweep runs one `interval` after spawning. Each sweep holds the
/// cache write lock only for the duration of `cleanup_expired`. Intervals
/// shorter than `MIN_CLEANUP_INTERVAL_MS` are rejected.
pub fn spawn_reaper(cache: SharedCache, interval: Duration) -> Result<ReaperHandle> {
    if interval < Duration::from_millis(MIN_CLEANUP_INTERVAL_MS) {
        return Err(CacheError::InvalidConfig(format!(
            "cleanup_interval must be at least {} ms, got {} ms",
            MIN_CLEANUP_INTERVAL_MS,
            interval.as_millis()
        )));
    }

    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "TTL reaper starting");

        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = cache.write().await.cleanup_expired();
                    if removed > 0 {
                        info!(removed, "TTL reaper removed expired entries");
                    } else {
                        debug!("TTL reaper found no expired entries");
                    }
                }
                changed = shutdown_rx.changed() => {
                    // A dropped sender also means shutdown
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("TTL reaper received shutdown signal, exiting");
                        break;
                    }
                }
            }
        }
    });

    Ok(ReaperHandle { shutdown, join })
}

//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Fraction of the delay used as the jitter margin (±10%).
const JITTER_RATIO: f64 = 0.1;

/// Computes the sleep between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffCalculator {
    initial_delay_ms: u64,
    max_delay_ms: u64,
    multiplier: f64,
    jitter: bool,
}

impl BackoffCalculator {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based):
    /// `min(initial * multiplier^(attempt - 1), max)`.
    ///
    /// Attempt 0 has no delay; nothing waits before the first attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped.round() as u64)
    }

    /// Delay after failed attempt `attempt`, with jitter applied if enabled.
    ///
    /// The jittered delay never exceeds `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return base;
        }

        let factor = rand::thread_rng().gen_range((1.0 - JITTER_RATIO)..=(1.0 + JITTER_RATIO));
        let jittered_ms = (base.as_millis() as f64 * factor).round() as u64;
        Duration::from_millis(jittered_ms.min(self.max_delay_ms))
    }
}

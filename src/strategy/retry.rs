use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay schedule for the optimistic retry loop.
///
/// The default retries forever every 50 ms. Under heavy contention that can
/// livelock; set `max_attempts` (or pass a deadline) to surface
/// `RetryExhausted` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub interval_ms: u64,
    /// Growth factor applied per further attempt. `1.0` keeps the delay fixed.
    pub multiplier: f64,
    /// Ceiling for the grown delay.
    pub max_interval_ms: u64,
    /// Draw each delay uniformly from `0..=delay` ("full jitter").
    pub jitter: bool,
    /// Total attempts allowed, including the first. `None` means unbounded.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            multiplier: 1.0,
            max_interval_ms: 50,
            jitter: false,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Same delay between every attempt.
    pub fn fixed(interval: Duration) -> Self {
        let ms = duration_ms(interval);
        Self {
            interval_ms: ms,
            max_interval_ms: ms,
            ..Self::default()
        }
    }

    /// Doubling delay from `initial` up to `max`, with full jitter.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            interval_ms: duration_ms(initial),
            multiplier: 2.0,
            max_interval_ms: duration_ms(max),
            jitter: true,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether `attempts` already made uses up the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    /// Delay to wait after the `attempt`-th failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_ms(attempt);
        let ms = if self.jitter && ceiling > 0 {
            rand::thread_rng().gen_range(0..=ceiling)
        } else {
            ceiling
        };
        Duration::from_millis(ms)
    }

    fn ceiling_ms(&self, attempt: u32) -> u64 {
        let cap = self.max_interval_ms.max(self.interval_ms);
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let grown = self.interval_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        if grown.is_finite() && grown < cap as f64 {
            grown as u64
        } else {
            cap
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

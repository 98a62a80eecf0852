//! Exponential backoff with jitter for map-data provider retries.
//!
//! Keeps a struggling Overpass instance from being hammered by concurrent
//! route requests that all miss the density floor at once.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Backoff {
    max: Duration,
    current: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        let max = max.max(base);
        Self {
            max,
            current: base,
            jitter_ratio: 0.2,
        }
    }

    /// Delay to wait before the next attempt. The first call yields roughly
    /// `base`; each later call doubles it up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

/// `delay` plus up to `ratio` of itself, scaled by the clock's sub-second
/// phase.
fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    let spread = delay.mul_f64(ratio.clamp(0.0, 1.0));
    if spread.is_zero() {
        return delay;
    }

    let phase = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| f64::from(elapsed.subsec_nanos()) / 1e9)
        .unwrap_or(0.0);
    delay + spread.mul_f64(phase)
}

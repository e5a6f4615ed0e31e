//! Redelivery backoff.

use std::time::Duration;

/// Backoff applied by the broker between deliveries of a message that was
/// answered with `RetryLater`.
///
/// delay = min(base_delay * multiplier^(reconsume_times - 1), max_delay)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// First redelivery after 10s, doubling, capped at two hours.
    pub fn broker_default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            multiplier: 2.0,
            max_delay: Duration::from_secs(2 * 60 * 60),
        }
    }

    /// Same delay for every redelivery.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Delay before the delivery with the given `reconsume_times` (1 = first
    /// redelivery). 0 is treated like 1.
    pub fn next_delay(&self, reconsume_times: u32) -> Duration {
        let exponent = reconsume_times.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::broker_default()
    }
}

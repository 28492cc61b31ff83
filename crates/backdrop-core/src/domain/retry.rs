//! Retry policy: decides how long to pause between transient provider failures.

use std::time::Duration;

/// Retry policy for empty or failed fetch attempts.
///
/// The default is immediate: no pause, no cap on attempts.
/// `backoff` switches to a bounded exponential delay.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt. Zero disables pausing.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff(base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            base_delay,
            multiplier,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.base_delay.is_zero()
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = min(base_delay * multiplier^(attempts - 1), max_delay)
    pub fn next_delay(&self, attempts: u32) -> Duration {
        if self.is_immediate() {
            return Duration::ZERO;
        }
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let max_secs = self.max_delay.as_secs_f64();
        if !delay_secs.is_finite() || delay_secs >= max_secs {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs)
    }

    /// Sleep for `next_delay(attempts)`; returns at once for the immediate policy.
    pub async fn pause(&self, attempts: u32) {
        let delay = self.next_delay(attempts);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

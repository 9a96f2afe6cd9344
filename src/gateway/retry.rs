//! Backoff policy for transient provider failures.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with symmetric jitter.
///
/// The delay before retry `n` (1-indexed) is `base_delay * factor^(n - 1)`,
/// randomized within `±jitter` of that value.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub factor: f64,
    /// Fraction of the delay used as jitter range; clamped to `0.0..=1.0`,
    /// ignored when not finite.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first attempt.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether another attempt is allowed after `attempts` calls have been made.
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }

    /// Total number of calls this policy permits.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the given retry, without jitter.
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.factor.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay before the given retry with jitter applied.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let nominal = self.nominal_delay(retry);
        if !self.jitter.is_finite() {
            return nominal;
        }
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return nominal;
        }

        let scale = rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter));
        Duration::try_from_secs_f64(nominal.as_secs_f64() * scale).unwrap_or(Duration::MAX)
    }
}

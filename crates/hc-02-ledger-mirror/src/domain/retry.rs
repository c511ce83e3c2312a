//! # Retry Policy
//!
//! Exponential backoff for a fact's attempt chain.

use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_JITTER: f64 = 0.2;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per fact, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Fraction of the delay randomized in either direction (0..=1).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Policy with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay after the `failed_attempts`-th failure:
    /// `base * multiplier^(failed_attempts - 1)`, capped at `max_delay`.
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(failed_attempts - 1).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// `delay_for` spread by `jitter` using `sample` in `[0, 1)`.
    pub fn delay_with_jitter(&self, failed_attempts: u32, sample: f64) -> Duration {
        let base = self.delay_for(failed_attempts);
        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = 1.0 - jitter + 2.0 * jitter * sample.clamp(0.0, 1.0);
        base.mul_f64(factor).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_millis(1_000),
            jitter: 0.5,
        }
    }

    #[test]
    fn test_exponential_delays() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = policy();
        assert_eq!(policy.delay_with_jitter(2, 0.0), Duration::from_millis(100));
        assert_eq!(policy.delay_with_jitter(2, 0.5), Duration::from_millis(200));
        // Upper spread is capped by max_delay.
        assert_eq!(policy.delay_with_jitter(4, 1.0), Duration::from_millis(1_000));
    }

    #[test]
    fn test_allows_retry() {
        let policy = RetryPolicy::immediate(3);
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
        assert_eq!(policy.delay_with_jitter(2, 0.9), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn prop_delays_never_exceed_cap(attempt in 0u32..64, sample in 0.0f64..1.0) {
            let policy = policy();
            prop_assert!(policy.delay_for(attempt) <= policy.max_delay);
            prop_assert!(policy.delay_with_jitter(attempt, sample) <= policy.max_delay);
        }

        #[test]
        fn prop_delays_are_monotonic(attempt in 1u32..32) {
            let policy = policy();
            prop_assert!(policy.delay_for(attempt) <= policy.delay_for(attempt + 1));
        }
    }
}

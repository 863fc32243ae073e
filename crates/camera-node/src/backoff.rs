//! Exponential backoff for registration retries.
//!
//! `delay(n) = min(base * factor^(n - 1), max)` for the n-th consecutive failure.

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

/// Calculates the delay after the `attempt`-th consecutive failure (1-based).
pub fn calculate_backoff(attempt: u32, config: &BackoffConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay_secs = config.base_delay.as_secs_f64() * config.backoff_factor.powi(exponent);

    Duration::from_secs_f64(delay_secs.min(config.max_delay.as_secs_f64()))
}

/// Consecutive-failure bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Failures since the last success
    pub attempts: u32,
    /// Delay chosen after the latest failure (base delay when idle)
    pub current_delay: Duration,
}

impl RetryState {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            attempts: 0,
            current_delay: config.base_delay,
        }
    }

    /// Count a failure and return how long to wait before retrying.
    pub fn record_failure(&mut self, config: &BackoffConfig) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        self.current_delay = calculate_backoff(self.attempts, config);
        self.current_delay
    }

    /// Reset after a successful registration.
    pub fn reset(&mut self, config: &BackoffConfig) {
        self.attempts = 0;
        self.current_delay = config.base_delay;
    }
}

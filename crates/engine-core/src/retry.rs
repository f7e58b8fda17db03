use std::time::Duration;

/// Indicates whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Per-cell retry budget with capped exponential backoff.
///
/// `max_retries` counts retries, not attempts: a cell that keeps failing is
/// attempted `max_retries + 1` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    /// No waiting between attempts; used by tests and local backends.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether another attempt is allowed after `attempts_made` failed attempts.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made <= self.max_retries
    }

    /// Delay before the next attempt: `base * 2^(attempts_made - 1)`, capped.
    pub fn backoff_delay(&self, attempts_made: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let exponent = attempts_made.saturating_sub(1).min(16);
        let factor = 1u128 << exponent;
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}

use std::time::Duration;
use tokio::time::sleep;

/// Attempt budget and optional exponential backoff for one RPC call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, the first one included
    pub max_attempts: u32,
    /// Delay before the second call; zero means retry immediately
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_FETCH_ATTEMPTS,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_millis(crate::config::DEFAULT_RETRY_BACKOFF_MAX_MS),
        }
    }
}

#[derive(Debug)]
pub struct MaxRetriesExceeded {
    pub attempts: u32,
}

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Maximum retry attempts exceeded ({} attempts)", self.attempts)
    }
}

impl std::error::Error for MaxRetriesExceeded {}

#[derive(Debug)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record one call.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Delay to wait after the `attempt`-th failed call.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.policy.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(
            self.policy.initial_delay.saturating_mul(factor),
            self.policy.max_delay,
        )
    }

    /// Wait before the next call, or fail if the budget is spent.
    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        if self.attempts >= self.policy.max_attempts {
            return Err(MaxRetriesExceeded {
                attempts: self.attempts,
            });
        }

        let delay = self.delay_for(self.attempts);
        if !delay.is_zero() {
            log::debug!(
                "⏳ Retry attempt {} of {} in {}ms",
                self.attempts + 1,
                self.policy.max_attempts,
                delay.as_millis()
            );
            sleep(delay).await;
        }
        Ok(())
    }
}

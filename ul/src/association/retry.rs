//! Retry policy for association requests
//! rejected transiently by the acceptor.
//!
//! See [`ClientAssociationOptions::establish_with_retry`](super::client::ClientAssociationOptions::establish_with_retry).

use std::time::Duration;

/// Retry strategy with exponential backoff.
///
/// ```
/// # use dicom_ul_association::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::with_max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(200));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, counting the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Backoff multiplier, applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy which never retries.
    pub fn never() -> Self {
        RetryPolicy::with_max_attempts(1)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Whether another attempt may follow the given number of failed attempts.
    pub fn allows(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }

    /// Calculate the delay before retrying,
    /// where `attempt` is the number of retries already done.
    ///
    /// Grows exponentially from `initial_delay` and is capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self
                .backoff_multiplier
                .powi(attempt.min(i32::MAX as u32) as i32);

        let max_ms = self.max_delay.as_millis() as f64;
        if delay_ms.is_nan() || delay_ms > max_ms {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        }
    }
}

//! Retry policy for transient remote failures.
//!
//! The delay schedule is a plain function of the attempt number so tests can
//! swap in [`RetryPolicy::immediate`] and run the whole retry ladder without
//! waiting on the wall clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::LlmError;

/// Maximum number of retry attempts for transient failures.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff in milliseconds.
pub const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Delay schedule: attempt number (0-based) to wait duration.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// How many times to retry and how long to wait in between.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: BackoffFn,
    honour_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(BASE_RETRY_DELAY_MS))
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("honour_retry_after", &self.honour_retry_after)
            .finish()
    }
}

impl RetryPolicy {
    /// Exponential backoff: `base × 2^attempt` (1s, 2s, 4s with the default base).
    pub fn exponential(base: Duration) -> Self {
        Self::with_backoff(move |attempt| base.saturating_mul(1u32 << attempt.min(16)))
    }

    /// Policy with a custom delay schedule.
    pub fn with_backoff<F>(backoff: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_retries: MAX_RETRIES,
            backoff: Arc::new(backoff),
            honour_retry_after: true,
        }
    }

    /// Policy that never sleeps. Retry hints from the server are ignored too.
    pub fn immediate() -> Self {
        Self {
            honour_retry_after: false,
            ..Self::with_backoff(|_| Duration::ZERO)
        }
    }

    /// Overrides the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to wait before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// True for the zero-delay fast path of [`RetryPolicy::immediate`].
    pub fn is_disabled(&self) -> bool {
        !self.honour_retry_after
    }
}

/// Returns true if an HTTP status should be retried: 429 or any 5xx.
pub fn is_retryable_status(code: u16) -> bool {
    code == 429 || code >= 500
}

/// Parses a `Retry-After` header given as a whole number of seconds.
///
/// HTTP-date values and zero are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Sleeps for `delay` unless `cancel` fires first.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), LlmError> {
    if cancel.is_cancelled() {
        return Err(LlmError::Cancelled);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(LlmError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert!(!policy.is_disabled());
    }

    #[test]
    fn test_immediate_policy_is_disabled() {
        let policy = RetryPolicy::immediate();
        assert!(policy.is_disabled());
        assert_eq!(policy.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_custom_schedule_keeps_retry_hints() {
        let policy = RetryPolicy::with_backoff(|_| Duration::ZERO);
        assert!(!policy.is_disabled());
    }

    #[test]
    fn test_with_max_retries() {
        let policy = RetryPolicy::immediate().with_max_retries(1);
        assert_eq!(policy.max_attempts(), 2);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("1"), Some(Duration::from_secs(1)));
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("0"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
    }

    #[tokio::test]
    async fn test_sleep_or_cancel_returns_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = sleep_or_cancel(Duration::from_secs(30), &cancel).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sleep_or_cancel_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = sleep_or_cancel(Duration::ZERO, &cancel).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}

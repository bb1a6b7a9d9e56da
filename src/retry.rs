//! Bounded retry with exponential backoff for provider calls.
//!
//! Every attempt re-acquires the caller's [`RateLimiter`] before running,
//! so retries consume quota exactly like first attempts. After exhaustion
//! the last error is surfaced annotated with the attempt count.
//!
//! This wrapper retries on *any* [`ProviderError`], including logically
//! non-retriable ones such as auth failures. Those still fail fast in
//! wall-clock terms because the attempt budget is small.

use std::future::Future;
use std::time::Duration;

use rand::prelude::*;

use crate::error::ProviderError;
use crate::limit::RateLimiter;

/// Backoff parameters for a retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per subsequent attempt.
    pub base_delay: Duration,
    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
    /// Multiply each delay by a random factor in [0.5, 1.0).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit attempt and delay bounds.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter: true,
        }
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the backoff delay after the given failed attempt (1-based).
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay);
        if self.jitter {
            let factor: f64 = rand::rng().random_range(0.5..1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }
}

/// Runs `operation` with bounded retry, acquiring `limiter` before every
/// attempt.
///
/// `operation` receives the 1-based attempt number, which lets callers log
/// or vary the request per attempt. Exhaustion yields
/// [`ProviderError::RetriesExhausted`] wrapping the last error's message.
pub async fn call_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    limiter: &RateLimiter,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    debug_assert!(policy.max_attempts > 0);
    let mut last_error: Option<ProviderError> = None;

    for attempt in 1..=policy.max_attempts {
        limiter.acquire().await;

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Provider call failed"
                );
                last_error = Some(e);

                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff_delay(attempt)).await;
                }
            }
        }
    }

    let last_error = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown error".to_string());
    Err(ProviderError::RetriesExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::limit::RateLimitConfig;

    fn unbounded_limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig::new(1000, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let limiter = unbounded_limiter();
        let policy = RetryPolicy::default().with_jitter(false);

        let result = call_with_retry(policy, &limiter, "noop", |_| async { Ok::<_, ProviderError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_twice_then_succeed() {
        let limiter = unbounded_limiter();
        let policy = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(10));
        let attempts = Arc::new(AtomicU32::new(0));

        let start = tokio::time::Instant::now();
        let counter = Arc::clone(&attempts);
        let result = call_with_retry(policy, &limiter, "flaky", move |_| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::RequestFailed("boom".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // base_delay + 2 * base_delay, reduced by at most half through jitter.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_annotates_attempt_count() {
        let limiter = unbounded_limiter();
        let policy =
            RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50)).with_jitter(false);

        let result: Result<(), _> = call_with_retry(policy, &limiter, "doomed", |_| async {
            Err(ProviderError::ApiError {
                code: 500,
                message: "upstream down".to_string(),
            })
        })
        .await;

        match result.unwrap_err() {
            ProviderError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("upstream down"));
            }
            other => panic!("expected RetriesExhausted, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_consume_rate_limit_quota() {
        // Two requests per large window: the third attempt must wait for
        // the rolling window, proving retries go through the limiter.
        let window = Duration::from_secs(30);
        let limiter = RateLimiter::new(RateLimitConfig::new(2, window));
        let policy =
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(1)).with_jitter(false);

        let start = tokio::time::Instant::now();
        let result: Result<(), _> = call_with_retry(policy, &limiter, "quota", |_| async {
            Err(ProviderError::RequestFailed("nope".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert!(start.elapsed() >= window);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy =
            RetryPolicy::new(5, Duration::from_secs(2), Duration::from_secs(10)).with_jitter(false);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(4), Duration::from_secs(10));
        for _ in 0..100 {
            let delay = policy.backoff_delay(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay < Duration::from_secs(4));
        }
    }
}

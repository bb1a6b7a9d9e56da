//! Rolling-window rate limiting for provider clients.
//!
//! Each provider client owns one [`RateLimiter`]. The limiter keeps an
//! ordered queue of call timestamps; `acquire` blocks until issuing one
//! more call would not exceed `max_requests` within the trailing
//! `time_window`, then records the call. Retries re-acquire the limiter,
//! so retried calls consume quota like any other call.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Configuration for a [`RateLimiter`].
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum number of calls allowed inside the window.
    pub max_requests: usize,
    /// Trailing window length.
    pub time_window: Duration,
}

impl RateLimitConfig {
    /// Creates a config for `max_requests` calls per `time_window`.
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
        }
    }

    /// Convenience constructor for a per-minute limit.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

/// Rolling-window rate limiter shared across concurrent calls to one
/// provider client.
///
/// Access is serialized by a single async mutex. Waiters sleep while
/// holding the lock, so admission order is not guaranteed FIFO among
/// concurrent waiters, but no waiter starves beyond one `time_window`
/// once the lock is free. A cancelled waiter drops the guard without
/// corrupting the timestamp queue.
pub struct RateLimiter {
    config: RateLimitConfig,
    request_times: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_times: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the limiter's configuration.
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Blocks until another call is admissible, then records it.
    pub async fn acquire(&self) {
        let mut times = self.request_times.lock().await;
        let now = Instant::now();

        Self::evict_expired(&mut times, now, self.config.time_window);

        if times.len() >= self.config.max_requests {
            if let Some(&oldest) = times.front() {
                let wake_at = oldest + self.config.time_window;
                if wake_at > now {
                    tokio::time::sleep_until(wake_at).await;
                }
                // The sleep may have outlasted more than one entry.
                let now = Instant::now();
                Self::evict_expired(&mut times, now, self.config.time_window);
            }
        }

        times.push_back(Instant::now());
    }

    /// Drops timestamps that have fallen out of the trailing window.
    fn evict_expired(times: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&front) = times.front() {
            if now.duration_since(front) >= window {
                times.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns the number of calls currently counted inside the window.
    pub async fn current_load(&self) -> usize {
        let mut times = self.request_times.lock().await;
        Self::evict_expired(&mut times, Instant::now(), self.config.time_window);
        times.len()
    }
}

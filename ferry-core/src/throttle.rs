//! Client-side rate limiting
//!
//! A token-interval throttle: a minimum spacing between outgoing calls is
//! derived from a configured calls-per-second ceiling, independent of any
//! server-side rate-limit headers.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Minimum-interval throttle applied before each API call
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Build a limiter from a calls-per-second ceiling.
    ///
    /// A non-positive ceiling disables throttling.
    pub fn new(calls_per_second: f64) -> Self {
        let min_interval = if calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / calls_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the next call is allowed, then record it.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spacing_enforced() {
        let limiter = RateLimiter::new(100.0); // 10ms spacing
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // Two waits of ~10ms each after the free first call
        assert!(start.elapsed() >= Duration::from_millis(18));
    }

    #[tokio::test]
    async fn test_disabled_when_non_positive() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        for _ in 0..50 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}

//! Request pacing for the AniDB UDP API

use async_trait::async_trait;
use log::{debug, trace};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Paces outgoing requests
///
/// Called once before every datagram the connection handler sends.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next request may go out
    async fn ensure_rate(&self);
}

/// Rate limiter enforcing a fixed minimum gap between requests
#[derive(Debug)]
pub struct IntervalRateLimiter {
    /// Last request timestamp
    last_request: Mutex<Option<Instant>>,
    /// Minimum delay between requests
    min_delay: Duration,
}

impl IntervalRateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_delay,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

impl Default for IntervalRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(
            1.0 / crate::protocol::RATE_LIMIT_REQUESTS_PER_SECOND,
        ))
    }
}

#[async_trait]
impl RateLimiter for IntervalRateLimiter {
    async fn ensure_rate(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                debug!("Rate limiter: waiting {wait_time:?} to respect rate limit");
                sleep(wait_time).await;
            } else {
                trace!("Rate limiter: no wait needed, last request was {elapsed:?} ago");
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter() {
        let limiter = IntervalRateLimiter::new(Duration::from_secs(2));

        let start = Instant::now();
        limiter.ensure_rate().await;
        // First request should be immediate
        assert_eq!(start.elapsed(), Duration::ZERO);

        let start = Instant::now();
        limiter.ensure_rate().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_idle_period() {
        let limiter = IntervalRateLimiter::new(Duration::from_secs(2));
        limiter.ensure_rate().await;

        tokio::time::advance(Duration::from_secs(5)).await;

        let start = Instant::now();
        limiter.ensure_rate().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_default_follows_protocol_rate() {
        assert_eq!(
            IntervalRateLimiter::default().min_delay(),
            Duration::from_secs(2)
        );
    }
}

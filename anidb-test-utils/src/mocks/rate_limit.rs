//! Rate limiter that never waits

use anidb_udp_core::RateLimiter;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts `ensure_rate` calls without pacing anything
#[derive(Debug, Default)]
pub struct CountingRateLimiter {
    calls: AtomicUsize,
}

impl CountingRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for CountingRateLimiter {
    async fn ensure_rate(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

//! Ban bookkeeping
//!
//! A ban is an explicit flag plus a start time; it lapses on its own once the
//! reset length has passed. A pause is a shorter, server-requested slowdown
//! that also counts as banned until the keepalive tick clears it.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Which AniDB API a ban applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BanType {
    Udp,
    Http,
}

impl fmt::Display for BanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanType::Udp => write!(f, "UDP"),
            BanType::Http => write!(f, "HTTP"),
        }
    }
}

/// A server-requested pause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanPause {
    pub seconds: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BanTimer {
    ban_type: BanType,
    reset_length: Duration,
    banned: bool,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    pause: Option<BanPause>,
}

impl BanTimer {
    pub fn new(ban_type: BanType, reset_length: Duration) -> Self {
        Self {
            ban_type,
            reset_length,
            banned: false,
            started: None,
            started_at: None,
            pause: None,
        }
    }

    pub fn ban_type(&self) -> BanType {
        self.ban_type
    }

    /// Flag set and the reset length not yet elapsed
    pub fn is_banned(&self) -> bool {
        self.banned
            && self
                .started
                .is_some_and(|started| started.elapsed() < self.reset_length)
    }

    /// Flag set but the reset length has passed
    pub fn has_lapsed(&self) -> bool {
        self.banned && !self.is_banned()
    }

    pub fn pause(&self) -> Option<&BanPause> {
        self.pause.as_ref()
    }

    /// True when a pause exists and `idle` has reached its length
    pub fn pause_elapsed(&self, idle: Duration) -> bool {
        self.pause
            .as_ref()
            .is_some_and(|pause| idle >= Duration::from_secs(pause.seconds))
    }

    /// Mark banned, keeping the original start of an ongoing ban
    ///
    /// Returns the expiry.
    pub fn set_banned(&mut self) -> DateTime<Utc> {
        if !self.is_banned() {
            self.started = Some(Instant::now());
            self.started_at = Some(Utc::now());
        }
        self.banned = true;
        self.expires_at()
    }

    /// Record a pause window and mark banned
    pub fn extend(&mut self, seconds: u64, reason: impl Into<String>) -> DateTime<Utc> {
        self.pause = Some(BanPause {
            seconds,
            reason: reason.into(),
        });
        self.set_banned()
    }

    /// Clear ban and pause; true if anything was set
    pub fn reset(&mut self) -> bool {
        let was_set = self.banned || self.pause.is_some();
        self.banned = false;
        self.started = None;
        self.started_at = None;
        self.pause = None;
        was_set
    }

    /// Ban start plus reset length
    ///
    /// Falls back to now as the start when no ban has been recorded, so a
    /// `Banned` error always carries an expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let start = self.started_at.unwrap_or_else(Utc::now);
        let length = TimeDelta::from_std(self.reset_length).unwrap_or(TimeDelta::MAX);
        start.checked_add_signed(length).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> BanTimer {
        BanTimer::new(BanType::Udp, Duration::from_secs(5400))
    }

    #[test]
    fn test_not_banned_initially() {
        let timer = timer();
        assert!(!timer.is_banned());
        assert!(!timer.has_lapsed());
        assert!(timer.pause().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ban_lapses_after_reset_length() {
        let mut timer = timer();
        let expires = timer.set_banned();
        assert!(timer.is_banned());
        assert!(expires > Utc::now() + TimeDelta::minutes(89));

        tokio::time::advance(Duration::from_secs(5399)).await;
        assert!(timer.is_banned());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!timer.is_banned());
        assert!(timer.has_lapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_ban_keeps_start() {
        let mut timer = timer();
        let first = timer.set_banned();
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = timer.set_banned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extend_marks_banned_with_pause() {
        let mut timer = timer();
        timer.extend(300, "slow down");
        assert!(timer.is_banned());
        assert_eq!(
            timer.pause(),
            Some(&BanPause {
                seconds: 300,
                reason: "slow down".to_string()
            })
        );
        assert!(!timer.pause_elapsed(Duration::from_secs(299)));
        assert!(timer.pause_elapsed(Duration::from_secs(300)));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut timer = timer();
        timer.extend(10, "pause");
        assert!(timer.reset());
        assert!(!timer.is_banned());
        assert!(timer.pause().is_none());
        assert!(!timer.reset());
    }

    #[test]
    fn test_ban_type_display() {
        assert_eq!(BanType::Udp.to_string(), "UDP");
        assert_eq!(BanType::Http.to_string(), "HTTP");
    }
}

//! Connection state block and status snapshot

use super::ban::{BanPause, BanTimer};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Mutable connection state
///
/// Lives behind the handler's state lock. Invariant: `logged_on` implies a
/// session and no invalid-session flag.
#[derive(Debug)]
pub(crate) struct ConnectionState {
    pub session: Option<String>,
    pub logged_on: bool,
    pub invalid_session: bool,
    pub network_available: bool,
    pub alive: bool,
    pub cdn_domain: String,
    pub last_ping: Option<Instant>,
    pub last_non_ping: Option<Instant>,
    pub ban: BanTimer,
}

impl ConnectionState {
    pub fn new(cdn_domain: String, ban: BanTimer) -> Self {
        Self {
            session: None,
            logged_on: false,
            invalid_session: false,
            network_available: false,
            alive: false,
            cdn_domain,
            last_ping: None,
            last_non_ping: None,
            ban,
        }
    }

    /// Latest of the ping and non-ping timestamps
    pub fn last_message(&self) -> Option<Instant> {
        self.last_ping.max(self.last_non_ping)
    }

    pub fn stamp(&mut self, is_ping: bool) {
        let now = Instant::now();
        if is_ping {
            self.last_ping = Some(now);
        } else {
            self.last_non_ping = Some(now);
        }
    }

    pub fn log_in(&mut self, session: String, cdn_domain: Option<String>) {
        self.session = Some(session);
        if let Some(domain) = cdn_domain {
            self.cdn_domain = domain;
        }
        self.logged_on = true;
        self.invalid_session = false;
    }

    pub fn log_out(&mut self) {
        self.session = None;
        self.logged_on = false;
    }

    pub fn image_server_url(&self) -> String {
        format!("https://{}/images/main", self.cdn_domain)
    }
}

/// Time since `stamp`; never-stamped counts as idle forever
pub(crate) fn idle_since(stamp: Option<Instant>, now: Instant) -> Duration {
    stamp.map_or(Duration::MAX, |at| now.saturating_duration_since(at))
}

/// Connection phase derived from the state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No transport
    Disconnected,
    /// Transport open, no session
    LoggedOut,
    /// Session established
    LoggedIn,
    /// Banned or paused; commands fail fast
    Banned,
    /// Last login definitively failed; commands fail fast
    InvalidSession,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::Disconnected => write!(f, "Disconnected"),
            ConnectionPhase::LoggedOut => write!(f, "Connected (logged out)"),
            ConnectionPhase::LoggedIn => write!(f, "Logged in"),
            ConnectionPhase::Banned => write!(f, "Banned"),
            ConnectionPhase::InvalidSession => write!(f, "Invalid session"),
        }
    }
}

/// Point-in-time view of the connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub phase: ConnectionPhase,
    pub logged_on: bool,
    pub invalid_session: bool,
    pub banned: bool,
    pub ban_expires: Option<DateTime<Utc>>,
    pub pause: Option<BanPause>,
    pub network_available: bool,
    pub alive: bool,
    pub image_server_url: String,
}

impl ConnectionStatus {
    pub(crate) fn capture(state: &ConnectionState, has_transport: bool) -> Self {
        let banned = state.ban.is_banned();
        let phase = if !has_transport {
            ConnectionPhase::Disconnected
        } else if banned {
            ConnectionPhase::Banned
        } else if state.invalid_session {
            ConnectionPhase::InvalidSession
        } else if state.logged_on {
            ConnectionPhase::LoggedIn
        } else {
            ConnectionPhase::LoggedOut
        };

        Self {
            phase,
            logged_on: state.logged_on,
            invalid_session: state.invalid_session,
            banned,
            ban_expires: banned.then(|| state.ban.expires_at()),
            pause: state.ban.pause().cloned(),
            network_available: state.network_available,
            alive: state.alive,
            image_server_url: state.image_server_url(),
        }
    }
}

//! Tuning knobs for the UDP connection handler

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// UDP connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    /// Client name registered with AniDB
    pub client_name: String,
    /// Client version registered with AniDB
    pub client_version: String,
    /// Seconds to wait for a reply
    pub request_timeout_secs: u64,
    /// Seconds between keepalive ticks
    pub pulse_interval_secs: u64,
    /// Idle seconds before a keepalive PING
    pub ping_frequency_secs: u64,
    /// Idle seconds (non-ping traffic) before the session is dropped locally
    pub force_logout_secs: u64,
    /// Ban length in hours
    pub ban_reset_hours: f64,
    /// Minimum gap between requests for the default rate limiter
    pub min_request_interval_ms: u64,
    /// Image domain used until a login reports one
    pub image_domain: String,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            client_name: "anidbudp".to_string(),
            client_version: "1".to_string(),
            request_timeout_secs: 20,
            pulse_interval_secs: 5,
            ping_frequency_secs: 45,
            force_logout_secs: 600,
            ban_reset_hours: 1.5,
            min_request_interval_ms: 2000,
            image_domain: crate::protocol::DEFAULT_IMAGE_DOMAIN.to_string(),
        }
    }
}

impl UdpConfig {
    /// Create a test configuration
    ///
    /// The pulse interval is a day so background ticks never interfere
    /// with tests that drive `pulse()` by hand.
    pub fn test() -> Self {
        Self {
            client_name: "testclient".to_string(),
            client_version: "1".to_string(),
            request_timeout_secs: 1,
            pulse_interval_secs: 86_400,
            min_request_interval_ms: 0,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pulse_interval(&self) -> Duration {
        Duration::from_secs(self.pulse_interval_secs.max(1))
    }

    pub fn ping_frequency(&self) -> Duration {
        Duration::from_secs(self.ping_frequency_secs)
    }

    pub fn force_logout_period(&self) -> Duration {
        Duration::from_secs(self.force_logout_secs)
    }

    pub fn ban_reset_length(&self) -> Duration {
        Duration::from_secs_f64(self.ban_reset_hours.max(0.0) * 3600.0)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

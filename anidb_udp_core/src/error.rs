//! Error types for the AniDB UDP connection library
//!
//! Connection-state errors (`Banned`, `NotLoggedIn`, `Disposed`) are always
//! surfaced to callers. Transport and codec failures are wrapped as
//! [`Error::Protocol`], configuration problems as [`Error::Validation`].

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod validation;

pub use self::validation::ValidationError;
use crate::connection::BanType;
use crate::protocol::error::ProtocolError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the AniDB UDP connection library
#[derive(Error, Debug)]
pub enum Error {
    /// The client is banned; nothing was sent
    #[error("Banned from the AniDB {ban_type} API until {expires}")]
    Banned {
        ban_type: BanType,
        expires: DateTime<Utc>,
    },

    /// No valid session could be established
    #[error("Not logged in to AniDB")]
    NotLoggedIn,

    /// The transport has been torn down
    #[error("Connection has been disposed")]
    Disposed,

    /// Protocol related errors
    #[error(transparent)]
    Protocol(ProtocolError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// True for the connection-state errors a scheduler must react to
    pub fn is_connection_state(&self) -> bool {
        matches!(self, Self::Banned { .. } | Self::NotLoggedIn | Self::Disposed)
    }

    /// True when the underlying transport timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Protocol(err) if err.is_timeout())
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Disposed => Self::Disposed,
            other => Self::Protocol(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_banned_error_display() {
        let expires = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let error = Error::Banned {
            ban_type: BanType::Udp,
            expires,
        };
        let display = error.to_string();
        assert!(display.contains("UDP"));
        assert!(display.contains("2024-05-01 12:30:00"));
        assert!(error.is_connection_state());
    }

    #[test]
    fn test_disposed_protocol_error_maps_to_disposed() {
        let error: Error = ProtocolError::Disposed.into();
        assert!(matches!(error, Error::Disposed));
    }

    #[test]
    fn test_timeout_classification() {
        let error: Error = ProtocolError::Timeout(Duration::from_secs(20)).into();
        assert!(error.is_timeout());
        assert!(!error.is_connection_state());

        let error: Error = ProtocolError::unexpected_response("AUTH reply", "garbage").into();
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_invalid_configuration_error() {
        let error = Error::Validation(ValidationError::invalid_configuration(
            "server port must be positive",
        ));
        assert!(error.to_string().contains("Invalid configuration"));
        assert!(error.to_string().contains("server port"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}

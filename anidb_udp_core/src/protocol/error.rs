//! Protocol-specific error types
//!
//! This module defines the transport, codec and reply-shape errors raised
//! below the connection state machine.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply within the request timeout
    #[error("Connection timeout after {0:?}")]
    Timeout(Duration),

    /// Encoding error
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Decoding error
    #[error("Decoding error: {message}")]
    Decoding { message: String },

    /// Packet too large
    #[error("Packet size {size} exceeds maximum {max_size}")]
    PacketTooLarge { size: usize, max_size: usize },

    /// The server could not be resolved
    #[error("Failed to resolve server address '{address}': {reason}")]
    AddressResolution { address: String, reason: String },

    /// The reply did not have the shape the request expected
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// The socket has already been disposed
    #[error("UDP socket has been disposed")]
    Disposed,
}

impl ProtocolError {
    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a packet too large error
    pub fn packet_too_large(size: usize, max_size: usize) -> Self {
        Self::PacketTooLarge { size, max_size }
    }

    /// Create an address resolution error
    pub fn address_resolution(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AddressResolution {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an unexpected response error
    pub fn unexpected_response(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Check if this error means the server never answered
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Check if the server answered in a shape the request did not expect
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, Self::UnexpectedResponse { .. })
    }
}

/// Response code returned by AniDB server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCode(pub u16);

impl ResponseCode {
    pub const LOGIN_ACCEPTED: ResponseCode = ResponseCode(200);
    pub const LOGIN_ACCEPTED_NEW_VERSION: ResponseCode = ResponseCode(201);
    pub const LOGGED_OUT: ResponseCode = ResponseCode(203);
    pub const PONG: ResponseCode = ResponseCode(300);
    pub const LOGIN_FAILED: ResponseCode = ResponseCode(500);
    pub const LOGIN_FIRST: ResponseCode = ResponseCode(501);
    pub const CLIENT_BANNED: ResponseCode = ResponseCode(504);
    pub const INVALID_SESSION: ResponseCode = ResponseCode(506);
    pub const BANNED: ResponseCode = ResponseCode(555);
    pub const UNKNOWN_COMMAND: ResponseCode = ResponseCode(598);

    /// Check if the response code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self.0, 200..=299)
    }

    /// Check if the response code indicates an error
    pub fn is_error(&self) -> bool {
        self.0 >= 500
    }

    /// Check if the code accepts a login
    pub fn is_login_accepted(&self) -> bool {
        *self == Self::LOGIN_ACCEPTED || *self == Self::LOGIN_ACCEPTED_NEW_VERSION
    }

    /// Get a human-readable description of the response code
    pub fn description(&self) -> &'static str {
        match self.0 {
            200 => "LOGIN ACCEPTED",
            201 => "LOGIN ACCEPTED - NEW VERSION AVAILABLE",
            203 => "LOGGED OUT",
            300 => "PONG",
            403 => "NOT LOGGED IN",
            500 => "LOGIN FAILED",
            501 => "LOGIN FIRST",
            502 => "ACCESS DENIED",
            503 => "CLIENT VERSION OUTDATED",
            504 => "CLIENT BANNED",
            505 => "ILLEGAL INPUT OR ACCESS DENIED",
            506 => "INVALID SESSION",
            555 => "BANNED",
            598 => "UNKNOWN COMMAND",
            600 => "INTERNAL SERVER ERROR",
            601 => "ANIDB OUT OF SERVICE",
            602 => "SERVER BUSY",
            604 => "TIMEOUT - DELAY AND RESUBMIT",
            _ => "UNKNOWN RESPONSE CODE",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.description())
    }
}

//! Message definitions for the connection lifecycle
//!
//! Only the commands the connection handler issues itself live here: AUTH,
//! LOGOUT and PING. Domain commands are built by callers and travel through
//! the handler as plain text.

pub mod auth;

pub use auth::{AuthCommand, AuthResponse, LogoutCommand, PingCommand};

use crate::protocol::error::{ProtocolError, ResponseCode, Result};
use std::fmt;

/// Newline encoding for multiline values
pub const ENCODED_NEWLINE: &str = "<br />";

/// Base trait for commands the handler builds
pub trait AniDBCommand: fmt::Debug + Send + Sync {
    /// Get the command name
    fn name(&self) -> &str;

    /// Encode the command for transmission
    fn encode(&self) -> String;
}

/// Encode a value for AniDB protocol transmission
///
/// Option values use html form encoding plus newline escaping: `&` must be
/// sent as `&amp;`, newlines as `<br />`. Everything else goes out as-is.
pub fn encode_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 10);

    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '\n' => result.push_str(ENCODED_NEWLINE),
            '\r' => continue,
            _ => result.push(ch),
        }
    }

    result
}

/// Parse the first line of a reply into code and message
///
/// A reply whose first token is not a number was most likely sent in an
/// encoding other than the one requested, so it surfaces as
/// [`ProtocolError::UnexpectedResponse`].
pub fn parse_response_header(reply: &str) -> Result<(ResponseCode, String)> {
    let line = reply.lines().next().unwrap_or("").trim_end();
    let (code, message) = line.split_once(' ').unwrap_or((line, ""));

    let code = code
        .parse::<u16>()
        .map_err(|_| ProtocolError::unexpected_response("numeric response code", line))?;

    Ok((ResponseCode(code), message.to_string()))
}

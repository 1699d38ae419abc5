//! Authentication-related messages
//!
//! This module contains the AUTH, LOGOUT and PING command implementations
//! and the AUTH reply parser.

use crate::protocol::error::{ProtocolError, ResponseCode, Result};
use crate::protocol::messages::{AniDBCommand, encode_value, parse_response_header};
use crate::security::SecureString;

/// AUTH command for authenticating with the AniDB server
#[derive(Clone)]
pub struct AuthCommand {
    /// Username
    pub user: String,
    /// Password
    pub pass: SecureString,
    /// Protocol version
    pub protover: String,
    /// Client name
    pub client: String,
    /// Client version
    pub clientver: String,
    /// NAT mode (1 if behind NAT)
    pub nat: u8,
    /// Compression (1 to enable)
    pub comp: u8,
    /// Image server (1 to have the CDN domain returned)
    pub imgserver: u8,
    /// Ask the server to answer in UTF-16
    pub unicode: bool,
}

impl std::fmt::Debug for AuthCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCommand")
            .field("user", &self.user)
            .field("pass", &"***") // Never log passwords
            .field("protover", &self.protover)
            .field("client", &self.client)
            .field("clientver", &self.clientver)
            .field("nat", &self.nat)
            .field("comp", &self.comp)
            .field("imgserver", &self.imgserver)
            .field("unicode", &self.unicode)
            .finish()
    }
}

impl AuthCommand {
    /// Create a new AUTH command with required fields
    pub fn new(
        user: impl Into<String>,
        pass: impl Into<SecureString>,
        client: impl Into<String>,
        clientver: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
            protover: crate::protocol::PROTOCOL_VERSION.to_string(),
            client: client.into(),
            clientver: clientver.into(),
            nat: 1,
            comp: 0,
            imgserver: 1,
            unicode: false,
        }
    }

    /// Request UTF-16 replies
    pub fn with_unicode(mut self, unicode: bool) -> Self {
        self.unicode = unicode;
        self
    }
}

impl AniDBCommand for AuthCommand {
    fn name(&self) -> &str {
        "AUTH"
    }

    fn encode(&self) -> String {
        // AUTH user={str username}&pass={str password}&protover={int4 apiversion}&client={str clientname}&clientver={int4 clientversion}
        let mut command = format!(
            "AUTH user={}&pass={}&protover={}&client={}&clientver={}&nat={}&comp={}&imgserver={}",
            encode_value(&self.user),
            encode_value(&self.pass.expose_secret()),
            encode_value(&self.protover),
            encode_value(&self.client),
            encode_value(&self.clientver),
            self.nat,
            self.comp,
            self.imgserver,
        );
        if self.unicode {
            command.push_str("&enc=UTF-16");
        }
        command
    }
}

/// Response to AUTH command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// Response code
    pub code: ResponseCode,
    /// Response message, without session key and NAT address
    pub message: String,
    /// Session tag (if successful)
    pub session: Option<String>,
    /// Public address as seen by the server, when NAT mode is on
    pub nat_address: Option<String>,
    /// Image CDN domain (if successful and requested)
    pub image_server: Option<String>,
}

impl AuthResponse {
    /// Parse an AUTH reply
    ///
    /// Accepted logins look like `200 {session} [{ip:port}] LOGIN ACCEPTED`
    /// followed by the image server on the next line. A reply that does not
    /// start with a response code, or an UNKNOWN COMMAND reply, means the
    /// server read the request in a different encoding and is reported as
    /// [`ProtocolError::UnexpectedResponse`].
    pub fn parse(reply: &str) -> Result<Self> {
        let (code, message) = parse_response_header(reply)?;

        if code == ResponseCode::UNKNOWN_COMMAND {
            return Err(ProtocolError::unexpected_response(
                "AUTH reply",
                code.to_string(),
            ));
        }

        let mut response = Self {
            code,
            message: message.clone(),
            session: None,
            nat_address: None,
            image_server: None,
        };

        if code.is_login_accepted() {
            let mut parts = message.split_whitespace();
            let session = parts
                .next()
                .filter(|token| *token != "LOGIN")
                .ok_or_else(|| ProtocolError::missing_field("session"))?;
            response.session = Some(session.to_string());

            let rest: Vec<&str> = parts.collect();
            match rest.split_first() {
                Some((address, tail)) if address.contains(':') => {
                    response.nat_address = Some(address.to_string());
                    response.message = tail.join(" ");
                }
                _ => response.message = rest.join(" "),
            }

            response.image_server = reply
                .lines()
                .nth(1)
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string);
        }

        Ok(response)
    }
}

/// LOGOUT command
#[derive(Debug, Clone)]
pub struct LogoutCommand {
    /// Session tag
    pub session: String,
}

impl LogoutCommand {
    /// Create a new LOGOUT command
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
        }
    }
}

impl AniDBCommand for LogoutCommand {
    fn name(&self) -> &str {
        "LOGOUT"
    }

    fn encode(&self) -> String {
        format!("LOGOUT s={}", self.session)
    }
}

/// PING command, used as keepalive
#[derive(Debug, Clone, Default)]
pub struct PingCommand;

impl PingCommand {
    /// Create a new PING command
    pub fn new() -> Self {
        Self
    }
}

impl AniDBCommand for PingCommand {
    fn name(&self) -> &str {
        "PING"
    }

    fn encode(&self) -> String {
        "PING".to_string()
    }
}

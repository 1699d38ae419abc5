//! Transport layer for UDP communication
//!
//! The connection handler never touches a socket directly. It talks to a
//! [`SocketHandler`], which performs one request/reply exchange at a time,
//! and asks a [`TransportFactory`] for a fresh one whenever it (re)initializes.

mod socket;

pub use socket::{TransportStats, UdpSocketHandler, UdpTransportFactory};

use crate::protocol::codec::TextEncoding;
use crate::protocol::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Where and how to reach the AniDB UDP API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Server host name or IP address
    pub server_address: String,
    /// Server UDP port
    pub server_port: u16,
    /// Local UDP port to bind
    pub client_port: u16,
    /// How long to wait for a reply
    pub request_timeout: Duration,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            server_address: crate::protocol::DEFAULT_SERVER.to_string(),
            server_port: crate::protocol::DEFAULT_PORT,
            client_port: crate::protocol::DEFAULT_CLIENT_PORT,
            request_timeout: Duration::from_secs(20),
        }
    }
}

/// A request/reply datagram channel to the AniDB server
#[async_trait]
pub trait SocketHandler: Send + Sync {
    /// Open the socket and report whether the server is reachable
    async fn try_connect(&self) -> bool;

    /// Send one datagram and wait for the reply
    ///
    /// Timeouts surface as [`crate::protocol::ProtocolError::Timeout`].
    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// True while an exchange is in flight
    fn is_locked(&self) -> bool;

    /// Close the socket; every later send fails
    async fn dispose(&self);

    /// Encoding of replies, if the transport knows it
    fn reply_encoding(&self) -> Option<TextEncoding> {
        None
    }
}

/// Builds socket handlers for an endpoint
pub trait TransportFactory: Send + Sync {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn SocketHandler>;
}

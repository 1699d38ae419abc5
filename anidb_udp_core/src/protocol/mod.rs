//! AniDB UDP Protocol Implementation
//!
//! This module implements the request/response envelope of the AniDB UDP API:
//! - `transport`: socket collaborator traits and the tokio UDP implementation
//! - `codec`: text encoding selection, BOM-aware decoding and log masking
//! - `messages`: AUTH, LOGOUT and PING commands and login reply parsing

pub mod codec;
pub mod error;
pub mod messages;
pub mod transport;

pub use codec::{Codec, TextEncoding, mask_credentials};
pub use error::{ProtocolError, ResponseCode, Result};
pub use transport::{
    Endpoint, SocketHandler, TransportFactory, TransportStats, UdpSocketHandler, UdpTransportFactory,
};

/// Protocol version supported by this implementation
pub const PROTOCOL_VERSION: &str = "3";

/// Maximum UDP packet size (considering PPPoE)
pub const MAX_PACKET_SIZE: usize = 1400;

/// Default AniDB server address
pub const DEFAULT_SERVER: &str = "api.anidb.net";

/// Default AniDB UDP port
pub const DEFAULT_PORT: u16 = 9000;

/// Default local UDP port
pub const DEFAULT_CLIENT_PORT: u16 = 4556;

/// Fallback image CDN domain until a login reply names one
pub const DEFAULT_IMAGE_DOMAIN: &str = "cdn.anidb.net";

/// Rate limit: maximum requests per second (0.5 req/sec = 1 req per 2 seconds)
pub const RATE_LIMIT_REQUESTS_PER_SECOND: f64 = 0.5;

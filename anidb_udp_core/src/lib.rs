//! AniDB UDP Connection Library
//!
//! This is the connection layer for the AniDB UDP API: authentication,
//! session tracking, ban detection, idle keepalive and reconnection after
//! transport failures. Domain commands are built and parsed by callers;
//! [`UdpConnectionHandler::execute`] carries their text to AniDB and back.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;
pub mod rate_limit;
pub mod security;
pub mod settings;

// Re-export main types
pub use config::UdpConfig;
pub use connection::{
    BanPause, BanTimer, BanType, ConnectionPhase, ConnectionStatus, UdpConnectionHandler,
};
pub use error::{Error, Result, ValidationError};
pub use events::ConnectionEvent;
pub use protocol::{
    Endpoint, ProtocolError, ResponseCode, SocketHandler, TextEncoding, TransportFactory,
    UdpTransportFactory,
};
pub use rate_limit::{IntervalRateLimiter, RateLimiter};
pub use security::SecureString;
pub use settings::{AniDbSettings, MemorySettingsProvider, SettingsProvider};

//! Builders for AniDB replies and wired-up handlers

mod connection;
mod replies;

pub use connection::TestConnection;
pub use replies::{
    login_accepted, login_failed, pong, unknown_command, utf16_be, zero_reply,
};

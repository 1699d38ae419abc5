//! AniDB UDP command line library
//!
//! Configuration loading and the one-shot sessions behind the `anidb-udp`
//! subcommands.

pub mod config;
pub mod session;

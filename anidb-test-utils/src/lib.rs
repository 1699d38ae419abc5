//! Test utilities for the AniDB UDP connection handler
//!
//! This crate provides a scripted mock transport, a counting rate limiter,
//! reply fixtures and a pre-wired handler for integration tests.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::TestConnection;
pub use mocks::{CountingRateLimiter, MockReply, MockSocketHandler, MockTransportFactory};

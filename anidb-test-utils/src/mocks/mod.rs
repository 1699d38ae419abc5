//! Mock implementations for testing

mod rate_limit;
mod transport;

pub use rate_limit::CountingRateLimiter;
pub use transport::{MockReply, MockSocketHandler, MockTransportFactory};

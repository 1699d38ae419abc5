//! Scripted mock transport for testing the connection handler

use anidb_udp_core::protocol::error::Result;
use anidb_udp_core::{Endpoint, ProtocolError, SocketHandler, TransportFactory};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted answer to a send
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Reply bytes, returned as-is
    Bytes(Vec<u8>),
    /// The server never answers
    Timeout,
    /// Socket-level failure other than a timeout
    Failure(String),
}

impl MockReply {
    /// Reply text sent as UTF-8
    pub fn text(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

/// Mock AniDB server shared by every socket a [`MockTransportFactory`] creates
///
/// Scripted replies are consumed in order across reconnections. Once the
/// script runs out, the default reply (if any) answers every send; without
/// one, sends fail.
///
/// # Examples
///
/// ```rust,no_run
/// use anidb_test_utils::{MockReply, MockTransportFactory};
///
/// let network = MockTransportFactory::new();
/// network.push_reply(MockReply::text("200 abc123 LOGIN ACCEPTED\nimg.example"));
/// network.set_default_reply(MockReply::text("300 PONG"));
/// ```
#[derive(Clone, Default)]
pub struct MockTransportFactory {
    behavior: Arc<Mutex<MockBehavior>>,
}

#[derive(Debug, Default)]
struct MockBehavior {
    script: VecDeque<MockReply>,
    default_reply: Option<MockReply>,
    unreachable: bool,
    locked: bool,
    response_delay: Option<Duration>,
    sent: Vec<Vec<u8>>,
    endpoints: Vec<Endpoint>,
    disposed: usize,
}

impl MockTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn behavior(&self) -> std::sync::MutexGuard<'_, MockBehavior> {
        self.behavior
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue the next reply
    pub fn push_reply(&self, reply: MockReply) {
        self.behavior().script.push_back(reply);
    }

    /// Answer for sends once the script is exhausted
    pub fn set_default_reply(&self, reply: MockReply) {
        self.behavior().default_reply = Some(reply);
    }

    /// Make `try_connect` report the server as unreachable
    pub fn set_unreachable(&self, unreachable: bool) {
        self.behavior().unreachable = unreachable;
    }

    /// Force `is_locked` on every socket
    pub fn set_locked(&self, locked: bool) {
        self.behavior().locked = locked;
    }

    /// Wait this long (tokio time) before answering
    pub fn set_response_delay(&self, delay: Duration) {
        self.behavior().response_delay = Some(delay);
    }

    /// Raw payloads received so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.behavior().sent.clone()
    }

    /// Payloads received so far, decoded as UTF-16BE or UTF-8
    pub fn sent_commands(&self) -> Vec<String> {
        self.behavior()
            .sent
            .iter()
            .map(|payload| decode_payload(payload))
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.behavior().sent.len()
    }

    /// Number of sockets created so far
    pub fn connections_created(&self) -> usize {
        self.behavior().endpoints.len()
    }

    /// Endpoint of the most recent socket
    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.behavior().endpoints.last().cloned()
    }

    /// Number of sockets disposed so far
    pub fn disposed_count(&self) -> usize {
        self.behavior().disposed
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn SocketHandler> {
        self.behavior().endpoints.push(endpoint.clone());
        Arc::new(MockSocketHandler {
            behavior: Arc::clone(&self.behavior),
            disposed: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            request_timeout: endpoint.request_timeout,
        })
    }
}

/// Socket created by [`MockTransportFactory`]
pub struct MockSocketHandler {
    behavior: Arc<Mutex<MockBehavior>>,
    disposed: AtomicBool,
    in_flight: AtomicBool,
    request_timeout: Duration,
}

impl MockSocketHandler {
    fn behavior(&self) -> std::sync::MutexGuard<'_, MockBehavior> {
        self.behavior
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SocketHandler for MockSocketHandler {
    async fn try_connect(&self) -> bool {
        !self.disposed.load(Ordering::Acquire) && !self.behavior().unreachable
    }

    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ProtocolError::Disposed);
        }

        let (reply, delay) = {
            let mut behavior = self.behavior();
            behavior.sent.push(payload.to_vec());
            let reply = behavior
                .script
                .pop_front()
                .or_else(|| behavior.default_reply.clone());
            (reply, behavior.response_delay)
        };

        self.in_flight.store(true, Ordering::Release);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.store(false, Ordering::Release);

        match reply {
            Some(MockReply::Bytes(bytes)) => Ok(bytes),
            Some(MockReply::Timeout) => Err(ProtocolError::Timeout(self.request_timeout)),
            Some(MockReply::Failure(message)) => Err(ProtocolError::Io(std::io::Error::other(message))),
            None => Err(ProtocolError::Io(std::io::Error::other(
                "mock transport has no scripted reply",
            ))),
        }
    }

    fn is_locked(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) || self.behavior().locked
    }

    async fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.behavior().disposed += 1;
        }
    }
}

fn decode_payload(payload: &[u8]) -> String {
    if payload.first() == Some(&0) && payload.len() % 2 == 0 {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(payload).into_owned()
    }
}

//! Low-level UDP socket operations
//!
//! This module provides a wrapper around Tokio's UdpSocket that serializes
//! request/reply exchanges, as the AniDB protocol expects.

use super::{Endpoint, SocketHandler, TransportFactory};
use crate::protocol::error::{ProtocolError, Result};
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Transport statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportStats {
    /// Total packets sent
    pub packets_sent: u64,
    /// Total packets received
    pub packets_received: u64,
    /// Exchanges that ran out of time
    pub timeouts: u64,
}

#[derive(Debug, Default)]
struct AtomicStats {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    timeouts: AtomicU64,
}

/// UDP transport wrapper with protocol-specific functionality
///
/// The socket lives behind an async mutex that is held for a whole
/// send-then-receive exchange; a held mutex is what `is_locked` reports.
pub struct UdpSocketHandler {
    endpoint: Endpoint,
    socket: Mutex<Option<UdpSocket>>,
    disposed: AtomicBool,
    stats: AtomicStats,
}

impl UdpSocketHandler {
    /// Create a new handler; nothing is opened until the first use
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            socket: Mutex::new(None),
            disposed: AtomicBool::new(false),
            stats: AtomicStats::default(),
        }
    }

    /// Get transport statistics
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            packets_sent: self.stats.packets_sent.load(Ordering::Relaxed),
            packets_received: self.stats.packets_received.load(Ordering::Relaxed),
            timeouts: self.stats.timeouts.load(Ordering::Relaxed),
        }
    }

    async fn open(endpoint: &Endpoint) -> Result<UdpSocket> {
        let address = format!("{}:{}", endpoint.server_address, endpoint.server_port);
        debug!("Resolving server address: {address}");
        let server_addr = lookup_host(&address)
            .await
            .map_err(|e| ProtocolError::address_resolution(&address, e.to_string()))?
            .next()
            .ok_or_else(|| ProtocolError::address_resolution(&address, "no addresses found"))?;

        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], endpoint.client_port))
        } else {
            SocketAddr::from(([0u16; 8], endpoint.client_port))
        };

        debug!("Binding UDP socket to {bind_addr}");
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server_addr).await?;
        debug!("Socket connected to server {server_addr}");
        Ok(socket)
    }

    fn record_timeout(&self) -> ProtocolError {
        self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            "No reply from AniDB within {:?}",
            self.endpoint.request_timeout
        );
        ProtocolError::Timeout(self.endpoint.request_timeout)
    }
}

#[async_trait]
impl SocketHandler for UdpSocketHandler {
    async fn try_connect(&self) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }

        let mut guard = self.socket.lock().await;
        match Self::open(&self.endpoint).await {
            Ok(socket) => {
                *guard = Some(socket);
                true
            }
            Err(e) => {
                warn!("AniDB UDP server is not reachable: {e}");
                false
            }
        }
    }

    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>> {
        trace!("UdpSocketHandler::send called with {} bytes", payload.len());

        if payload.len() > crate::protocol::MAX_PACKET_SIZE {
            return Err(ProtocolError::packet_too_large(
                payload.len(),
                crate::protocol::MAX_PACKET_SIZE,
            ));
        }

        let mut guard = self.socket.lock().await;
        if self.disposed.load(Ordering::Acquire) {
            return Err(ProtocolError::Disposed);
        }
        if guard.is_none() {
            *guard = Some(Self::open(&self.endpoint).await?);
        }
        let Some(socket) = guard.as_ref() else {
            return Err(ProtocolError::Disposed);
        };

        timeout(self.endpoint.request_timeout, socket.send(payload))
            .await
            .map_err(|_| self.record_timeout())??;
        self.stats.packets_sent.fetch_add(1, Ordering::Relaxed);

        let mut buffer = vec![0u8; crate::protocol::MAX_PACKET_SIZE];
        let size = timeout(self.endpoint.request_timeout, socket.recv(&mut buffer))
            .await
            .map_err(|_| self.record_timeout())??;
        self.stats.packets_received.fetch_add(1, Ordering::Relaxed);

        buffer.truncate(size);
        trace!("Received {size} bytes");
        Ok(buffer)
    }

    fn is_locked(&self) -> bool {
        self.socket.try_lock().is_err()
    }

    async fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        // Waits for an in-flight exchange, which is bounded by the request timeout
        let mut guard = self.socket.lock().await;
        if guard.take().is_some() {
            debug!("AniDB UDP socket disposed");
        }
    }
}

/// Factory for real UDP socket handlers
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransportFactory;

impl TransportFactory for UdpTransportFactory {
    fn create(&self, endpoint: &Endpoint) -> Arc<dyn SocketHandler> {
        Arc::new(UdpSocketHandler::new(endpoint.clone()))
    }
}

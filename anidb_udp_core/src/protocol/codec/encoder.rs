//! Command encoder for the AniDB protocol
//!
//! This module handles encoding of command text into datagram bytes.

use super::TextEncoding;
use crate::protocol::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};

/// Encoder for AniDB protocol commands
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    max_packet_size: usize,
}

impl Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            max_packet_size: crate::protocol::MAX_PACKET_SIZE,
        }
    }

    /// Encode a command string into bytes
    pub fn encode(&self, command: &str, encoding: TextEncoding) -> Result<Bytes> {
        if command.is_empty() {
            debug!("Attempted to encode empty command");
            return Err(ProtocolError::encoding("Empty command"));
        }

        let width = if encoding.is_wide() { 2 } else { 1 };
        let mut buffer = BytesMut::with_capacity(command.len() * width);

        match encoding {
            TextEncoding::Ascii => {
                for ch in command.chars() {
                    buffer.put_u8(if ch.is_ascii() { ch as u8 } else { b'?' });
                }
            }
            TextEncoding::Utf8 => buffer.put(command.as_bytes()),
            TextEncoding::Utf16Be => {
                for unit in command.encode_utf16() {
                    buffer.put_u16(unit);
                }
            }
            TextEncoding::Utf16Le => {
                for unit in command.encode_utf16() {
                    buffer.put_u16_le(unit);
                }
            }
        }

        // AniDB parses on packet boundaries, no terminator is needed
        if buffer.len() > self.max_packet_size {
            debug!(
                "Command too large: {} bytes (max: {})",
                buffer.len(),
                self.max_packet_size
            );
            return Err(ProtocolError::packet_too_large(
                buffer.len(),
                self.max_packet_size,
            ));
        }

        let result = buffer.freeze();
        trace!("Encoded {} bytes as {encoding}", result.len());
        Ok(result)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

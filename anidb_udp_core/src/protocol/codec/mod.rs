//! Message encoding and decoding
//!
//! This module handles the conversion between command text and datagram
//! bytes. Commands go out either as ASCII or as big-endian UTF-16; replies
//! come back in whatever encoding the server picked and are decoded by
//! sniffing their leading bytes.

mod decoder;
mod encoder;
mod mask;

pub use decoder::{Decoder, detect_encoding};
pub use encoder::Encoder;
pub use mask::mask_credentials;

use crate::protocol::error::Result;
use bytes::Bytes;
use log::{debug, trace};
use std::fmt;

/// Character encoding used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// 7-bit ASCII, unrepresentable characters become `?`
    Ascii,
    /// UTF-8
    Utf8,
    /// UTF-16, big endian
    Utf16Be,
    /// UTF-16, little endian
    Utf16Le,
}

impl TextEncoding {
    /// Encoding for an outgoing command
    pub fn for_request(use_unicode: bool) -> Self {
        if use_unicode {
            TextEncoding::Utf16Be
        } else {
            TextEncoding::Ascii
        }
    }

    /// Check if this is one of the wide encodings
    pub fn is_wide(&self) -> bool {
        matches!(self, TextEncoding::Utf16Be | TextEncoding::Utf16Le)
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Ascii => write!(f, "ASCII"),
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Utf16Be => write!(f, "UTF-16BE"),
            TextEncoding::Utf16Le => write!(f, "UTF-16LE"),
        }
    }
}

/// Codec for encoding commands and decoding replies
#[derive(Debug, Default, Clone, Copy)]
pub struct Codec {
    encoder: Encoder,
    decoder: Decoder,
}

impl Codec {
    /// Create a new codec instance
    pub fn new() -> Self {
        Self {
            encoder: Encoder::new(),
            decoder: Decoder::new(),
        }
    }

    /// Encode a command string into bytes
    pub fn encode(&self, command: &str, encoding: TextEncoding) -> Result<Bytes> {
        debug!("Codec encoding command as {encoding}");
        self.encoder.encode(command, encoding)
    }

    /// Decode reply bytes into text, without a leading byte-order mark
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        debug!("Codec decoding {} bytes", data.len());
        let decoded = self.decoder.decode(data)?;
        trace!("Decoded {} characters", decoded.chars().count());
        Ok(decoded)
    }

    /// Decode reply bytes in an encoding reported by the transport
    pub fn decode_with(&self, data: &[u8], encoding: TextEncoding) -> Result<String> {
        self.decoder.decode_with(data, encoding)
    }
}

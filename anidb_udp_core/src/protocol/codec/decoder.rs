//! Reply decoder for the AniDB protocol
//!
//! This module handles decoding of reply datagrams into strings. The server
//! answers in the encoding negotiated at login, which after an unclean
//! shutdown may not be the one the client asked for, so the encoding is
//! taken from the bytes themselves.

use super::TextEncoding;
use crate::protocol::error::{ProtocolError, Result};
use log::{debug, trace};

const BOM: char = '\u{FEFF}';

/// Detect the encoding of a reply from its leading bytes
///
/// A byte-order mark wins. Without one, a leading zero byte followed by a
/// non-zero byte is read as big-endian UTF-16 (the server never starts a
/// reply with NUL otherwise). `None` means the bytes carry no hint.
pub fn detect_encoding(data: &[u8]) -> Option<TextEncoding> {
    match data {
        [0xEF, 0xBB, 0xBF, ..] => Some(TextEncoding::Utf8),
        [0xFE, 0xFF, ..] => Some(TextEncoding::Utf16Be),
        [0xFF, 0xFE, ..] => Some(TextEncoding::Utf16Le),
        [0x00, second, ..] if *second != 0 => Some(TextEncoding::Utf16Be),
        _ => None,
    }
}

/// Decoder for AniDB protocol replies
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    fallback: TextEncoding,
}

impl Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            fallback: TextEncoding::Utf8,
        }
    }

    /// Decode bytes into a reply string with any leading BOM removed
    pub fn decode(&self, data: &[u8]) -> Result<String> {
        self.decode_with(data, detect_encoding(data).unwrap_or(self.fallback))
    }

    /// Decode bytes in a known encoding, removing any leading BOM
    pub fn decode_with(&self, data: &[u8], encoding: TextEncoding) -> Result<String> {
        if data.is_empty() {
            return Err(ProtocolError::decoding("Empty reply"));
        }

        trace!("Decoding {} bytes as {encoding}", data.len());

        let mut decoded = match encoding {
            TextEncoding::Utf16Be => decode_utf16(data, u16::from_be_bytes),
            TextEncoding::Utf16Le => decode_utf16(data, u16::from_le_bytes),
            TextEncoding::Ascii | TextEncoding::Utf8 => {
                String::from_utf8_lossy(data).into_owned()
            }
        };

        if decoded.starts_with(BOM) {
            debug!("Stripping byte-order mark from reply");
            decoded.remove(0);
        }

        Ok(decoded)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_utf16(data: &[u8], read: fn([u8; 2]) -> u16) -> String {
    if data.len() % 2 != 0 {
        debug!("Odd-length UTF-16 reply, dropping trailing byte");
    }
    let units = data.chunks_exact(2).map(|pair| read([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

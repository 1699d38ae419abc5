//! AniDB reply fixtures

use crate::mocks::MockReply;

/// `200 {session} LOGIN ACCEPTED` with the image server on the second line
pub fn login_accepted(session: &str, image_server: &str) -> MockReply {
    MockReply::text(&format!("200 {session} LOGIN ACCEPTED\n{image_server}"))
}

pub fn login_failed() -> MockReply {
    MockReply::text("500 LOGIN FAILED")
}

/// What the server answers when it reads the request in another encoding
pub fn unknown_command() -> MockReply {
    MockReply::text("598 UNKNOWN COMMAND")
}

pub fn pong() -> MockReply {
    MockReply::text("300 PONG")
}

/// A reply of `len` zero bytes
pub fn zero_reply(len: usize) -> MockReply {
    MockReply::Bytes(vec![0; len])
}

/// Reply text encoded as UTF-16BE with a byte-order mark
pub fn utf16_be(text: &str) -> MockReply {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    MockReply::Bytes(bytes)
}

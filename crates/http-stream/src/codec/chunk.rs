//! Chunked transfer coding framing, see
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! A chunk goes on the wire as `<hex-size>\r\n<data>\r\n`; the body ends with the
//! zero-size chunk followed by an empty trailer section, `0\r\n\r\n`.

use bytes::{BufMut, Bytes, BytesMut};

/// Line terminator closing a chunk preamble and following each chunk's data
pub const RECORD_TERMINATOR: &[u8] = b"\r\n";

/// The zero-size chunk plus empty trailer that terminates a chunked body
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Renders the chunk-size line for `count` bytes as lowercase hex.
///
/// With `is_final` an extra line terminator follows, which turns a zero `count`
/// into the body terminator.
pub fn size_preamble(count: usize, is_final: bool) -> Bytes {
    let mut dst = BytesMut::with_capacity(preamble_len(count, is_final));
    put_size_preamble(count, is_final, &mut dst);
    dst.freeze()
}

/// Appends the chunk-size line for `count` to `dst`
pub fn put_size_preamble(count: usize, is_final: bool, dst: &mut BytesMut) {
    const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

    dst.reserve(preamble_len(count, is_final));
    for digit in (0..hex_digits(count)).rev() {
        dst.put_u8(HEX_DIGITS[(count >> (digit * 4)) & 0xf]);
    }
    dst.put_slice(RECORD_TERMINATOR);
    if is_final {
        dst.put_slice(RECORD_TERMINATOR);
    }
}

/// Number of bytes [`size_preamble`] produces for `count`
pub fn preamble_len(count: usize, is_final: bool) -> usize {
    let terminators = if is_final { 2 } else { 1 };
    hex_digits(count) + terminators * RECORD_TERMINATOR.len()
}

fn hex_digits(count: usize) -> usize {
    let mut digits = 1;
    let mut rest = count >> 4;
    while rest > 0 {
        digits += 1;
        rest >>= 4;
    }
    digits
}

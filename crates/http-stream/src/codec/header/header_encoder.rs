//! HTTP header encoder implementation for serializing HTTP response headers
//!
//! This module turns a [`ResponseHead`] into the raw header block that precedes a
//! response body: status line, header fields and the terminating blank line. The
//! framing header (`Content-Length` or `Transfer-Encoding`) is rewritten from the
//! [`PayloadSize`] so it always agrees with the body stream's encoding mode.

use crate::protocol::{PayloadSize, ResponseHead};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
pub(crate) const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED_VALUE: HeaderValue = HeaderValue::from_static("chunked");
const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");

/// Encoder for HTTP response headers implementing the [`Encoder`] trait.
///
/// This encoder serializes a [`ResponseHead`] and [`PayloadSize`] into raw bytes,
/// automatically handling Content-Length or Transfer-Encoding headers based on the
/// payload size.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl HeaderEncoder {
    /// Serializes `head` for an HTTP/1.x connection.
    ///
    /// Unlike [`Encoder::encode`] this can't fail: an HTTP/1.0 head keeps its status
    /// line version and every other version is written as HTTP/1.1.
    pub fn encode_http1(head: ResponseHead, payload_size: PayloadSize, dst: &mut BytesMut) {
        let version: &[u8] = match head.version() {
            Version::HTTP_10 => b"HTTP/1.0",
            _ => b"HTTP/1.1",
        };
        write_header_block(version, head, payload_size, dst);
    }
}

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = io::Error;

    /// Encodes HTTP response headers into the provided bytes buffer.
    ///
    /// # Errors
    ///
    /// Returns an `Unsupported` error if the head carries a version other than
    /// HTTP/1.0 or HTTP/1.1. Nothing is written to `dst` in that case.
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;

        let version: &[u8] = match head.version() {
            Version::HTTP_11 => b"HTTP/1.1",
            Version::HTTP_10 => b"HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported));
            }
        };

        write_header_block(version, head, payload_size, dst);
        Ok(())
    }
}

fn write_header_block(version: &[u8], mut head: ResponseHead, payload_size: PayloadSize, dst: &mut BytesMut) {
    dst.reserve(INIT_HEADER_SIZE);
    dst.put_slice(version);
    dst.put_u8(b' ');
    dst.put_slice(head.status().as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(head.status().canonical_reason().unwrap_or("").as_bytes());
    dst.put_slice(b"\r\n");

    // Set appropriate content length or transfer encoding header
    let headers = head.headers_mut();
    match payload_size {
        PayloadSize::Length(n) => {
            headers.remove(header::TRANSFER_ENCODING);
            headers.insert(header::CONTENT_LENGTH, n.into());
        }
        PayloadSize::Chunked => {
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(header::TRANSFER_ENCODING, CHUNKED_VALUE);
        }
        PayloadSize::Empty => {
            headers.remove(header::TRANSFER_ENCODING);
            headers.insert(header::CONTENT_LENGTH, ZERO_VALUE);
        }
    }

    // Write all headers
    for (header_name, header_value) in head.headers() {
        dst.put_slice(header_name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(header_value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}

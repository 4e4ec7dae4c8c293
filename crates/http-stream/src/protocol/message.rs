/// Represents the size information of an HTTP payload.
///
/// The value is decided before the header block is serialized and determines
/// both the framing headers and the [`EncodingMode`] of the body stream:
/// - Known length: identity body announced with `Content-Length`
/// - Chunked: body framed with chunked transfer encoding
/// - Empty: no payload, `Content-Length: 0`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }

    /// The body framing implied by this payload size
    #[inline]
    pub fn encoding_mode(&self) -> EncodingMode {
        match self {
            PayloadSize::Chunked => EncodingMode::Chunked,
            PayloadSize::Length(_) | PayloadSize::Empty => EncodingMode::Identity,
        }
    }
}

/// Body framing of a response, fixed for the lifetime of a body stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EncodingMode {
    /// raw payload bytes, length governed by a declared content length
    #[default]
    Identity,
    /// every write is wrapped as `<hex-size>\r\n<data>\r\n`, close emits `0\r\n\r\n`
    Chunked,
}

impl EncodingMode {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, EncodingMode::Chunked)
    }
}

/// Whether transport failures reach the caller of a body stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// transport failures are returned as [`StreamError::Io`](crate::protocol::StreamError::Io)
    #[default]
    Propagate,
    /// transport failures end the operation early and are reported as
    /// [`WriteStatus::Suppressed`](crate::protocol::WriteStatus::Suppressed)
    Suppress,
}

impl ErrorPolicy {
    #[inline]
    pub fn is_suppress(&self) -> bool {
        matches!(self, ErrorPolicy::Suppress)
    }
}

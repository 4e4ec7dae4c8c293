use std::io;
use thiserror::Error;

/// Errors surfaced by [`ResponseBodyStream`](crate::connection::ResponseBodyStream).
///
/// `InvalidState` and `NotSupported` signal misuse of the stream and always reach
/// the caller. `Io` wraps a transport failure and is only returned when the stream
/// runs with [`ErrorPolicy::Propagate`](crate::protocol::ErrorPolicy::Propagate).
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid stream state: {reason}")]
    InvalidState { reason: String },

    #[error("operation not supported by response body stream: {operation}")]
    NotSupported { operation: &'static str },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    pub fn invalid_state<S: ToString>(str: S) -> Self {
        Self::InvalidState { reason: str.to_string() }
    }

    pub fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    #[inline]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, StreamError::InvalidState { .. })
    }

    #[inline]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, StreamError::NotSupported { .. })
    }

    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, StreamError::Io { .. })
    }
}

/// Outcome of a write or close that did not fail the caller.
///
/// Under [`ErrorPolicy::Suppress`](crate::protocol::ErrorPolicy::Suppress) a transport
/// failure ends the operation early and is handed back here instead of as an error,
/// the caller may inspect it or drop it.
#[derive(Debug)]
pub enum WriteStatus {
    /// every segment of the operation reached the transport
    Written,
    /// a transport write failed and the rest of the operation was skipped
    Suppressed(io::Error),
}

impl WriteStatus {
    #[inline]
    pub fn is_written(&self) -> bool {
        matches!(self, WriteStatus::Written)
    }

    #[inline]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, WriteStatus::Suppressed(_))
    }

    /// Returns the swallowed transport error, if any
    pub fn into_suppressed(self) -> Option<io::Error> {
        match self {
            WriteStatus::Written => None,
            WriteStatus::Suppressed(e) => Some(e),
        }
    }
}

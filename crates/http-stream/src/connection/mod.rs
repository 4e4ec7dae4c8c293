//! Response body streaming over a connection transport
//!
//! # Components
//!
//! - [`ResponseBodyStream`]: write-only stream over one response body that:
//!   - Sends the header block lazily, once, coalesced with the first write
//!   - Frames writes with chunked transfer encoding when requested
//!   - Terminates the body on close
//!   - Propagates or suppresses transport failures per [`ErrorPolicy`](crate::protocol::ErrorPolicy)
//! - [`Transport`]: the ordered byte sink the stream writes to
//! - [`IoTransport`]: a [`Transport`] over any tokio `AsyncWrite`

mod body_stream;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use body_stream::{PendingWrite, ResponseBodyStream, StreamConfig};
pub use transport::{IoTransport, Transport, WriteHandle};

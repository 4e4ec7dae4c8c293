//! The write side of an HTTP/1.1 response body
//!
//! This crate sits between code producing a response body and the raw transport
//! of a persistent connection. It sends the response header block lazily and
//! exactly once, merges it with the first body write so small responses leave in
//! a single transport write, frames the body with chunked transfer encoding when
//! requested, and terminates it correctly on close.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::{Response, StatusCode};
//! use tokio::net::TcpStream;
//! use tracing::error;
//! use micro_http_stream::connection::IoTransport;
//! use micro_http_stream::protocol::{ErrorPolicy, PayloadSize, ResponseState};
//!
//! # async fn serve(tcp_stream: TcpStream) -> Result<(), micro_http_stream::protocol::StreamError> {
//! let (_reader, writer) = tcp_stream.into_split();
//!
//! let head = Response::builder().status(StatusCode::OK).body(()).unwrap();
//! let response = Arc::new(ResponseState::new(head, PayloadSize::Chunked));
//! let mut body = response.body_stream(IoTransport::new(writer), ErrorPolicy::Propagate);
//!
//! // header block, "d\r\nHello World!\n" in one transport write, then "\r\n"
//! body.write(b"Hello World!\n").await?;
//!
//! // "0\r\n\r\n"
//! if let Err(e) = body.close().await {
//!     error!(cause = %e, "client went away before the body was complete");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: chunk framing, header block serialization and write coalescing
//! - [`protocol`]: encoding modes, error policy, the header coordinator contract and errors
//! - [`connection`]: the transport contract and the response body stream
//!
//! # Wire format
//!
//! Chunked bodies follow [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1):
//!
//! ```text
//! <hex-size>\r\n
//! <size bytes of payload>\r\n
//! ...
//! 0\r\n
//! \r\n
//! ```
//!
//! Identity bodies are the header block followed by the raw payload; their length
//! is declared by the `Content-Length` header and not enforced here.
//!
//! # Error Handling
//!
//! - [`protocol::StreamError`]: misuse of a stream (`InvalidState`, `NotSupported`)
//!   or a propagated transport failure (`Io`)
//! - [`protocol::WriteStatus`]: reports transport failures swallowed under
//!   [`protocol::ErrorPolicy::Suppress`]
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - One in-flight write per stream, nothing is buffered across calls
//! - No trailer fields, the chunked body ends with an empty trailer section

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

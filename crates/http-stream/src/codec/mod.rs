//! Wire framing for the response write path
//!
//! - [`chunk`]: chunk-size preambles and terminators of the chunked transfer coding
//! - [`HeaderEncoder`]: serializes a response head into the header block
//! - [`WritePlan`]: coalesces header block, chunk preamble and payload into as few
//!   transport writes as possible
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_http_stream::codec::{Coalesce, WritePlan};
//! use micro_http_stream::protocol::EncodingMode;
//!
//! let header = Bytes::from_static(b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n");
//! let plan = WritePlan::build(Some(header), EncodingMode::Chunked, b"abc", Coalesce::Bounded(16 * 1024));
//!
//! assert!(plan.lead().unwrap().ends_with(b"\r\n\r\n3\r\nabc"));
//! assert!(plan.needs_terminator());
//! ```

pub mod chunk;
mod header;
mod write_plan;

pub use header::HeaderEncoder;
pub use write_plan::{Coalesce, DEFAULT_COALESCE_LIMIT, WritePlan};

//! HTTP header block serialization
//!
//! - [`HeaderEncoder`]: encodes a response head into the raw header block
//!   - Implements standard HTTP/1.1 header formatting
//!   - Keeps content-length and transfer-encoding in line with the payload size

mod header_encoder;

pub use header_encoder::HeaderEncoder;

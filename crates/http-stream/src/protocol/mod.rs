//! Core types of the response write path.
//!
//! - **Framing** ([`message`]): how a body goes on the wire
//!   - [`PayloadSize`]: declared size of the payload, decided before the header block
//!   - [`EncodingMode`]: identity or chunked framing of a body stream
//!   - [`ErrorPolicy`]: whether transport failures reach the caller
//!
//! - **Response head** ([`response`]): the shared header state
//!   - [`ResponseHead`]: response headers before the body is attached
//!   - [`HeaderCoordinator`]: single-winner access to the serialized header block
//!   - [`ResponseState`]: the response-scoped implementation of that contract
//!
//! - **Errors** ([`error`]):
//!   - [`StreamError`]: misuse of a stream or a propagated transport failure
//!   - [`WriteStatus`]: outcome of a write that did not fail the caller

mod message;
pub use message::EncodingMode;
pub use message::ErrorPolicy;
pub use message::PayloadSize;

mod response;
pub use response::HeaderCoordinator;
pub use response::ResponseHead;
pub use response::ResponseState;

mod error;
pub use error::StreamError;
pub use error::WriteStatus;

//! HTTP response header handling implementation.
//!
//! The header block of a response may be sent by more than one path: the first
//! body write, closing the body, or an explicit flush by the response owner. The
//! [`HeaderCoordinator`] contract makes sure exactly one of them gets the bytes,
//! and [`ResponseState`] is the response-scoped owner of that decision.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use http::{Response, Version};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::codec::HeaderEncoder;
use crate::connection::{ResponseBodyStream, StreamConfig, Transport};
use crate::protocol::{EncodingMode, ErrorPolicy, PayloadSize, StreamError};

/// Type alias for HTTP response headers.
///
/// This type represents the header portion of an HTTP response, using
/// `http::Response<()>` with an empty body placeholder.
pub type ResponseHead = Response<()>;

/// Owner of a response's "headers sent" state.
///
/// Implementations must guard the state with a lock shared by every path that can
/// send headers for the response, and test-and-set it so that across any set of
/// concurrent callers exactly one receives `Some`.
pub trait HeaderCoordinator {
    /// Returns the serialized header block (status line, fields, blank line) and
    /// marks the headers as sent, or `None` if they were already taken.
    ///
    /// `for_close` tells the coordinator that no body write will follow.
    fn try_take_header_block(&self, for_close: bool) -> Option<Bytes>;

    /// Called once when the body stream has been closed
    fn notify_body_complete(&self);
}

impl<C: HeaderCoordinator + ?Sized> HeaderCoordinator for Arc<C> {
    #[inline]
    fn try_take_header_block(&self, for_close: bool) -> Option<Bytes> {
        (**self).try_take_header_block(for_close)
    }

    #[inline]
    fn notify_body_complete(&self) {
        (**self).notify_body_complete();
    }
}

/// Header state of one response, shared between its body stream and its owner.
///
/// The head stays editable through [`ResponseState::update_head`] until the header
/// block is taken by the first body write, by close, or by [`ResponseState::flush_headers`].
#[derive(Debug)]
pub struct ResponseState {
    /// `None` once the header block has been serialized
    head: Mutex<Option<ResponseHead>>,
    payload_size: PayloadSize,
    body_complete: watch::Sender<bool>,
}

impl ResponseState {
    pub fn new(head: ResponseHead, payload_size: PayloadSize) -> Self {
        let (body_complete, _) = watch::channel(false);
        Self { head: Mutex::new(Some(head)), payload_size, body_complete }
    }

    #[inline]
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// The body framing a stream for this response must use
    #[inline]
    pub fn encoding_mode(&self) -> EncodingMode {
        self.payload_size.encoding_mode()
    }

    pub fn headers_sent(&self) -> bool {
        self.lock().is_none()
    }

    /// Edits the pending head.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidState`] once the header block has been taken.
    pub fn update_head<F>(&self, f: F) -> Result<(), StreamError>
    where
        F: FnOnce(&mut ResponseHead),
    {
        let mut guard = self.lock();
        let head = guard.as_mut().ok_or_else(|| StreamError::invalid_state("response headers already sent"))?;
        f(head);
        Ok(())
    }

    /// Takes the header block on behalf of the response owner, e.g. to send an
    /// informational flush before any body bytes exist.
    pub fn flush_headers(&self) -> Option<Bytes> {
        self.try_take_header_block(false)
    }

    /// Creates the body stream for this response over `transport`
    pub fn body_stream<T>(self: &Arc<Self>, transport: T, error_policy: ErrorPolicy) -> ResponseBodyStream<T, Arc<Self>>
    where
        T: Transport,
    {
        let config = StreamConfig::new().with_encoding_mode(self.encoding_mode()).with_error_policy(error_policy);
        ResponseBodyStream::with_config(transport, Arc::clone(self), config)
    }

    pub fn is_body_complete(&self) -> bool {
        *self.body_complete.borrow()
    }

    /// Resolves once the body stream of this response has been closed
    pub async fn body_completed(&self) {
        let mut receiver = self.body_complete.subscribe();
        // the sender is owned by `self`, so the channel can't close while we wait
        let _ = receiver.wait_for(|complete| *complete).await;
    }

    fn lock(&self) -> MutexGuard<'_, Option<ResponseHead>> {
        self.head.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HeaderCoordinator for ResponseState {
    fn try_take_header_block(&self, for_close: bool) -> Option<Bytes> {
        let mut guard = self.lock();
        let head = guard.take()?;
        if !matches!(head.version(), Version::HTTP_10 | Version::HTTP_11) {
            warn!(http_version = ?head.version(), "response body stream only speaks http/1.x, sending HTTP/1.1 status line");
        }

        let mut dst = BytesMut::new();
        HeaderEncoder::encode_http1(head, self.payload_size, &mut dst);
        drop(guard);

        debug!(for_close, payload_size = ?self.payload_size, len = dst.len(), "took response header block");
        Some(dst.freeze())
    }

    fn notify_body_complete(&self) {
        if self.body_complete.send_replace(true) {
            warn!("response body completion notified more than once");
        }
    }
}

//! The write side of a response body.
//!
//! [`ResponseBodyStream`] sits between the code producing a response body and the
//! [`Transport`] of the connection. It sends the header block lazily, at most
//! once and before any body byte, merging it with the start of the first write.
//! In chunked mode it frames every write as a chunk and ends the body on close.
//!
//! # Transport writes per call
//!
//! | call                       | segments, in order                                        |
//! |----------------------------|-----------------------------------------------------------|
//! | `write`, headers pending   | header + preamble + payload prefix, payload rest, `\r\n`  |
//! | `write`, headers sent      | preamble, payload, `\r\n`                                 |
//! | `start_write`              | one in-flight write of header + preamble + payload        |
//! | `finish_write`             | `\r\n`, after the in-flight write completed               |
//! | `close`                    | header + `0\r\n\r\n`, or `0\r\n\r\n` alone                |
//!
//! Preambles and terminators only appear in chunked mode; empty segments are skipped.
//! Any call other than `finish_write` that finds a started write still in flight
//! awaits it and writes its terminator before doing its own writes.

use std::fmt;
use std::io;
use std::io::SeekFrom;

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::codec::{Coalesce, DEFAULT_COALESCE_LIMIT, WritePlan, chunk};
use crate::connection::Transport;
use crate::ensure;
use crate::protocol::{EncodingMode, ErrorPolicy, HeaderCoordinator, StreamError, WriteStatus};

/// Construction-time options of a [`ResponseBodyStream`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    encoding_mode: EncodingMode,
    error_policy: ErrorPolicy,
    coalesce_limit: usize,
}

impl StreamConfig {
    pub const fn new() -> Self {
        Self {
            encoding_mode: EncodingMode::Identity,
            error_policy: ErrorPolicy::Propagate,
            coalesce_limit: DEFAULT_COALESCE_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_encoding_mode(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    #[must_use]
    pub const fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Caps the lead buffer that carries the header block, see [`DEFAULT_COALESCE_LIMIT`]
    #[must_use]
    pub const fn with_coalesce_limit(mut self, coalesce_limit: usize) -> Self {
        self.coalesce_limit = coalesce_limit;
        self
    }

    #[inline]
    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoding_mode
    }

    #[inline]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    #[inline]
    pub fn coalesce_limit(&self) -> usize {
        self.coalesce_limit
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Token for a write started by [`ResponseBodyStream::start_write`].
///
/// The in-flight operation itself stays inside the stream. Pass the token to
/// [`ResponseBodyStream::finish_write`] to await it and write the chunk terminator;
/// if the token is dropped instead, the next `write`, `start_write`, `flush` or
/// `close` on the stream finishes the write first.
#[derive(Debug)]
#[must_use = "a started write should be passed to `ResponseBodyStream::finish_write`"]
pub struct PendingWrite {
    id: u64,
    started: bool,
}

impl PendingWrite {
    /// Whether a transport write was actually started
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.started
    }
}

/// The started write a stream still owes its terminator to
struct InFlight<P> {
    id: u64,
    op: Option<P>,
    terminator: bool,
    /// failure of an earlier write that ended the start under `ErrorPolicy::Suppress`
    suppressed: Option<io::Error>,
}

/// Write-only, forward-only stream over one response body.
///
/// ```text
/// Open --write*--> Open --close--> Closed
/// ```
///
/// `Closed` is terminal: writes fail with [`StreamError::InvalidState`] and further
/// closes do nothing. Reading, seeking and length queries always fail with
/// [`StreamError::NotSupported`].
///
/// Transport failures are returned as [`StreamError::Io`] under
/// [`ErrorPolicy::Propagate`]. Under [`ErrorPolicy::Suppress`] the failing call stops
/// at the failed segment (no terminator is written for data that did not go out)
/// and returns [`WriteStatus::Suppressed`].
pub struct ResponseBodyStream<T, C>
where
    T: Transport,
{
    transport: T,
    coordinator: C,
    config: StreamConfig,
    closed: bool,
    terminator_sent: bool,
    in_flight: Option<InFlight<T::Pending>>,
    next_write_id: u64,
}

impl<T, C> ResponseBodyStream<T, C>
where
    T: Transport,
    C: HeaderCoordinator,
{
    pub fn new(transport: T, coordinator: C, encoding_mode: EncodingMode, error_policy: ErrorPolicy) -> Self {
        let config = StreamConfig::new().with_encoding_mode(encoding_mode).with_error_policy(error_policy);
        Self::with_config(transport, coordinator, config)
    }

    pub fn with_config(transport: T, coordinator: C, config: StreamConfig) -> Self {
        Self {
            transport,
            coordinator,
            config,
            closed: false,
            terminator_sent: false,
            in_flight: None,
            next_write_id: 0,
        }
    }

    /// Writes `buf` as (the next chunk of) the body, sending the header block first if
    /// no other path has sent it yet. An unfinished started write is finished first.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidState`] after close
    /// - [`StreamError::Io`] if a transport write fails and the policy is `Propagate`.
    ///   Segments issued before the failure may already be on the wire.
    pub async fn write(&mut self, buf: &[u8]) -> Result<WriteStatus, StreamError> {
        self.ensure_open()?;
        let result = self.send_write(buf).await;
        self.settle(result)
    }

    /// Starts writing `buf` as one in-flight transport write and returns without
    /// waiting for it. The chunk terminator is left to [`ResponseBodyStream::finish_write`].
    ///
    /// Only one write is in flight per stream: an unfinished earlier one is finished
    /// before the new one starts. If that fails under `ErrorPolicy::Suppress`, nothing
    /// is started and the failure is reported by `finish_write`.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidState`] after close
    /// - [`StreamError::Io`] if finishing the earlier write fails and the policy is `Propagate`
    pub async fn start_write(&mut self, buf: &[u8]) -> Result<PendingWrite, StreamError> {
        self.ensure_open()?;

        let id = self.next_write_id;
        self.next_write_id += 1;

        if let Err(e) = self.complete_in_flight().await {
            if !self.config.error_policy.is_suppress() {
                return Err(StreamError::io(e));
            }
            self.in_flight = Some(InFlight { id, op: None, terminator: false, suppressed: Some(e) });
            return Ok(PendingWrite { id, started: false });
        }

        let header = self.coordinator.try_take_header_block(false);
        let mut plan = WritePlan::build(header, self.config.encoding_mode, buf, Coalesce::Whole);

        let op = plan.take_lead().map(|lead| {
            trace!(len = lead.len(), "start transport write");
            self.transport.start_write(lead)
        });
        let started = op.is_some();

        self.in_flight = Some(InFlight { id, op, terminator: plan.needs_terminator(), suppressed: None });
        Ok(PendingWrite { id, started })
    }

    /// Waits for a started write, then writes the chunk terminator in chunked mode.
    ///
    /// The terminator is not part of the started write: this call awaits one more
    /// transport write after the in-flight one completes. A write that a later call
    /// already finished reports [`WriteStatus::Written`], its outcome went to that call.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidState`] if the token was not handed out by this stream
    /// - [`StreamError::Io`] if either write fails and the policy is `Propagate`
    pub async fn finish_write(&mut self, pending: PendingWrite) -> Result<WriteStatus, StreamError> {
        match &self.in_flight {
            Some(in_flight) if in_flight.id == pending.id => {
                let result = self.complete_in_flight().await;
                self.settle(result)
            }
            _ if pending.id < self.next_write_id => Ok(WriteStatus::Written),
            _ => Err(StreamError::invalid_state("no started write to finish")),
        }
    }

    /// Ends the body: finishes a started write that is still in flight, sends the
    /// header block if it is still pending and, in chunked mode, the terminating
    /// zero-size chunk, then notifies the coordinator.
    ///
    /// Closing a closed stream does nothing.
    ///
    /// # Errors
    ///
    /// [`StreamError::Io`] if a transport write fails and the policy is `Propagate`.
    /// The stream is closed and the coordinator notified regardless.
    pub async fn close(&mut self) -> Result<WriteStatus, StreamError> {
        if self.closed {
            return Ok(WriteStatus::Written);
        }
        self.closed = true;

        let terminate = self.config.encoding_mode.is_chunked() && !self.terminator_sent;
        let result = self.send_close(terminate).await;
        if terminate {
            self.terminator_sent = true;
        }

        self.coordinator.notify_body_complete();
        debug!(encoding_mode = ?self.config.encoding_mode, ok = result.is_ok(), "response body closed");
        self.settle(result)
    }

    /// Flushes the transport, after finishing a started write that is still in flight.
    ///
    /// # Errors
    ///
    /// Same as [`ResponseBodyStream::write`].
    pub async fn flush(&mut self) -> Result<WriteStatus, StreamError> {
        self.ensure_open()?;
        let result = match self.complete_in_flight().await {
            Ok(()) => self.transport.flush().await,
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    async fn send_write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.complete_in_flight().await?;

        let header = self.coordinator.try_take_header_block(false);
        let plan = WritePlan::build(
            header,
            self.config.encoding_mode,
            buf,
            Coalesce::Bounded(self.config.coalesce_limit),
        );

        if let Some(lead) = plan.lead() {
            self.send(lead).await?;
        }

        let rest = plan.rest(buf);
        if !rest.is_empty() {
            self.send(rest).await?;
        }

        if plan.needs_terminator() {
            self.send(chunk::RECORD_TERMINATOR).await?;
        }
        Ok(())
    }

    async fn complete_in_flight(&mut self) -> io::Result<()> {
        let Some(in_flight) = self.in_flight.take() else {
            return Ok(());
        };

        if let Some(e) = in_flight.suppressed {
            return Err(e);
        }

        if let Some(op) = in_flight.op {
            op.await?;
        }

        if in_flight.terminator {
            self.send(chunk::RECORD_TERMINATOR).await?;
        }
        Ok(())
    }

    async fn send_close(&mut self, terminate: bool) -> io::Result<()> {
        self.complete_in_flight().await?;

        let header = self.coordinator.try_take_header_block(true);
        match (header, terminate) {
            (Some(header), true) => {
                let mut buf = BytesMut::with_capacity(header.len() + chunk::LAST_CHUNK.len());
                buf.extend_from_slice(&header);
                chunk::put_size_preamble(0, true, &mut buf);
                self.send(&buf).await
            }
            (Some(header), false) => self.send(&header).await,
            (None, true) => self.send(&chunk::size_preamble(0, true)).await,
            (None, false) => Ok(()),
        }
    }

    async fn send(&mut self, segment: &[u8]) -> io::Result<()> {
        trace!(len = segment.len(), "write segment to transport");
        self.transport.write_all(segment).await
    }

    fn settle(&self, result: io::Result<()>) -> Result<WriteStatus, StreamError> {
        match result {
            Ok(()) => Ok(WriteStatus::Written),
            Err(e) if self.config.error_policy.is_suppress() => {
                warn!(cause = %e, "suppressed transport failure on response body");
                Ok(WriteStatus::Suppressed(e))
            }
            Err(e) => Err(StreamError::io(e)),
        }
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        ensure!(!self.closed, StreamError::invalid_state("response body stream is closed"));
        Ok(())
    }
}

impl<T, C> ResponseBodyStream<T, C>
where
    T: Transport,
{
    #[inline]
    pub fn encoding_mode(&self) -> EncodingMode {
        self.config.encoding_mode
    }

    #[inline]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.config.error_policy
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn can_read(&self) -> bool {
        false
    }

    #[inline]
    pub fn can_seek(&self) -> bool {
        false
    }

    #[inline]
    pub fn can_write(&self) -> bool {
        !self.closed
    }

    pub fn read(&mut self, _buf: &mut [u8]) -> Result<usize, StreamError> {
        Err(StreamError::not_supported("read"))
    }

    pub fn seek(&mut self, _pos: SeekFrom) -> Result<u64, StreamError> {
        Err(StreamError::not_supported("seek"))
    }

    pub fn set_length(&mut self, _length: u64) -> Result<(), StreamError> {
        Err(StreamError::not_supported("set_length"))
    }

    pub fn length(&self) -> Result<u64, StreamError> {
        Err(StreamError::not_supported("length"))
    }

    pub fn position(&self) -> Result<u64, StreamError> {
        Err(StreamError::not_supported("position"))
    }

    pub fn set_position(&mut self, _position: u64) -> Result<(), StreamError> {
        Err(StreamError::not_supported("set_position"))
    }
}

impl<T, C> fmt::Debug for ResponseBodyStream<T, C>
where
    T: Transport,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBodyStream")
            .field("config", &self.config)
            .field("closed", &self.closed)
            .field("terminator_sent", &self.terminator_sent)
            .field("in_flight", &self.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

impl<T, C> Drop for ResponseBodyStream<T, C>
where
    T: Transport,
{
    fn drop(&mut self) {
        if !self.closed {
            warn!(encoding_mode = ?self.config.encoding_mode, "response body stream dropped before close");
        }
    }
}

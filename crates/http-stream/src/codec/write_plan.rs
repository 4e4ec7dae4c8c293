//! Coalescing of the header block, chunk preamble and payload for one body write.
//!
//! Both the awaited write path and the start/finish path of
//! [`ResponseBodyStream`](crate::connection::ResponseBodyStream) build a [`WritePlan`]
//! and then send its segments in order:
//!
//! 1. the lead buffer, if any (header block, chunk preamble, leading payload bytes)
//! 2. the payload bytes not copied into the lead buffer
//! 3. the chunk record terminator, for chunked bodies

use crate::codec::chunk;
use crate::protocol::EncodingMode;
use bytes::{Bytes, BytesMut};
use std::cmp;

/// Upper bound on the size of a lead buffer that carries the header block.
///
/// Small and medium writes travel in the same transport write (and usually the
/// same packet) as the header block, larger ones are split.
pub const DEFAULT_COALESCE_LIMIT: usize = 16 * 1024;

/// How much of the payload may be copied into the lead buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Coalesce {
    /// When a header block is pending, header, preamble and payload share a lead
    /// buffer of at most this many bytes. Without a header block the payload is
    /// never copied and the preamble (if any) is sent on its own.
    Bounded(usize),
    /// Everything goes into the lead buffer.
    Whole,
}

#[derive(Debug)]
pub struct WritePlan {
    lead: Option<BytesMut>,
    coalesced: usize,
    terminator: bool,
}

impl WritePlan {
    /// Plans the transport writes for `payload`.
    ///
    /// `header` is the serialized header block if this write won the right to send
    /// it. An empty payload never produces a chunk, a zero-size chunk would
    /// terminate the body.
    pub fn build(header: Option<Bytes>, mode: EncodingMode, payload: &[u8], coalesce: Coalesce) -> Self {
        let chunked = mode.is_chunked() && !payload.is_empty();
        let preamble_len = if chunked { chunk::preamble_len(payload.len(), false) } else { 0 };
        let header_len = header.as_ref().map_or(0, Bytes::len);

        let coalesced = match (coalesce, &header) {
            (Coalesce::Whole, _) => payload.len(),
            (Coalesce::Bounded(limit), Some(_)) => {
                cmp::min(payload.len(), limit.saturating_sub(header_len + preamble_len))
            }
            (Coalesce::Bounded(_), None) => 0,
        };

        let lead_len = header_len + preamble_len + coalesced;
        let lead = (lead_len > 0).then(|| {
            let mut lead = BytesMut::with_capacity(lead_len);
            if let Some(header) = &header {
                lead.extend_from_slice(header);
            }
            if chunked {
                chunk::put_size_preamble(payload.len(), false, &mut lead);
            }
            lead.extend_from_slice(&payload[..coalesced]);
            lead
        });

        Self { lead, coalesced, terminator: chunked }
    }

    /// The first segment to send
    #[inline]
    pub fn lead(&self) -> Option<&[u8]> {
        self.lead.as_deref()
    }

    #[inline]
    pub fn take_lead(&mut self) -> Option<Bytes> {
        self.lead.take().map(BytesMut::freeze)
    }

    /// Payload bytes that follow the lead buffer as a separate segment
    #[inline]
    pub fn rest<'a>(&self, payload: &'a [u8]) -> &'a [u8] {
        &payload[self.coalesced..]
    }

    /// Number of payload bytes carried by the lead buffer
    #[inline]
    pub fn coalesced(&self) -> usize {
        self.coalesced
    }

    /// Whether a chunk record terminator closes this write
    #[inline]
    pub fn needs_terminator(&self) -> bool {
        self.terminator
    }
}

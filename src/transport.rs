//! Transport shim: segmentation on the way down, a bounded receive buffer on
//! the way up.
//!
//! Sending is segmentation plus sequence numbering; receiving is a
//! buffer-bound check followed by synchronous hand-off to the application.
//! The receive buffer models a *limit*, not an occupancy: the application
//! consumes each segment within the same call, so usage returns to zero
//! between deliveries and the overflow counter only moves when a single
//! segment alone would blow the bound.  The load-bearing signal is the
//! `false` return, which the link layer turns into window backpressure.

use crate::app::{BulkSource, ByteSink};
use crate::config::TRANSPORT_HEADER_BYTES;
use crate::packet::TransportSegment;

// ---------------------------------------------------------------------------
// TransportSender
// ---------------------------------------------------------------------------

/// Send-side shim: pulls application chunks and wraps them in segments.
#[derive(Debug)]
pub struct TransportSender {
    next_seq: u64,
    /// Application bytes per segment: the frame payload budget minus the
    /// transport header.
    chunk_size: usize,
    source: BulkSource,
}

impl TransportSender {
    /// `payload_budget` is the configured L; it must exceed the transport
    /// header (validated at configuration time).
    pub fn new(payload_budget: usize, source: BulkSource) -> Self {
        debug_assert!(payload_budget > TRANSPORT_HEADER_BYTES);
        Self {
            next_seq: 0,
            chunk_size: payload_budget - TRANSPORT_HEADER_BYTES,
            source,
        }
    }

    /// Build the next segment, or `None` at end of file.
    pub fn next_segment(&mut self) -> Option<TransportSegment> {
        let len = self.source.next_chunk(self.chunk_size)?;
        let segment = TransportSegment::new(self.next_seq, len);
        self.next_seq += 1;
        Some(segment)
    }
}

// ---------------------------------------------------------------------------
// TransportReceiver
// ---------------------------------------------------------------------------

/// Receive-side shim: bounded buffer in front of the application.
#[derive(Debug)]
pub struct TransportReceiver {
    max_buffer: usize,
    current_usage: usize,
    /// Deliveries rejected because the buffer bound would be exceeded.
    pub overflow_count: u64,
    pub sink: ByteSink,
}

impl TransportReceiver {
    pub fn new(max_buffer: usize, sink: ByteSink) -> Self {
        Self {
            max_buffer,
            current_usage: 0,
            overflow_count: 0,
            sink,
        }
    }

    /// Offer one in-order segment to the application.
    ///
    /// Returns `false` — and counts the overflow — when the segment does not
    /// fit the buffer bound; the caller must keep the segment and stop
    /// sliding its window.  On acceptance the application consumes the bytes
    /// synchronously, so usage is transient.
    pub fn deliver(&mut self, segment: TransportSegment) -> bool {
        let n = segment.data_len;
        if self.current_usage + n > self.max_buffer {
            self.overflow_count += 1;
            log::debug!(
                "[transport] buffer full: seq={} len={} usage={}/{}",
                segment.seq,
                n,
                self.current_usage,
                self.max_buffer
            );
            return false;
        }
        self.current_usage += n;
        self.sink.consume(segment.seq, n);
        self.current_usage -= n;
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! Data-unit definitions shared by the transport and link layers.
//!
//! Segments and frames carry *sizes*, not bytes: the workload is a bulk
//! transfer whose content is irrelevant to every metric, so a frame is fully
//! described by its sequence number, kind, and length accounting.  No I/O or
//! serialization happens here — this is pure data.

use crate::config::{LINK_HEADER_BYTES, TRANSPORT_HEADER_BYTES};

// ---------------------------------------------------------------------------
// TransportSegment
// ---------------------------------------------------------------------------

/// One transport-layer segment: an application chunk plus the fixed header.
///
/// Transport sequence numbers are assigned at creation, increase
/// monotonically per sender, and are never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSegment {
    /// Transport sequence number.
    pub seq: u64,
    /// Application bytes carried (header excluded).
    pub data_len: usize,
}

impl TransportSegment {
    pub fn new(seq: u64, data_len: usize) -> Self {
        Self { seq, data_len }
    }

    /// On-wire size of the segment: data plus the transport header.
    pub fn total_size(&self) -> usize {
        self.data_len + TRANSPORT_HEADER_BYTES
    }
}

// ---------------------------------------------------------------------------
// LinkFrame
// ---------------------------------------------------------------------------

/// Frame type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Data,
    Ack,
}

/// One link-layer frame: a DATA frame wrapping a segment, or a bare ACK.
///
/// For DATA frames the link sequence number equals the payload's transport
/// sequence number — the two counters run in lockstep by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFrame {
    /// Link-layer sequence number (for ACKs: the number being acknowledged).
    pub seq: u64,
    pub kind: FrameKind,
    /// Wrapped segment; present iff `kind == Data`.
    pub payload: Option<TransportSegment>,
    /// Transmissions beyond the first.
    pub retry_count: u32,
}

impl LinkFrame {
    /// Build the DATA frame for a segment.
    pub fn data(segment: TransportSegment) -> Self {
        Self {
            seq: segment.seq,
            kind: FrameKind::Data,
            payload: Some(segment),
            retry_count: 0,
        }
    }

    /// Build an ACK for the given sequence number.
    pub fn ack(seq: u64) -> Self {
        Self {
            seq,
            kind: FrameKind::Ack,
            payload: None,
            retry_count: 0,
        }
    }

    /// On-wire size: link header plus the payload's total size, if any.
    pub fn size_bytes(&self) -> usize {
        LINK_HEADER_BYTES + self.payload.map_or(0, |p| p.total_size())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_size_includes_transport_header() {
        let seg = TransportSegment::new(0, 1016);
        assert_eq!(seg.total_size(), 1024);
    }

    #[test]
    fn data_frame_size_and_seq_track_payload() {
        let seg = TransportSegment::new(7, 504);
        let frame = LinkFrame::data(seg);
        assert_eq!(frame.seq, 7);
        assert_eq!(frame.kind, FrameKind::Data);
        assert_eq!(frame.size_bytes(), 24 + 504 + 8);
        assert_eq!(frame.retry_count, 0);
    }

    #[test]
    fn ack_frame_is_header_only() {
        let ack = LinkFrame::ack(3);
        assert_eq!(ack.kind, FrameKind::Ack);
        assert!(ack.payload.is_none());
        assert_eq!(ack.size_bytes(), 24);
    }
}

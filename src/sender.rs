//! Selective Repeat send-side state machine.
//!
//! [`SrSender`] maintains a sliding window of up to `W` in-flight DATA
//! frames.  Unlike Go-Back-N, every frame is acknowledged individually and
//! only the frame whose timer expires is retransmitted.
//!
//! # Protocol contract
//!
//! - At most `W` frames may be outstanding: `send_base <= next_seq <=
//!   send_base + W` at all times.
//! - ACKs are selective: an ACK for `s` acknowledges exactly frame `s`.
//! - The window slides only when `send_base` itself is acknowledged, and then
//!   advances past every contiguously acknowledged frame.
//! - A frame's first-transmission timestamp is kept until its first ACK, so
//!   the RTT sample for a retransmitted frame spans from the *original* send
//!   to the eventual ACK, timeout included.
//!
//! This module only manages state; the simulation driver owns the channel
//! and the event queue and performs all transmission and timer scheduling
//! (same pattern as the receive side in [`crate::receiver`]).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::engine::EventHandle;
use crate::packet::{LinkFrame, TransportSegment};

/// Send-side Selective Repeat state for one link.
///
/// # Sequence-number layout
///
/// ```text
///  send_base          next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ <── in flight ──▶│ <── sendable ───▶
/// ```
#[derive(Debug)]
pub struct SrSender {
    /// Sequence number of the oldest unacknowledged frame (left window edge).
    pub send_base: u64,

    /// Sequence number the next new frame will take.
    pub next_seq: u64,

    /// Window size W: maximum frames in flight.
    window_size: usize,

    /// Segments accepted from the transport but not yet framed (window full).
    send_buffer: VecDeque<TransportSegment>,

    /// Unacknowledged frames by sequence number, kept for retransmission.
    inflight: HashMap<u64, LinkFrame>,

    /// Acknowledged sequence numbers at or above `send_base`.
    acked: HashSet<u64>,

    /// Pending retransmission timers by sequence number.
    timers: HashMap<u64, EventHandle>,

    /// First-transmission timestamps, consumed by the first ACK.
    send_times: HashMap<u64, f64>,

    /// RTT measurements gathered over the run, seconds.
    pub rtt_samples: Vec<f64>,

    /// Total retransmissions performed.
    pub retransmissions: u64,
}

impl SrSender {
    pub fn new(window_size: usize) -> Self {
        debug_assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            send_base: 0,
            next_seq: 0,
            window_size,
            send_buffer: VecDeque::new(),
            inflight: HashMap::new(),
            acked: HashSet::new(),
            timers: HashMap::new(),
            send_times: HashMap::new(),
            rtt_samples: Vec::new(),
            retransmissions: 0,
        }
    }

    /// `true` while a new frame may enter the window.
    pub fn window_open(&self) -> bool {
        debug_assert!(self.send_base <= self.next_seq);
        debug_assert!(self.next_seq <= self.send_base + self.window_size as u64);
        self.next_seq < self.send_base + self.window_size as u64
    }

    /// Queue a segment behind the window.
    pub fn enqueue(&mut self, segment: TransportSegment) {
        self.send_buffer.push_back(segment);
    }

    /// `true` when segments are waiting for a window slot.
    pub fn has_pending(&self) -> bool {
        !self.send_buffer.is_empty()
    }

    /// Number of frames currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Admit the next queued segment into the window as a DATA frame.
    ///
    /// Returns `None` when the window is full or nothing is queued.  The
    /// frame is recorded as in-flight and `next_seq` advances; the caller
    /// transmits it and arms its timer.
    pub fn next_frame(&mut self) -> Option<LinkFrame> {
        if !self.window_open() {
            return None;
        }
        let segment = self.send_buffer.pop_front()?;
        debug_assert_eq!(segment.seq, self.next_seq, "transport seq out of lockstep");
        let frame = LinkFrame::data(segment);
        self.inflight.insert(frame.seq, frame);
        self.next_seq += 1;
        Some(frame)
    }

    /// Record the first-transmission time of `seq`.
    ///
    /// Later transmissions of the same frame leave the entry untouched, so
    /// RTT samples always reference the original send.
    pub fn note_sent(&mut self, seq: u64, now: f64) {
        self.send_times.entry(seq).or_insert(now);
    }

    /// Fetch `seq` for retransmission after its timer expired.
    ///
    /// Returns `None` — and counts nothing — when the frame was already
    /// acknowledged (a timer that lost the race to an in-flight ACK) or is
    /// no longer in the window.
    pub fn retransmit_frame(&mut self, seq: u64) -> Option<LinkFrame> {
        if self.acked.contains(&seq) {
            return None;
        }
        let frame = self.inflight.get_mut(&seq)?;
        frame.retry_count += 1;
        self.retransmissions += 1;
        Some(*frame)
    }

    /// Store the timer handle for `seq`, returning any displaced handle so
    /// the caller can cancel it.
    pub fn set_timer(&mut self, seq: u64, handle: EventHandle) -> Option<EventHandle> {
        self.timers.insert(seq, handle)
    }

    /// Remove and return the timer handle for `seq` (to cancel on ACK).
    pub fn take_timer(&mut self, seq: u64) -> Option<EventHandle> {
        self.timers.remove(&seq)
    }

    /// Drop the timer entry for `seq` after it fired.
    pub fn clear_timer(&mut self, seq: u64) {
        self.timers.remove(&seq);
    }

    /// Process an ACK for `seq` at time `now`.
    ///
    /// Records the RTT sample if this is the first ACK for the frame, marks
    /// it acknowledged, and slides the window when the base was acked.
    /// Returns `true` when the window advanced (the caller should refill).
    /// Duplicate ACKs are idempotent: no new sample, no extra slide.
    pub fn on_ack(&mut self, seq: u64, now: f64) -> bool {
        if let Some(sent) = self.send_times.remove(&seq) {
            self.rtt_samples.push(now - sent);
        }
        self.acked.insert(seq);

        if seq != self.send_base {
            return false;
        }
        while self.acked.remove(&self.send_base) {
            self.inflight.remove(&self.send_base);
            self.send_base += 1;
        }
        debug_assert!(self.next_seq >= self.send_base);
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(seq: u64) -> TransportSegment {
        TransportSegment::new(seq, 1016)
    }

    /// Fill the window with `n` frames starting from the sender's next seq.
    fn fill(s: &mut SrSender, n: u64) {
        for i in 0..n {
            s.enqueue(seg(s.next_seq + i));
        }
        while s.next_frame().is_some() {}
    }

    #[test]
    fn initial_state() {
        let s = SrSender::new(4);
        assert_eq!(s.send_base, 0);
        assert_eq!(s.next_seq, 0);
        assert!(s.window_open());
        assert_eq!(s.in_flight(), 0);
        assert!(!s.has_pending());
    }

    #[test]
    fn window_gates_frame_admission() {
        let mut s = SrSender::new(2);
        fill(&mut s, 3);

        assert_eq!(s.next_seq, 2);
        assert_eq!(s.in_flight(), 2);
        assert!(s.has_pending()); // third segment still queued
        assert!(!s.window_open());
        assert!(s.next_frame().is_none());
    }

    #[test]
    fn ack_of_base_slides_past_contiguous_acks() {
        let mut s = SrSender::new(4);
        fill(&mut s, 4);

        // Ack 1 and 2 out of order: base must not move yet.
        assert!(!s.on_ack(2, 0.06));
        assert!(!s.on_ack(1, 0.06));
        assert_eq!(s.send_base, 0);
        assert_eq!(s.in_flight(), 4);

        // Acking the base releases 0, 1 and 2 at once.
        assert!(s.on_ack(0, 0.07));
        assert_eq!(s.send_base, 3);
        assert_eq!(s.in_flight(), 1);
        assert!(s.window_open());
    }

    #[test]
    fn duplicate_ack_is_idempotent() {
        let mut s = SrSender::new(2);
        fill(&mut s, 2);
        s.note_sent(0, 0.0);

        assert!(s.on_ack(0, 0.055));
        let base = s.send_base;
        let samples = s.rtt_samples.len();

        assert!(!s.on_ack(0, 0.060));
        assert_eq!(s.send_base, base);
        assert_eq!(s.rtt_samples.len(), samples);
        assert_eq!(s.retransmissions, 0);
    }

    #[test]
    fn rtt_sample_spans_from_first_transmission() {
        let mut s = SrSender::new(1);
        fill(&mut s, 1);
        s.note_sent(0, 0.0);
        // Retransmission attempts must not refresh the timestamp.
        s.retransmit_frame(0);
        s.note_sent(0, 0.1);

        s.on_ack(0, 0.155);
        assert_eq!(s.rtt_samples.len(), 1);
        assert!((s.rtt_samples[0] - 0.155).abs() < 1e-12);
    }

    #[test]
    fn retransmit_after_ack_is_refused() {
        let mut s = SrSender::new(1);
        fill(&mut s, 1);
        s.on_ack(0, 0.05);

        assert!(s.retransmit_frame(0).is_none());
        assert_eq!(s.retransmissions, 0);
    }

    #[test]
    fn retransmit_bumps_counters() {
        let mut s = SrSender::new(1);
        fill(&mut s, 1);

        let first = s.retransmit_frame(0).expect("frame in flight");
        assert_eq!(first.retry_count, 1);
        let second = s.retransmit_frame(0).expect("still in flight");
        assert_eq!(second.retry_count, 2);
        assert_eq!(s.retransmissions, 2);
    }

    #[test]
    fn timer_handles_are_tracked_per_seq() {
        let mut s = SrSender::new(2);
        let mut q = crate::engine::EventQueue::new();
        let h0 = q.schedule(0.1, ());
        let h1 = q.schedule(0.1, ());

        assert!(s.set_timer(0, h0).is_none());
        assert_eq!(s.set_timer(0, h1), Some(h0));
        assert_eq!(s.take_timer(0), Some(h1));
        assert!(s.take_timer(0).is_none());
    }

    #[test]
    fn window_reopens_after_full_cycle() {
        let mut s = SrSender::new(2);
        fill(&mut s, 2);
        s.on_ack(1, 0.05);
        s.on_ack(0, 0.06);
        assert_eq!(s.send_base, 2);
        assert_eq!(s.next_seq, 2);
        assert!(s.window_open());
        assert_eq!(s.in_flight(), 0);
    }
}

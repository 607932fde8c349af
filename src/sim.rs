//! Simulation driver: wires one sender/receiver pair over a shared channel
//! and runs a single (W, L, seed) point to completion.
//!
//! # Architecture
//!
//! ```text
//!  BulkSource ──▶ TransportSender ──▶ SrSender ─┐
//!                                               │ DATA (FWD)
//!                                       PhysicalChannel
//!                                               │ ACK (REV)
//!  ByteSink  ◀── TransportReceiver ◀─ SrReceiver ┘
//! ```
//!
//! The driver owns every component and performs all of their "I/O": the link
//! state machines never see the channel or the event queue.  Control flows
//! through a tagged [`SimEvent`] dispatched by a `match` after each pop —
//! a recurring 1 ms [`Pump`](SimEvent::Pump) pulls fresh segments while the
//! window is open, [`Timeout`](SimEvent::Timeout) drives retransmission, and
//! [`Deliver`](SimEvent::Deliver) routes arrivals to the proper side.
//!
//! Everything is single-threaded and cooperative: handlers run to completion
//! and defer work only by scheduling further events, so no state needs
//! locking and a given seed always replays the same run.

use std::fmt;

use crate::app::{BulkSource, ByteSink};
use crate::channel::{Direction, ErrorModel, GilbertElliot, PhysicalChannel};
use crate::config::{SimConfig, PUMP_INTERVAL_SECS};
use crate::engine::EventQueue;
use crate::packet::{FrameKind, LinkFrame};
use crate::receiver::SrReceiver;
use crate::sender::SrSender;
use crate::transport::{TransportReceiver, TransportSender};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything that can happen in a run.
#[derive(Debug, Clone, Copy)]
enum SimEvent {
    /// Recurring application poll: refill the send window.
    Pump,
    /// Retransmission timer for one DATA frame expired.
    Timeout { seq: u64 },
    /// A frame finished its trip through the channel.
    Deliver {
        dir: Direction,
        frame: LinkFrame,
        corrupted: bool,
    },
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Result row for one run, in the sweep's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    /// Sender window size W.
    pub window: usize,
    /// Frame payload size L, bytes.
    pub payload: usize,
    pub run_id: u32,
    /// Application-visible throughput, megabits per second.
    pub goodput_mbps: f64,
    pub retransmissions: u64,
    /// Mean RTT over all samples, seconds; 0 when no sample was taken.
    pub avg_rtt: f64,
    /// Goodput as a percentage of the link capacity.
    pub utilization: f64,
    /// Receive-buffer overflow events.
    pub buffer_events: u64,
    /// Final simulated time, seconds.
    pub duration: f64,
}

impl RunStats {
    /// Column names matching [`Display`](fmt::Display) output.
    pub fn header() -> &'static str {
        "W,L,run_id,goodput_mbps,retransmissions,avg_rtt,utilization,buffer_events,duration"
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{:.6},{},{:.6},{:.3},{},{:.3}",
            self.window,
            self.payload,
            self.run_id,
            self.goodput_mbps,
            self.retransmissions,
            self.avg_rtt,
            self.utilization,
            self.buffer_events,
            self.duration
        )
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One fully wired simulation run.
pub struct Simulation {
    engine: EventQueue<SimEvent>,
    channel: PhysicalChannel,
    sender: SrSender,
    receiver: SrReceiver,
    transport_tx: TransportSender,
    transport_rx: TransportReceiver,
    cfg: SimConfig,
}

impl Simulation {
    /// Build a run with the production Gilbert-Elliot channel, seeded from
    /// the configuration.
    pub fn new(cfg: SimConfig) -> Result<Self, crate::config::ConfigError> {
        let errors = GilbertElliot::new(&cfg.channel, cfg.seed);
        Self::with_error_model(cfg, Box::new(errors))
    }

    /// Build a run with an injected error model (scripted faults in tests).
    pub fn with_error_model(
        cfg: SimConfig,
        errors: Box<dyn ErrorModel>,
    ) -> Result<Self, crate::config::ConfigError> {
        cfg.validate()?;

        let channel = PhysicalChannel::new(&cfg.channel, errors);
        let transport_tx = TransportSender::new(cfg.payload, BulkSource::new(cfg.file_size));
        let transport_rx =
            TransportReceiver::new(cfg.receiver_buffer, ByteSink::new(cfg.file_size));

        let mut engine = EventQueue::new();
        engine.schedule(0.0, SimEvent::Pump);

        Ok(Self {
            engine,
            channel,
            sender: SrSender::new(cfg.window),
            receiver: SrReceiver::new(cfg.window),
            transport_tx,
            transport_rx,
            cfg,
        })
    }

    /// Drive the run until the receiver finishes or the time cap is hit,
    /// then compute the result row.
    pub fn run(&mut self) -> RunStats {
        log::debug!(
            "[sim] start W={} L={} seed={} run_id={}",
            self.cfg.window,
            self.cfg.payload,
            self.cfg.seed,
            self.cfg.run_id
        );

        while let Some(event) = self.engine.pop() {
            self.dispatch(event);
            if self.transport_rx.sink.is_finished() {
                log::debug!("[sim] transfer complete at t={:.3}", self.engine.now());
                break;
            }
            if self.engine.now() > self.cfg.max_sim_time {
                log::warn!(
                    "[sim] time cap exceeded at t={:.3} with {} bytes delivered",
                    self.engine.now(),
                    self.transport_rx.sink.bytes_received
                );
                break;
            }
        }

        self.stats()
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn dispatch(&mut self, event: SimEvent) {
        match event {
            SimEvent::Pump => self.on_pump(),
            SimEvent::Timeout { seq } => self.on_timeout(seq),
            SimEvent::Deliver {
                dir,
                frame,
                corrupted,
            } => self.on_deliver(dir, frame, corrupted),
        }
    }

    /// Pull segments from the transport while the window has room, then
    /// re-arm the poll unless the transfer already finished.
    fn on_pump(&mut self) {
        while self.sender.window_open() {
            match self.transport_tx.next_segment() {
                Some(segment) => {
                    self.sender.enqueue(segment);
                    self.pump_window();
                }
                None => break,
            }
        }
        if !self.transport_rx.sink.is_finished() {
            self.engine.schedule(PUMP_INTERVAL_SECS, SimEvent::Pump);
        }
    }

    /// Transmit queued segments while the window allows.
    fn pump_window(&mut self) {
        while let Some(frame) = self.sender.next_frame() {
            self.transmit_data(frame);
        }
    }

    /// Send (or resend) one DATA frame: record first-send time, arm the
    /// retransmission timer, and put the frame on the wire.
    fn transmit_data(&mut self, frame: LinkFrame) {
        let now = self.engine.now();
        self.sender.note_sent(frame.seq, now);

        let handle = self
            .engine
            .schedule(self.cfg.timeout, SimEvent::Timeout { seq: frame.seq });
        if let Some(old) = self.sender.set_timer(frame.seq, handle) {
            self.engine.cancel(old);
        }

        let delivery = self
            .channel
            .transmit(now, frame.size_bytes(), Direction::Forward);
        log::trace!(
            "[sr] → DATA seq={} retry={} deliver={:.6}",
            frame.seq,
            frame.retry_count,
            delivery.at
        );
        self.engine.schedule(
            delivery.at - now,
            SimEvent::Deliver {
                dir: Direction::Forward,
                frame,
                corrupted: delivery.corrupted,
            },
        );
    }

    /// Retransmission timer fired for `seq`.
    fn on_timeout(&mut self, seq: u64) {
        // The fired timer is necessarily the one on record for this seq.
        self.sender.clear_timer(seq);
        if let Some(frame) = self.sender.retransmit_frame(seq) {
            log::debug!(
                "[sr] timeout seq={} — retransmitting (attempt {})",
                seq,
                frame.retry_count + 1
            );
            self.transmit_data(frame);
        }
    }

    /// A frame emerged from the channel.
    fn on_deliver(&mut self, dir: Direction, frame: LinkFrame, corrupted: bool) {
        if corrupted {
            // Corrupt frames vanish silently; recovery is the sender's
            // timeout in both directions.
            log::trace!("[sr] ✗ {:?} seq={} corrupted ({dir:?})", frame.kind, frame.seq);
            return;
        }
        match frame.kind {
            FrameKind::Ack => self.handle_ack(frame.seq),
            FrameKind::Data => self.handle_data(frame),
        }
    }

    /// Sender side: process one ACK.
    fn handle_ack(&mut self, seq: u64) {
        let now = self.engine.now();
        log::trace!("[sr] ← ACK seq={seq}");
        if let Some(timer) = self.sender.take_timer(seq) {
            self.engine.cancel(timer);
        }
        if self.sender.on_ack(seq, now) {
            // Window slid: transmit anything already queued behind it.  New
            // segments keep arriving via the pump poll.
            self.pump_window();
        }
    }

    /// Receiver side: process one DATA frame.
    fn handle_data(&mut self, frame: LinkFrame) {
        let seq = frame.seq;

        // Every correct DATA frame is acknowledged, duplicates included;
        // the duplicate ACK is what repairs a lost ACK.
        self.send_ack(seq);

        let Some(segment) = frame.payload else {
            return;
        };
        self.receiver.accept(segment);

        // Deliver in order until the next gap, or until the transport pushes
        // back.  A rejected segment stays buffered and the window stays
        // shut, so the sender eventually stalls.
        while let Some(ready) = self.receiver.next_ready() {
            if self.transport_rx.deliver(ready) {
                self.receiver.advance();
            } else {
                break;
            }
        }
    }

    /// Receiver side: emit an ACK onto the reverse path.
    fn send_ack(&mut self, seq: u64) {
        let ack = LinkFrame::ack(seq);
        let now = self.engine.now();
        let delivery = self
            .channel
            .transmit(now, ack.size_bytes(), Direction::Reverse);
        log::trace!("[sr] → ACK seq={seq} deliver={:.6}", delivery.at);
        self.engine.schedule(
            delivery.at - now,
            SimEvent::Deliver {
                dir: Direction::Reverse,
                frame: ack,
                corrupted: delivery.corrupted,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Metrics & instrumentation
    // -----------------------------------------------------------------------

    /// Result row for the run's current state.
    pub fn stats(&self) -> RunStats {
        let duration = self.engine.now();
        let bytes = self.transport_rx.sink.bytes_received;
        let goodput_mbps = if duration > 0.0 {
            bytes as f64 * 8.0 / duration / 1.0e6
        } else {
            0.0
        };
        let samples = &self.sender.rtt_samples;
        let avg_rtt = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        let capacity_mbps = self.cfg.channel.bit_rate / 1.0e6;
        RunStats {
            window: self.cfg.window,
            payload: self.cfg.payload,
            run_id: self.cfg.run_id,
            goodput_mbps,
            retransmissions: self.sender.retransmissions,
            avg_rtt,
            utilization: goodput_mbps / capacity_mbps * 100.0,
            buffer_events: self.transport_rx.overflow_count,
            duration,
        }
    }

    /// Current simulated time, seconds.
    pub fn now(&self) -> f64 {
        self.engine.now()
    }

    /// Application bytes delivered so far.
    pub fn bytes_received(&self) -> u64 {
        self.transport_rx.sink.bytes_received
    }

    /// Segments handed to the receiving application, in order.
    pub fn segments_delivered(&self) -> u64 {
        self.transport_rx.sink.segments()
    }

    /// RTT samples gathered so far, in arrival order.
    pub fn rtt_samples(&self) -> &[f64] {
        &self.sender.rtt_samples
    }

    /// Sender window base.
    pub fn send_base(&self) -> u64 {
        self.sender.send_base
    }

    /// Receiver window base.
    pub fn rcv_base(&self) -> u64 {
        self.receiver.rcv_base
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

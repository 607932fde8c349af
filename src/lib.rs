//! `arq-sim` — a discrete-event simulator for Selective Repeat ARQ over a
//! Gilbert-Elliot bit-error channel.
//!
//! The simulator measures how application-visible throughput ("goodput"),
//! retransmissions, RTT, link utilization and receive-buffer pressure vary
//! with the sender window size `W` and the frame payload size `L` for a
//! fixed 100 MiB bulk transfer.  Runs are seeded and fully deterministic, so
//! any row of a parameter sweep can be reproduced from its `(W, L, run_id)`
//! coordinates.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────┐ segments ┌───────────┐ DATA frames ┌──────────────┐
//!  │ BulkSource │─────────▶│ SrSender  │────────────▶│              │
//!  └────────────┘          └─────▲─────┘   (FWD)     │   Physical   │
//!                                │ ACKs (REV)        │   Channel    │
//!  ┌────────────┐          ┌─────┴──────┐◀───────────│ (shared tx,  │
//!  │  ByteSink  │◀─────────│ SrReceiver │            │  G-E errors) │
//!  └────────────┘ in-order └────────────┘            └──────────────┘
//!
//!            all arrows are events on one simulated clock
//! ```
//!
//! Each module has a single responsibility:
//! - [`config`]    — problem constants, per-run configuration, validation
//! - [`engine`]    — simulated clock + cancellable event queue
//! - [`packet`]    — segment / frame types and size accounting
//! - [`channel`]   — delay model and Gilbert-Elliot corruption
//! - [`sender`]    — Selective Repeat send-side state machine
//! - [`receiver`]  — Selective Repeat receive-side state machine
//! - [`transport`] — segmentation and the bounded receive buffer
//! - [`app`]       — bulk producer and byte-counting sink
//! - [`sim`]       — driver wiring it all together; result rows
//!
//! # Example
//!
//! ```no_run
//! use arq_sim::{SimConfig, Simulation};
//!
//! let cfg = SimConfig::new(8, 1024, arq_sim::config::sweep_seed(8, 1024, 0), 0);
//! let mut sim = Simulation::new(cfg).expect("valid configuration");
//! let row = sim.run();
//! println!("{row}");
//! ```

pub mod app;
pub mod channel;
pub mod config;
pub mod engine;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sim;
pub mod transport;

pub use config::{ChannelParams, ConfigError, SimConfig};
pub use sim::{RunStats, Simulation};

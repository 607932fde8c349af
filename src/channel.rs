//! Physical channel: delay accounting and the bit-error process.
//!
//! One [`PhysicalChannel`] is shared by both directions of a simulated link
//! pair.  It never touches the event queue itself; [`transmit`] returns the
//! computed [`Delivery`] and the driver schedules the arrival.  Three
//! busy-until timestamps serialize contending transmissions — a shared
//! transmitter and one receive processor per direction — so overlapping
//! frames queue by arithmetic rather than by any synchronization primitive.
//!
//! Corruption verdicts come from an [`ErrorModel`].  The production model is
//! [`GilbertElliot`]; tests substitute scripted models through the same trait
//! to corrupt chosen transmissions deterministically.
//!
//! [`transmit`]: PhysicalChannel::transmit

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::ChannelParams;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a frame travels: DATA forward, ACKs reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Error models
// ---------------------------------------------------------------------------

/// Per-frame corruption verdict.
///
/// Implementations may carry state across calls (the Gilbert-Elliot chain
/// does); the channel consults the model exactly once per transmission, in
/// transmit order, which keeps verdicts deterministic for a given seed.
pub trait ErrorModel {
    fn corrupts(&mut self, size_bytes: usize) -> bool;
}

/// Two-state Markov bit-error chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    Good,
    Bad,
}

/// Gilbert-Elliot channel state, persistent across frames and directions.
///
/// Walking every bit of a 100 MB transfer is infeasible, so the chain is
/// advanced run-by-run: a geometric draw yields the number of bits until the
/// next state transition, and the error probability over that whole run
/// collapses to `1 - (1 - ber)^run`.  The run-length distribution per state
/// is exactly that of the bit-by-bit chain.
pub struct GilbertElliot {
    state: ChainState,
    ber_good: f64,
    ber_bad: f64,
    good_to_bad: f64,
    bad_to_good: f64,
    rng: ChaCha8Rng,
}

impl GilbertElliot {
    /// A chain in the GOOD state with its own deterministic RNG stream.
    pub fn new(params: &ChannelParams, seed: u64) -> Self {
        Self {
            state: ChainState::Good,
            ber_good: params.ber_good,
            ber_bad: params.ber_bad,
            good_to_bad: params.good_to_bad,
            bad_to_good: params.bad_to_good,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Number of Bernoulli(p) trials up to and including the first success.
    ///
    /// `p == 0` means the event never happens; the sentinel is larger than
    /// any frame so the caller's `min` against remaining bits absorbs it
    /// without a transition.
    fn geometric(&mut self, p: f64) -> u64 {
        if p <= 0.0 {
            return u64::MAX;
        }
        if p >= 1.0 {
            return 1;
        }
        let u: f64 = self.rng.random();
        let k = ((1.0 - u).ln() / (1.0 - p).ln()).ceil();
        (k as u64).max(1)
    }
}

impl ErrorModel for GilbertElliot {
    fn corrupts(&mut self, size_bytes: usize) -> bool {
        let mut bits_left = size_bytes as u64 * 8;
        let mut corrupted = false;

        while bits_left > 0 {
            let (p_trans, ber, next) = match self.state {
                ChainState::Good => (self.good_to_bad, self.ber_good, ChainState::Bad),
                ChainState::Bad => (self.bad_to_good, self.ber_bad, ChainState::Good),
            };

            let k = self.geometric(p_trans);
            let run = bits_left.min(k);

            // Once a frame is marked corrupted we keep walking the chain so
            // the state at the frame boundary stays continuous, but no
            // further error draws are made.
            if !corrupted {
                let p_err = 1.0 - (1.0 - ber).powf(run as f64);
                if self.rng.random::<f64>() < p_err {
                    corrupted = true;
                }
            }

            bits_left -= run;
            // The state advances iff the drawn run was fully consumed, i.e.
            // the transition event actually occurred — including when it
            // lands exactly on the last bit of the frame.
            if run == k {
                self.state = next;
            }
        }

        corrupted
    }
}

// ---------------------------------------------------------------------------
// PhysicalChannel
// ---------------------------------------------------------------------------

/// Computed arrival of one transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// Absolute simulated time at which the frame reaches the peer link layer.
    pub at: f64,
    /// Whether the bit-error process damaged the frame in flight.
    pub corrupted: bool,
}

/// Shared physical link: serialization, propagation, processing, errors.
pub struct PhysicalChannel {
    bit_rate: f64,
    prop: [f64; 2],
    processing: f64,
    errors: Box<dyn ErrorModel>,
    tx_busy_until: f64,
    rx_busy_until: [f64; 2],
}

impl PhysicalChannel {
    pub fn new(params: &ChannelParams, errors: Box<dyn ErrorModel>) -> Self {
        Self {
            bit_rate: params.bit_rate,
            prop: [params.prop_fwd, params.prop_rev],
            processing: params.processing_delay,
            errors,
            tx_busy_until: 0.0,
            rx_busy_until: [0.0; 2],
        }
    }

    /// Account one frame through the link and return its delivery.
    ///
    /// The frame first waits for the shared transmitter, serializes at the
    /// bit rate, propagates, then waits for the direction's receive processor
    /// slot.  Both busy-until clocks are advanced so later transmissions
    /// queue behind this one.
    pub fn transmit(&mut self, now: f64, size_bytes: usize, dir: Direction) -> Delivery {
        let corrupted = self.errors.corrupts(size_bytes);

        let tx_start = now.max(self.tx_busy_until);
        let tx_end = tx_start + size_bytes as f64 * 8.0 / self.bit_rate;
        self.tx_busy_until = tx_end;

        let rx_in = tx_end + self.prop[dir.index()];
        let proc_start = rx_in.max(self.rx_busy_until[dir.index()]);
        let at = proc_start + self.processing;
        self.rx_busy_until[dir.index()] = at;

        log::trace!(
            "[chan] {dir:?} {size_bytes}B tx={tx_start:.6}..{tx_end:.6} deliver={at:.6} corrupted={corrupted}"
        );
        Delivery { at, corrupted }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelParams;

    /// Model that never corrupts; isolates the timing arithmetic.
    struct Clean;
    impl ErrorModel for Clean {
        fn corrupts(&mut self, _size: usize) -> bool {
            false
        }
    }

    fn channel() -> PhysicalChannel {
        PhysicalChannel::new(&ChannelParams::default(), Box::new(Clean))
    }

    #[test]
    fn single_forward_frame_timing() {
        let mut ch = channel();
        // 1000 bytes at 10 Mbps: 0.8 ms serialization.
        let d = ch.transmit(0.0, 1000, Direction::Forward);
        assert!(!d.corrupted);
        assert!((d.at - (0.0008 + 0.040 + 0.002)).abs() < 1e-12);
    }

    #[test]
    fn reverse_path_uses_reverse_propagation() {
        let mut ch = channel();
        let d = ch.transmit(0.0, 1000, Direction::Reverse);
        assert!((d.at - (0.0008 + 0.010 + 0.002)).abs() < 1e-12);
    }

    #[test]
    fn transmitter_serializes_back_to_back_frames() {
        let mut ch = channel();
        let first = ch.transmit(0.0, 1000, Direction::Forward);
        // Second frame queued at t=0 starts serializing only at 0.8 ms and
        // then also waits behind the first frame's 2 ms processing slot.
        let second = ch.transmit(0.0, 1000, Direction::Forward);
        assert!((first.at - 0.0428).abs() < 1e-12);
        assert!((second.at - 0.0448).abs() < 1e-12);
    }

    #[test]
    fn directions_have_independent_processors() {
        let mut ch = channel();
        let fwd = ch.transmit(0.0, 1000, Direction::Forward);
        // The reverse frame shares the transmitter (starts at 0.8 ms) but
        // not the forward receive processor.
        let rev = ch.transmit(0.0, 1000, Direction::Reverse);
        assert!((fwd.at - 0.0428).abs() < 1e-12);
        assert!((rev.at - (0.0016 + 0.010 + 0.002)).abs() < 1e-12);
    }

    #[test]
    fn idle_channel_does_not_queue() {
        let mut ch = channel();
        ch.transmit(0.0, 1000, Direction::Forward);
        // Long after the first frame cleared, timing is as if fresh.
        let d = ch.transmit(10.0, 1000, Direction::Forward);
        assert!((d.at - 10.0428).abs() < 1e-12);
    }

    #[test]
    fn zero_ber_never_corrupts() {
        let params = ChannelParams::noiseless();
        let mut ge = GilbertElliot::new(&params, 7);
        for size in [1usize, 24, 152, 4120] {
            assert!(!ge.corrupts(size));
        }
    }

    #[test]
    fn zero_ber_with_live_transitions_never_corrupts() {
        let params = ChannelParams {
            ber_good: 0.0,
            ber_bad: 0.0,
            ..ChannelParams::default()
        };
        let mut ge = GilbertElliot::new(&params, 99);
        for _ in 0..100 {
            assert!(!ge.corrupts(1048));
        }
    }

    #[test]
    fn certain_bad_state_corrupts() {
        // Transition on the very first bit, then BER 1 in BAD: any frame of
        // two or more bits must be corrupted.
        let params = ChannelParams {
            ber_good: 0.0,
            ber_bad: 1.0,
            good_to_bad: 1.0,
            bad_to_good: 0.0,
            ..ChannelParams::default()
        };
        let mut ge = GilbertElliot::new(&params, 1);
        assert!(ge.corrupts(1));
        assert_eq!(ge.state, ChainState::Bad);
    }

    #[test]
    fn state_persists_across_frames() {
        // Deterministic alternation: every bit flips the state, so a frame
        // with an even bit count ends in the state it started in.
        let params = ChannelParams {
            ber_good: 0.0,
            ber_bad: 0.0,
            good_to_bad: 1.0,
            bad_to_good: 1.0,
            ..ChannelParams::default()
        };
        let mut ge = GilbertElliot::new(&params, 1);
        ge.corrupts(1); // 8 bits, even number of flips
        assert_eq!(ge.state, ChainState::Good);
    }

    #[test]
    fn same_seed_same_verdicts() {
        let params = ChannelParams::default();
        let mut a = GilbertElliot::new(&params, 42);
        let mut b = GilbertElliot::new(&params, 42);
        for size in [128usize, 4120, 24, 536, 1048, 24, 24, 2072] {
            assert_eq!(a.corrupts(size), b.corrupts(size));
        }
    }

    #[test]
    fn geometric_is_at_least_one_trial() {
        let params = ChannelParams::default();
        let mut ge = GilbertElliot::new(&params, 3);
        for _ in 0..1000 {
            assert!(ge.geometric(0.05) >= 1);
        }
        assert_eq!(ge.geometric(1.0), 1);
        assert_eq!(ge.geometric(0.0), u64::MAX);
    }
}

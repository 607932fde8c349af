//! Fixed problem constants and per-run configuration.
//!
//! Everything the problem statement pins down lives here as a `pub const`;
//! everything a run may vary lives in [`SimConfig`].  Validation happens once,
//! up front, so the simulation proper never has to second-guess its inputs:
//! a bad parameter set is rejected before any simulated time elapses.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Physical layer
// ---------------------------------------------------------------------------

/// Link bit rate in bits per second (10 Mbps).
pub const BIT_RATE_BPS: f64 = 10.0e6;
/// One-way propagation delay on the forward (DATA) path, seconds.
pub const PROP_DELAY_FWD_SECS: f64 = 0.040;
/// One-way propagation delay on the reverse (ACK) path, seconds.
pub const PROP_DELAY_REV_SECS: f64 = 0.010;
/// Per-frame processing delay at each receiving endpoint, seconds.
pub const PROCESSING_DELAY_SECS: f64 = 0.002;

// ---------------------------------------------------------------------------
// Gilbert-Elliot error model
// ---------------------------------------------------------------------------

/// Bit error rate while the channel is in the GOOD state.
pub const BER_GOOD: f64 = 1.0e-6;
/// Bit error rate while the channel is in the BAD state.
pub const BER_BAD: f64 = 5.0e-3;
/// Per-bit probability of a GOOD -> BAD transition.
pub const TRANS_GOOD_TO_BAD: f64 = 0.002;
/// Per-bit probability of a BAD -> GOOD transition.
pub const TRANS_BAD_TO_GOOD: f64 = 0.05;

// ---------------------------------------------------------------------------
// Protocol overhead and workload
// ---------------------------------------------------------------------------

/// Transport-layer header, bytes.  Accounted in sizes; carries no content.
pub const TRANSPORT_HEADER_BYTES: usize = 8;
/// Link-layer header, bytes.
pub const LINK_HEADER_BYTES: usize = 24;
/// Total application payload per run: 100 MiB.
pub const FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
/// Receive-side transport buffer bound: 256 KiB.
pub const RECEIVER_BUFFER_BYTES: usize = 256 * 1024;

// ---------------------------------------------------------------------------
// Simulation settings
// ---------------------------------------------------------------------------

/// Retransmission timeout, seconds of simulated time.
pub const DEFAULT_TIMEOUT_SECS: f64 = 0.100;
/// Hard cap on simulated time; a run that has not finished by then is cut.
pub const MAX_SIM_TIME_SECS: f64 = 1000.0;
/// Period of the application pump poll.
pub const PUMP_INTERVAL_SECS: f64 = 0.001;

// ---------------------------------------------------------------------------
// Sweep grid
// ---------------------------------------------------------------------------

/// Window sizes covered by the parameter sweep.
pub const WINDOW_SWEEP: [usize; 6] = [2, 4, 8, 16, 32, 64];
/// Frame payload sizes (bytes) covered by the parameter sweep.
pub const PAYLOAD_SWEEP: [usize; 6] = [128, 256, 512, 1024, 2048, 4096];
/// Seeded repetitions per (W, L) grid point.
pub const RUNS_PER_CONFIG: u32 = 10;

/// Deterministic seed for one sweep point, so individual runs can be
/// reproduced from their `(W, L, run_id)` coordinates alone.
pub fn sweep_seed(window: usize, payload: usize, run_id: u32) -> u64 {
    window as u64 * 10_000 + payload as u64 * 100 + run_id as u64
}

// ---------------------------------------------------------------------------
// ChannelParams
// ---------------------------------------------------------------------------

/// Physical-channel parameters for one run.
///
/// Defaults are the fixed values above; tests override the error-model fields
/// to build deterministic (error-free, transition-free) channels.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    /// Link bit rate, bits per second.
    pub bit_rate: f64,
    /// Forward-path propagation delay, seconds.
    pub prop_fwd: f64,
    /// Reverse-path propagation delay, seconds.
    pub prop_rev: f64,
    /// Per-frame receiver processing delay, seconds.
    pub processing_delay: f64,
    /// Bit error rate in the GOOD state.
    pub ber_good: f64,
    /// Bit error rate in the BAD state.
    pub ber_bad: f64,
    /// Per-bit GOOD -> BAD transition probability.
    pub good_to_bad: f64,
    /// Per-bit BAD -> GOOD transition probability.
    pub bad_to_good: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            bit_rate: BIT_RATE_BPS,
            prop_fwd: PROP_DELAY_FWD_SECS,
            prop_rev: PROP_DELAY_REV_SECS,
            processing_delay: PROCESSING_DELAY_SECS,
            ber_good: BER_GOOD,
            ber_bad: BER_BAD,
            good_to_bad: TRANS_GOOD_TO_BAD,
            bad_to_good: TRANS_BAD_TO_GOOD,
        }
    }
}

impl ChannelParams {
    /// An error-free, transition-free channel: every frame arrives intact.
    pub fn noiseless() -> Self {
        Self {
            ber_good: 0.0,
            ber_bad: 0.0,
            good_to_bad: 0.0,
            bad_to_good: 0.0,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Full configuration of a single simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Sender window size W, in frames.
    pub window: usize,
    /// Link-frame payload budget L, in bytes (transport segment incl. header).
    pub payload: usize,
    /// RNG seed for the channel error process.
    pub seed: u64,
    /// Repetition index within a sweep point; carried into the result row.
    pub run_id: u32,
    /// Total bytes the sender application produces.
    pub file_size: u64,
    /// Retransmission timeout, seconds.
    pub timeout: f64,
    /// Simulated-time cap, seconds.
    pub max_sim_time: f64,
    /// Receive-side transport buffer bound, bytes.
    pub receiver_buffer: usize,
    /// Physical channel parameters.
    pub channel: ChannelParams,
}

impl SimConfig {
    /// Configuration for one sweep point with all workload defaults.
    pub fn new(window: usize, payload: usize, seed: u64, run_id: u32) -> Self {
        Self {
            window,
            payload,
            seed,
            run_id,
            file_size: FILE_SIZE_BYTES,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_sim_time: MAX_SIM_TIME_SECS,
            receiver_buffer: RECEIVER_BUFFER_BYTES,
            channel: ChannelParams::default(),
        }
    }

    /// Reject parameter sets that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.payload <= TRANSPORT_HEADER_BYTES {
            return Err(ConfigError::PayloadTooSmall(self.payload));
        }
        if self.file_size == 0 {
            return Err(ConfigError::EmptyFile);
        }
        if self.receiver_buffer == 0 {
            return Err(ConfigError::ZeroReceiverBuffer);
        }
        let timings = [
            ("bit_rate", self.channel.bit_rate),
            ("prop_fwd", self.channel.prop_fwd),
            ("prop_rev", self.channel.prop_rev),
            ("processing_delay", self.channel.processing_delay),
            ("timeout", self.timeout),
            ("max_sim_time", self.max_sim_time),
        ];
        for (name, value) in timings {
            if value <= 0.0 || !value.is_finite() {
                return Err(ConfigError::NonPositiveParameter { name, value });
            }
        }
        let probabilities = [
            ("ber_good", self.channel.ber_good),
            ("ber_bad", self.channel.ber_bad),
            ("good_to_bad", self.channel.good_to_bad),
            ("bad_to_good", self.channel.bad_to_good),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }

    /// Usable application bytes per segment (`L` minus the transport header).
    pub fn segment_capacity(&self) -> usize {
        self.payload - TRANSPORT_HEADER_BYTES
    }
}

/// A parameter set rejected before the run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window size must be at least 1 frame")]
    ZeroWindow,
    #[error("payload size {0} leaves no room for the {TRANSPORT_HEADER_BYTES}-byte transport header")]
    PayloadTooSmall(usize),
    #[error("file size must be non-zero")]
    EmptyFile,
    #[error("receiver buffer must be non-zero")]
    ZeroReceiverBuffer,
    #[error("{name} must be strictly positive (got {value})")]
    NonPositiveParameter { name: &'static str, value: f64 },
    #[error("{name} must be a probability in [0, 1] (got {value})")]
    InvalidProbability { name: &'static str, value: f64 },
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SimConfig::new(8, 1024, 42, 0);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.segment_capacity(), 1016);
    }

    #[test]
    fn rejects_payload_at_or_below_header() {
        for payload in [0, 4, TRANSPORT_HEADER_BYTES] {
            let cfg = SimConfig::new(8, payload, 0, 0);
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::PayloadTooSmall(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_window() {
        let cfg = SimConfig::new(0, 1024, 0, 0);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn rejects_non_positive_timing() {
        let mut cfg = SimConfig::new(4, 512, 0, 0);
        cfg.channel.bit_rate = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveParameter { name: "bit_rate", .. })
        ));

        let mut cfg = SimConfig::new(4, 512, 0, 0);
        cfg.timeout = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveParameter { name: "timeout", .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mut cfg = SimConfig::new(4, 512, 0, 0);
        cfg.channel.ber_bad = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidProbability { name: "ber_bad", .. })
        ));
    }

    #[test]
    fn seed_formula_matches_sweep_convention() {
        assert_eq!(sweep_seed(2, 4096, 0), 429_600);
        assert_eq!(sweep_seed(64, 128, 9), 652_809);
    }
}

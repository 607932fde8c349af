//! Entry point for `arq-sim`.
//!
//! Runs exactly one simulation point and prints its result row; grid sweeps
//! and CSV collection belong to an outer runner.  `main` owns only process
//! setup (logging, argument parsing) — all simulation work is in the library.

use anyhow::Result;
use clap::Parser;

use arq_sim::config::{self, sweep_seed};
use arq_sim::{RunStats, SimConfig, Simulation};

/// Selective Repeat ARQ simulator over a Gilbert-Elliot channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Sender window size W, in frames.
    #[arg(short = 'w', long, default_value_t = 8)]
    window: usize,

    /// Frame payload size L, in bytes.
    #[arg(short = 'l', long, default_value_t = 1024)]
    payload: usize,

    /// Repetition index within a sweep configuration.
    #[arg(long, default_value_t = 0)]
    run_id: u32,

    /// Channel RNG seed; derived from (W, L, run_id) when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Bytes to transfer.
    #[arg(long, default_value_t = config::FILE_SIZE_BYTES)]
    file_size: u64,

    /// Retransmission timeout in seconds of simulated time.
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout: f64,
}

fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let seed = cli
        .seed
        .unwrap_or_else(|| sweep_seed(cli.window, cli.payload, cli.run_id));

    let mut cfg = SimConfig::new(cli.window, cli.payload, seed, cli.run_id);
    cfg.file_size = cli.file_size;
    cfg.timeout = cli.timeout;

    let mut sim = Simulation::new(cfg)?;
    let row = sim.run();

    println!("{}", RunStats::header());
    println!("{row}");
    Ok(())
}

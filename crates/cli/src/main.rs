//! DRAM scheduler CLI.
//!
//! This binary drives the scheduling core with synthetic workloads. It performs:
//! 1. **Run:** Feed a random or streaming address pattern through the full
//!    memory system and print per-channel statistics.
//! 2. **Ideal:** Replay the same pattern against the fixed-latency baseline
//!    for comparison.
//!
//! Configuration is JSON (`--config`); defaults model a single-channel
//! dual-rank DDR4-2400-class device.

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::rc::Rc;
use std::{fs, process};

use dram_core::config::Config;
use dram_core::system::{IdealMemorySystem, MemorySystem};

#[derive(Parser, Debug)]
#[command(
    name = "dramsched",
    author,
    version,
    about = "Cycle-accurate DRAM command scheduler",
    long_about = "Drive the DRAM scheduling core with synthetic traffic.\n\nExamples:\n  dramsched run --requests 10000 --pattern random\n  dramsched run --config ddr4.json --pattern stream --write-ratio 0.5\n  dramsched ideal --requests 10000 --latency 80"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Synthetic address pattern.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pattern {
    /// Uniformly random request addresses.
    Random,
    /// Sequential requests striding through rows.
    Stream,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a workload through the full scheduler.
    Run {
        /// JSON configuration file (defaults used when absent).
        #[arg(short, long)]
        config: Option<String>,

        /// Number of transactions to issue.
        #[arg(short, long, default_value_t = 100_000)]
        requests: u64,

        /// Address pattern.
        #[arg(short, long, value_enum, default_value_t = Pattern::Random)]
        pattern: Pattern,

        /// Fraction of requests that are writes.
        #[arg(short, long, default_value_t = 0.3)]
        write_ratio: f64,

        /// RNG seed for the random pattern.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Run a workload against the ideal fixed-latency baseline.
    Ideal {
        /// Number of transactions to issue.
        #[arg(short, long, default_value_t = 100_000)]
        requests: u64,

        /// Fixed completion latency in cycles.
        #[arg(short, long, default_value_t = 80)]
        latency: u64,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            requests,
            pattern,
            write_ratio,
            seed,
        } => cmd_run(config, requests, pattern, write_ratio, seed),
        Commands::Ideal {
            requests,
            latency,
            seed,
        } => cmd_ideal(requests, latency, seed),
    }
}

/// Loads a JSON configuration file, or the defaults when `path` is `None`.
fn load_config(path: Option<String>) -> Config {
    match path {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {}", path, e);
                process::exit(1);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {}: {}", path, e);
                process::exit(1);
            })
        }
        None => Config::default(),
    }
}

/// Generates the `i`-th request address for a pattern.
fn gen_addr(pattern: Pattern, i: u64, rng: &mut StdRng) -> u64 {
    match pattern {
        // Stay within 4 GiB so every field of the mapping gets exercised.
        Pattern::Random => rng.gen_range(0..(1u64 << 32)) & !0x3F,
        Pattern::Stream => i * 64,
    }
}

/// Runs the full scheduler on a synthetic workload and prints statistics.
fn cmd_run(config: Option<String>, requests: u64, pattern: Pattern, write_ratio: f64, seed: u64) {
    let config = load_config(config);
    println!(
        "Configuration: {} channel(s), {} rank(s), {} banks/rank, {:?} queues of {}, policy {:?}",
        config.system.channels,
        config.system.ranks,
        config.system.banks(),
        config.sched.queue_structure,
        config.sched.cmd_queue_size,
        config.sched.row_buf_policy,
    );
    println!();

    let reads_done = Rc::new(Cell::new(0u64));
    let writes_done = Rc::new(Cell::new(0u64));
    let r = reads_done.clone();
    let w = writes_done.clone();
    let mut system = MemorySystem::new(
        &config,
        Box::new(move |_| r.set(r.get() + 1)),
        Box::new(move |_| w.set(w.get() + 1)),
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut issued = 0u64;
    let mut next: Option<(u64, bool)> = None;

    while issued < requests || !system.idle() {
        if issued < requests {
            let (addr, is_write) = *next.get_or_insert_with(|| {
                let addr = gen_addr(pattern, issued, &mut rng);
                (addr, rng.gen_bool(write_ratio))
            });
            if system.will_accept_transaction(addr, is_write) {
                system.add_transaction(addr, is_write);
                issued += 1;
                next = None;
            }
        }
        system.clock_tick();
    }

    println!(
        "[*] {} reads and {} writes completed in {} cycles",
        reads_done.get(),
        writes_done.get(),
        system.clk()
    );
    println!();
    system.print_stats();
}

/// Runs the ideal baseline on the random workload and reports cycle count.
fn cmd_ideal(requests: u64, latency: u64, seed: u64) {
    let done = Rc::new(Cell::new(0u64));
    let r = done.clone();
    let w = done.clone();
    let mut system = IdealMemorySystem::new(
        latency,
        Box::new(move |_| r.set(r.get() + 1)),
        Box::new(move |_| w.set(w.get() + 1)),
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut cycles = 0u64;
    for i in 0..requests {
        system.add_transaction(gen_addr(Pattern::Random, i, &mut rng), rng.gen_bool(0.3));
        system.clock_tick();
        cycles += 1;
    }
    while system.in_flight() > 0 {
        system.clock_tick();
        cycles += 1;
    }

    println!(
        "[*] Ideal baseline: {} transactions in {} cycles at fixed latency {}",
        done.get(),
        cycles,
        latency
    );
}

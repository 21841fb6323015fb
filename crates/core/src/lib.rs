//! Cycle-accurate DRAM command scheduling core.
//!
//! This crate implements the command-scheduling heart of a DRAM simulator:
//! 1. **Scheduler:** Per-channel command queues, round-robin ready picking,
//!    on-demand precharge arbitration, and the refresh interlock.
//! 2. **Page policy:** Static OPEN_PAGE/CLOSE_PAGE/SMART_CLOSE selection or
//!    DPM, the per-bank hit-rate-driven hysteresis mode.
//! 3. **Timing:** A reference bank-state timing model implementing the
//!    oracle contract, including refresh generation.
//! 4. **System:** Per-channel controllers and a multi-channel front door
//!    with completion callbacks, plus an ideal fixed-latency baseline.
//! 5. **Support:** Address mapping, serde configuration, and statistics.

/// Shared types: addresses, commands, transactions.
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical structures).
pub mod config;
/// Per-channel controller: transaction buffers and the scheduling loop.
pub mod ctrl;
/// The command scheduling core and its collaborator contracts.
pub mod sched;
/// Scheduling statistics collection and reporting.
pub mod stats;
/// System front door and ideal baseline.
pub mod system;
/// Reference timing model and refresh generation.
pub mod timing;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The per-channel command scheduler.
pub use crate::sched::CommandQueue;
/// Host-facing multi-channel memory system.
pub use crate::system::MemorySystem;

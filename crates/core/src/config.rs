//! Configuration system for the DRAM scheduler.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the simulator. It provides:
//! 1. **Defaults:** Baseline device constants (DDR4-2400-class timing, 2-rank shape).
//! 2. **Structures:** Hierarchical config for system shape, scheduling, and timing.
//! 3. **Enums:** Queue structure and row-buffer policy selection.
//!
//! Configuration is supplied as JSON (`serde_json`) or built with
//! `Config::default()`. Unknown enum variants are rejected at
//! deserialization time, so an unsupported queue structure or page policy
//! never reaches the scheduler.

use serde::Deserialize;

/// Default configuration constants.
///
/// These values describe a single-channel, dual-rank DDR4-2400-class device
/// and are used when a field is not explicitly set.
mod defaults {
    /// Number of independent channels.
    pub const CHANNELS: usize = 1;

    /// Ranks per channel.
    pub const RANKS: usize = 2;

    /// Bank groups per rank.
    pub const BANKGROUPS: usize = 4;

    /// Banks per bank group.
    pub const BANKS_PER_GROUP: usize = 4;

    /// Rows per bank.
    pub const ROWS: usize = 1 << 15;

    /// Columns per row (in request-sized units).
    pub const COLUMNS: usize = 1 << 10;

    /// Bytes moved by one request (one burst).
    pub const REQUEST_BYTES: usize = 64;

    /// Per-queue command capacity.
    pub const CMD_QUEUE_SIZE: usize = 8;

    /// Transaction read-queue capacity per channel.
    pub const TRANS_QUEUE_SIZE: usize = 32;

    /// Write-buffer capacity per channel.
    pub const WRITE_BUFFER_SIZE: usize = 32;

    /// ACT-to-column delay (tRCD).
    pub const T_RCD: u64 = 16;

    /// Precharge-to-ACT delay (tRP).
    pub const T_RP: u64 = 16;

    /// ACT-to-precharge minimum (tRAS).
    pub const T_RAS: u64 = 39;

    /// Column-to-column delay (tCCD).
    pub const T_CCD: u64 = 6;

    /// Read-to-precharge delay (tRTP).
    pub const T_RTP: u64 = 9;

    /// Write recovery after the burst (tWR).
    pub const T_WR: u64 = 18;

    /// CAS (read) latency.
    pub const CL: u64 = 16;

    /// CAS write latency.
    pub const CWL: u64 = 12;

    /// Burst length on the data bus, in cycles.
    pub const BURST_CYCLES: u64 = 4;

    /// Average refresh interval per rank (tREFI).
    pub const T_REFI: u64 = 9360;

    /// Refresh cycle time (tRFC).
    pub const T_RFC: u64 = 420;
}

/// Command queue partitioning.
///
/// Selects whether each rank shares one queue or every bank gets its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStructure {
    /// One queue per bank: `ranks × banks` queues.
    #[default]
    PerBank,
    /// One queue per rank.
    PerRank,
}

/// Row-buffer management policy.
///
/// The channel-level selection; in DPM mode each bank flips between
/// OPEN_PAGE and SMART_CLOSE based on its observed hit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowBufPolicy {
    /// Leave rows open after a column access.
    #[default]
    OpenPage,
    /// Close rows with auto-precharge on every column access.
    ClosePage,
    /// Close a row with auto-precharge when no further row-hit is in flight.
    SmartClose,
    /// Dynamic page mode: per-bank OPEN_PAGE/SMART_CLOSE driven by hit-rate
    /// hysteresis.
    Dpm,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use dram_core::config::{Config, QueueStructure, RowBufPolicy};
///
/// let json = r#"{
///     "system": { "channels": 2, "ranks": 1 },
///     "sched": { "queue_structure": "PER_RANK", "row_buf_policy": "DPM" },
///     "timing": { "t_rcd": 14 }
/// }"#;
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.system.channels, 2);
/// assert_eq!(config.sched.queue_structure, QueueStructure::PerRank);
/// assert_eq!(config.sched.row_buf_policy, RowBufPolicy::Dpm);
/// assert_eq!(config.timing.t_rcd, 14);
/// assert_eq!(config.timing.t_rp, 16);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Device shape and address layout.
    #[serde(default)]
    pub system: SystemConfig,
    /// Queue sizing and page policy.
    #[serde(default)]
    pub sched: SchedConfig,
    /// DRAM timing parameters, in cycles.
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Device shape: channel/rank/bank/row/column counts.
///
/// Every count must be a power of two; the address mapper derives field
/// widths from them.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of independent channels.
    #[serde(default = "SystemConfig::default_channels")]
    pub channels: usize,

    /// Ranks per channel.
    #[serde(default = "SystemConfig::default_ranks")]
    pub ranks: usize,

    /// Bank groups per rank.
    #[serde(default = "SystemConfig::default_bankgroups")]
    pub bankgroups: usize,

    /// Banks per bank group.
    #[serde(default = "SystemConfig::default_banks_per_group")]
    pub banks_per_group: usize,

    /// Rows per bank.
    #[serde(default = "SystemConfig::default_rows")]
    pub rows: usize,

    /// Columns per row, in request-sized units.
    #[serde(default = "SystemConfig::default_columns")]
    pub columns: usize,

    /// Bytes per request; sets how many low address bits carry no mapping.
    #[serde(default = "SystemConfig::default_request_bytes")]
    pub request_bytes: usize,
}

impl SystemConfig {
    /// Total banks per rank.
    #[inline]
    pub fn banks(&self) -> usize {
        self.bankgroups * self.banks_per_group
    }

    fn default_channels() -> usize {
        defaults::CHANNELS
    }

    fn default_ranks() -> usize {
        defaults::RANKS
    }

    fn default_bankgroups() -> usize {
        defaults::BANKGROUPS
    }

    fn default_banks_per_group() -> usize {
        defaults::BANKS_PER_GROUP
    }

    fn default_rows() -> usize {
        defaults::ROWS
    }

    fn default_columns() -> usize {
        defaults::COLUMNS
    }

    fn default_request_bytes() -> usize {
        defaults::REQUEST_BYTES
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            channels: defaults::CHANNELS,
            ranks: defaults::RANKS,
            bankgroups: defaults::BANKGROUPS,
            banks_per_group: defaults::BANKS_PER_GROUP,
            rows: defaults::ROWS,
            columns: defaults::COLUMNS,
            request_bytes: defaults::REQUEST_BYTES,
        }
    }
}

/// Scheduling options: queue shape, capacities, and page policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedConfig {
    /// Command queue partitioning (per bank or per rank).
    #[serde(default)]
    pub queue_structure: QueueStructure,

    /// Per-queue command capacity.
    #[serde(default = "SchedConfig::default_cmd_queue_size")]
    pub cmd_queue_size: usize,

    /// Channel-level row-buffer policy.
    #[serde(default)]
    pub row_buf_policy: RowBufPolicy,

    /// Transaction read-queue capacity per channel.
    #[serde(default = "SchedConfig::default_trans_queue_size")]
    pub trans_queue_size: usize,

    /// Write-buffer capacity per channel.
    #[serde(default = "SchedConfig::default_write_buffer_size")]
    pub write_buffer_size: usize,
}

impl SchedConfig {
    fn default_cmd_queue_size() -> usize {
        defaults::CMD_QUEUE_SIZE
    }

    fn default_trans_queue_size() -> usize {
        defaults::TRANS_QUEUE_SIZE
    }

    fn default_write_buffer_size() -> usize {
        defaults::WRITE_BUFFER_SIZE
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            queue_structure: QueueStructure::default(),
            cmd_queue_size: defaults::CMD_QUEUE_SIZE,
            row_buf_policy: RowBufPolicy::default(),
            trans_queue_size: defaults::TRANS_QUEUE_SIZE,
            write_buffer_size: defaults::WRITE_BUFFER_SIZE,
        }
    }
}

/// DRAM timing parameters, all in memory-clock cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// ACT-to-column delay (tRCD).
    #[serde(default = "TimingConfig::default_t_rcd")]
    pub t_rcd: u64,

    /// Precharge-to-ACT delay (tRP).
    #[serde(default = "TimingConfig::default_t_rp")]
    pub t_rp: u64,

    /// Minimum row-open time before precharge (tRAS).
    #[serde(default = "TimingConfig::default_t_ras")]
    pub t_ras: u64,

    /// Column-to-column command spacing (tCCD).
    #[serde(default = "TimingConfig::default_t_ccd")]
    pub t_ccd: u64,

    /// Read-to-precharge delay (tRTP).
    #[serde(default = "TimingConfig::default_t_rtp")]
    pub t_rtp: u64,

    /// Write recovery time after the data burst (tWR).
    #[serde(default = "TimingConfig::default_t_wr")]
    pub t_wr: u64,

    /// CAS (read) latency.
    #[serde(default = "TimingConfig::default_cl")]
    pub cl: u64,

    /// CAS write latency.
    #[serde(default = "TimingConfig::default_cwl")]
    pub cwl: u64,

    /// Data-bus burst length in cycles.
    #[serde(default = "TimingConfig::default_burst_cycles")]
    pub burst_cycles: u64,

    /// Average refresh interval per rank (tREFI).
    #[serde(default = "TimingConfig::default_t_refi")]
    pub t_refi: u64,

    /// Refresh cycle time (tRFC).
    #[serde(default = "TimingConfig::default_t_rfc")]
    pub t_rfc: u64,
}

impl TimingConfig {
    /// Cycles from READ issue to the last data beat returning.
    #[inline]
    pub fn read_done_delay(&self) -> u64 {
        self.cl + self.burst_cycles
    }

    /// Cycles from WRITE issue to the last data beat landing.
    #[inline]
    pub fn write_done_delay(&self) -> u64 {
        self.cwl + self.burst_cycles
    }

    fn default_t_rcd() -> u64 {
        defaults::T_RCD
    }

    fn default_t_rp() -> u64 {
        defaults::T_RP
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_ccd() -> u64 {
        defaults::T_CCD
    }

    fn default_t_rtp() -> u64 {
        defaults::T_RTP
    }

    fn default_t_wr() -> u64 {
        defaults::T_WR
    }

    fn default_cl() -> u64 {
        defaults::CL
    }

    fn default_cwl() -> u64 {
        defaults::CWL
    }

    fn default_burst_cycles() -> u64 {
        defaults::BURST_CYCLES
    }

    fn default_t_refi() -> u64 {
        defaults::T_REFI
    }

    fn default_t_rfc() -> u64 {
        defaults::T_RFC
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            t_rcd: defaults::T_RCD,
            t_rp: defaults::T_RP,
            t_ras: defaults::T_RAS,
            t_ccd: defaults::T_CCD,
            t_rtp: defaults::T_RTP,
            t_wr: defaults::T_WR,
            cl: defaults::CL,
            cwl: defaults::CWL,
            burst_cycles: defaults::BURST_CYCLES,
            t_refi: defaults::T_REFI,
            t_rfc: defaults::T_RFC,
        }
    }
}

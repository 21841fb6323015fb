//! Top-level memory system.
//!
//! This module is the host-facing front door. It provides:
//! 1. **MemorySystem:** Channel extraction, transaction fan-out, per-cycle
//!    completion drain, and aggregated statistics.
//! 2. **Row-hit distance tracking:** Per-bank history of recently touched
//!    rows and a binned histogram of repeat-touch distances.
//! 3. **IdealMemorySystem:** An infinite-bandwidth, fixed-latency baseline
//!    for calibrating what a perfect memory could do for a workload.

use std::collections::BTreeMap;

use crate::common::{AddressMapper, Transaction};
use crate::config::Config;
use crate::ctrl::Controller;
use crate::stats::SchedStats;

/// Rows remembered per bank for distance tracking.
const MAX_ROW_HISTORY: usize = 64;

/// One remembered row touch.
#[derive(Clone, Copy, Debug, Default)]
struct RowAccessRecord {
    row: u64,
    timestamp: u64,
}

/// Circular history of the most recent distinct rows touched in one bank.
#[derive(Clone, Debug)]
struct BankRowHistory {
    records: [RowAccessRecord; MAX_ROW_HISTORY],
    head: usize,
    count: usize,
}

impl Default for BankRowHistory {
    fn default() -> Self {
        Self {
            records: [RowAccessRecord::default(); MAX_ROW_HISTORY],
            head: 0,
            count: 0,
        }
    }
}

/// Host completion callback: invoked with the transaction's flat address.
pub type DoneCallback = Box<dyn FnMut(u64)>;

/// Multi-channel DRAM memory system.
///
/// Owns one controller per channel and routes transactions by the channel
/// bits of their address. Completions are reported through the read/write
/// callbacks during `clock_tick`.
pub struct MemorySystem {
    mapper: AddressMapper,
    ctrls: Vec<Controller>,
    clk: u64,
    read_callback: DoneCallback,
    write_callback: DoneCallback,

    banks_per_rank: usize,
    banks_per_group: usize,
    ranks: usize,
    t_refi: u64,
    t_ccd: u64,
    row_history: Vec<BankRowHistory>,
    row_hit_distance_histogram: BTreeMap<u64, u64>,
}

impl MemorySystem {
    /// Builds the system from a configuration and completion callbacks.
    pub fn new(config: &Config, read_callback: DoneCallback, write_callback: DoneCallback) -> Self {
        let sys = &config.system;
        let total_banks = sys.channels * sys.ranks * sys.banks();
        Self {
            mapper: AddressMapper::new(config),
            ctrls: (0..sys.channels).map(|ch| Controller::new(ch, config)).collect(),
            clk: 0,
            read_callback,
            write_callback,
            banks_per_rank: sys.banks(),
            banks_per_group: sys.banks_per_group,
            ranks: sys.ranks,
            t_refi: config.timing.t_refi,
            t_ccd: config.timing.t_ccd,
            row_history: vec![BankRowHistory::default(); total_banks],
            row_hit_distance_histogram: BTreeMap::new(),
        }
    }

    /// Returns true iff the target channel can accept this transaction now.
    pub fn will_accept_transaction(&self, hex_addr: u64, is_write: bool) -> bool {
        let channel = self.mapper.channel_of(hex_addr);
        self.ctrls[channel].will_accept_transaction(is_write)
    }

    /// Routes a transaction to its channel.
    ///
    /// Returns false when that channel's buffer is full; the host retries.
    pub fn add_transaction(&mut self, hex_addr: u64, is_write: bool) -> bool {
        let channel = self.mapper.channel_of(hex_addr);
        if !self.ctrls[channel].will_accept_transaction(is_write) {
            return false;
        }
        self.record_row_access(hex_addr, channel);
        self.ctrls[channel].add_transaction(Transaction::new(hex_addr, is_write))
    }

    /// Advances every channel one cycle, draining completions first.
    pub fn clock_tick(&mut self) {
        for ctrl in &mut self.ctrls {
            while let Some((addr, is_write)) = ctrl.return_done_transaction(self.clk) {
                if is_write {
                    (self.write_callback)(addr);
                } else {
                    (self.read_callback)(addr);
                }
            }
        }
        for ctrl in &mut self.ctrls {
            ctrl.clock_tick();
        }
        self.clk += 1;
    }

    /// Current system cycle.
    #[inline]
    pub fn clk(&self) -> u64 {
        self.clk
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.ctrls.len()
    }

    /// True iff every channel is fully drained.
    pub fn idle(&self) -> bool {
        self.ctrls.iter().all(|c| c.idle())
    }

    /// Statistics snapshot of one channel.
    pub fn channel_stats(&self, channel: usize) -> SchedStats {
        self.ctrls[channel].stats()
    }

    /// Per-channel controller access (read-only, for inspection).
    pub fn controller(&self, channel: usize) -> &Controller {
        &self.ctrls[channel]
    }

    /// Prints per-channel statistics and the row-hit distance histogram.
    pub fn print_stats(&self) {
        for ctrl in &self.ctrls {
            ctrl.stats().print(ctrl.channel());
        }
        self.print_row_hit_distance();
    }

    /// Notes a row touch and the distance to any earlier touch of the same
    /// row still in this bank's history.
    fn record_row_access(&mut self, hex_addr: u64, channel: usize) {
        let addr = self.mapper.decode(hex_addr);
        let bank_idx = channel * (self.ranks * self.banks_per_rank)
            + addr.rank * self.banks_per_rank
            + addr.bankgroup * self.banks_per_group
            + addr.bank;

        let history = &mut self.row_history[bank_idx];
        for record in history.records[..history.count].iter() {
            if record.row == addr.row {
                let distance = self.clk - record.timestamp;
                *self.row_hit_distance_histogram.entry(distance).or_insert(0) += 1;
            }
        }
        for record in history.records[..history.count].iter_mut() {
            if record.row == addr.row {
                record.timestamp = self.clk;
                return;
            }
        }
        history.records[history.head] = RowAccessRecord {
            row: addr.row,
            timestamp: self.clk,
        };
        history.head = (history.head + 1) % MAX_ROW_HISTORY;
        if history.count < MAX_ROW_HISTORY {
            history.count += 1;
        }
    }

    /// Prints the repeat-touch distance distribution with doubling-width
    /// bins capped at the refresh interval.
    fn print_row_hit_distance(&self) {
        println!("----------------------------------------------------------");
        println!("ROW HIT DISTANCE DISTRIBUTION");
        println!("----------------------------------------------------------");

        // A degenerate config with no refresh interval still gets a bounded
        // histogram.
        let max_distance = if self.t_refi == 0 { 10_000 } else { self.t_refi };
        let base_bin = (self.t_ccd * 2).max(8);

        let mut total_hits = 0u64;
        let mut overflow = 0u64;
        let mut start = 0u64;
        let mut width = base_bin;
        let mut bins: Vec<(u64, u64, u64)> = Vec::new();
        while start < max_distance {
            let end = (start + width - 1).min(max_distance - 1);
            bins.push((start, end, 0));
            start = end + 1;
            width *= 2;
        }
        for (&distance, &count) in &self.row_hit_distance_histogram {
            if distance >= max_distance {
                overflow += count;
                continue;
            }
            if let Some(bin) = bins.iter_mut().find(|(s, e, _)| distance >= *s && distance <= *e)
            {
                bin.2 += count;
            }
        }
        for (s, e, count) in &bins {
            println!("distance[{}-{}]: {}", s, e, count);
            total_hits += count;
        }
        println!("distance[>={}]: {}", max_distance, overflow);
        total_hits += overflow;
        println!("total_row_hits: {}", total_hits);
    }
}

/// Infinite-bandwidth, fixed-latency memory baseline.
///
/// Accepts every transaction and completes it exactly `latency` cycles
/// later. Useful for establishing what a perfect memory standard could do
/// for a given workload.
pub struct IdealMemorySystem {
    latency: u64,
    clk: u64,
    buffer: Vec<Transaction>,
    read_callback: DoneCallback,
    write_callback: DoneCallback,
}

impl IdealMemorySystem {
    /// Creates the baseline with a fixed completion latency.
    pub fn new(latency: u64, read_callback: DoneCallback, write_callback: DoneCallback) -> Self {
        Self {
            latency,
            clk: 0,
            buffer: Vec::new(),
            read_callback,
            write_callback,
        }
    }

    /// Always accepts.
    pub fn add_transaction(&mut self, hex_addr: u64, is_write: bool) -> bool {
        let mut trans = Transaction::new(hex_addr, is_write);
        trans.added_cycle = self.clk;
        self.buffer.push(trans);
        true
    }

    /// Completes everything older than the fixed latency.
    pub fn clock_tick(&mut self) {
        let clk = self.clk;
        let latency = self.latency;
        let mut done = Vec::new();
        self.buffer.retain(|t| {
            if clk - t.added_cycle >= latency {
                done.push(*t);
                false
            } else {
                true
            }
        });
        for t in done {
            if t.is_write {
                (self.write_callback)(t.addr);
            } else {
                (self.read_callback)(t.addr);
            }
        }
        self.clk += 1;
    }

    /// Transactions still in flight.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.buffer.len()
    }
}

//! Per-channel command queues and arbitration.
//!
//! This module implements the command scheduling core. It provides:
//! 1. **Queue set:** Bounded per-bank or per-rank command queues.
//! 2. **Ready picker:** Round-robin selection of the first timing-legal
//!    command, with write-after-read blocking and on-demand precharge
//!    arbitration.
//! 3. **Refresh interlock:** Quiescing of affected queues while a refresh is
//!    in flight, and counter reset on its completion.
//!
//! Row-hit statistics feed the DPM page-policy arbiter in `page_policy`.

use std::collections::HashSet;

use crate::common::{Command, CommandType};
use crate::config::{Config, QueueStructure, RowBufPolicy};

use super::traits::{ChannelTiming, TransactionSource};

/// Fairness cap on consecutive row hits before a competing precharge may
/// close the row anyway.
pub const ROW_HIT_CAP: u32 = 4;

/// Fixed period, in cycles, of the page-policy arbitration window.
pub const ARBITRATION_PERIOD: u64 = 1000;

/// Per-channel command scheduler.
///
/// Owns the pending DRAM commands for one channel, grouped per bank or per
/// rank, plus all derived bookkeeping: victim lists, row-hit counters,
/// per-bank page policy, the DPM hysteresis counters, and the refresh
/// interlock state.
pub struct CommandQueue {
    channel: usize,
    queue_structure: QueueStructure,
    channel_policy: RowBufPolicy,
    banks: usize,
    banks_per_group: usize,
    num_queues: usize,
    queue_size: usize,

    queues: Vec<Vec<Command>>,
    /// Recently precharged commands per queue; a later precharge of the same
    /// row marks the access pattern as a repeat hit on a prematurely closed
    /// row.
    pub victim_cmds: Vec<Vec<Command>>,
    /// Row-hit R/W commands picked per queue, counting repeat hits on victim
    /// rows.
    pub true_row_hit_count: Vec<u64>,
    /// Row-hit R/W commands picked per queue, demand hits only.
    pub demand_row_hit_count: Vec<u64>,
    /// Total R/W commands picked per queue.
    pub total_command_count: Vec<u64>,
    /// Effective page policy per queue. In DPM mode the arbiter rewrites this
    /// every arbitration window.
    pub row_buf_policy: Vec<RowBufPolicy>,
    /// Cleared (set false) for a rank whenever a command is accepted for it.
    pub rank_q_empty: Vec<bool>,

    pub(super) bank_sm: Vec<u8>,

    ref_q_indices: HashSet<usize>,
    is_in_ref: bool,

    queue_idx: usize,
    clk: u64,

    num_ondemand_pres: u64,
}

impl CommandQueue {
    /// Creates the scheduler for one channel.
    ///
    /// Queue count follows the configured structure: `ranks × banks` for
    /// PER_BANK, `ranks` for PER_RANK. In DPM mode every bank starts in
    /// OPEN_PAGE with its hysteresis counter at 3.
    pub fn new(channel: usize, config: &Config) -> Self {
        let sys = &config.system;
        let banks = sys.banks();
        let num_queues = match config.sched.queue_structure {
            QueueStructure::PerBank => sys.ranks * banks,
            QueueStructure::PerRank => sys.ranks,
        };
        let per_bank_policy = match config.sched.row_buf_policy {
            RowBufPolicy::Dpm => RowBufPolicy::OpenPage,
            other => other,
        };
        Self {
            channel,
            queue_structure: config.sched.queue_structure,
            channel_policy: config.sched.row_buf_policy,
            banks,
            banks_per_group: sys.banks_per_group,
            num_queues,
            queue_size: config.sched.cmd_queue_size,
            queues: (0..num_queues)
                .map(|_| Vec::with_capacity(config.sched.cmd_queue_size))
                .collect(),
            victim_cmds: vec![Vec::new(); num_queues],
            true_row_hit_count: vec![0; num_queues],
            demand_row_hit_count: vec![0; num_queues],
            total_command_count: vec![0; num_queues],
            row_buf_policy: vec![per_bank_policy; num_queues],
            rank_q_empty: vec![true; sys.ranks],
            bank_sm: vec![3; num_queues],
            ref_q_indices: HashSet::new(),
            is_in_ref: false,
            queue_idx: 0,
            clk: 0,
            num_ondemand_pres: 0,
        }
    }

    /// Advances the scheduler clock by one cycle.
    pub fn clock_tick(&mut self) {
        self.clk += 1;
    }

    /// Returns true iff the queue for this bank triple has room for one more
    /// command.
    pub fn will_accept_command(&self, rank: usize, bankgroup: usize, bank: usize) -> bool {
        let qi = self.get_queue_index(rank, bankgroup, bank);
        self.queues[qi].len() < self.queue_size
    }

    /// Appends a command to its bank's queue.
    ///
    /// Returns false on overflow. An overflowing queue is too congested for
    /// row-hit bookkeeping to stay meaningful, so its victim list is cleared.
    pub fn add_command(&mut self, cmd: Command) -> bool {
        let qi = self.get_queue_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
        if self.queues[qi].len() < self.queue_size {
            self.queues[qi].push(cmd);
            self.rank_q_empty[cmd.addr.rank] = false;
            true
        } else {
            self.victim_cmds[qi].clear();
            false
        }
    }

    /// Returns true iff every queue is empty.
    pub fn queue_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    /// Total commands pending across all queues.
    pub fn queue_usage(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    /// Maps a bank triple to its queue index.
    pub fn get_queue_index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        match self.queue_structure {
            QueueStructure::PerRank => rank,
            QueueStructure::PerBank => {
                rank * self.banks + bankgroup * self.banks_per_group + bank
            }
        }
    }

    /// Picks one command that is legal to issue this cycle, or `None`.
    ///
    /// Queues are visited strictly round-robin, advancing before inspecting,
    /// so consecutive calls in one cycle serve distinct queues. Queues frozen
    /// for an in-flight refresh are skipped. A picked R/W command is removed
    /// from its queue, may be upgraded to its auto-precharge form under
    /// SMART_CLOSE, and bumps this queue's total command count; a
    /// prerequisite ACTIVATE or PRECHARGE is returned as-is with its R/W
    /// still queued.
    pub fn get_command_to_issue(
        &mut self,
        timing: &dyn ChannelTiming,
        host: &dyn TransactionSource,
    ) -> Option<Command> {
        for _ in 0..self.num_queues {
            self.queue_idx += 1;
            if self.queue_idx == self.num_queues {
                self.queue_idx = 0;
            }
            let qi = self.queue_idx;
            if self.is_in_ref && self.ref_q_indices.contains(&qi) {
                continue;
            }
            let Some(mut cmd) = self.first_ready_in_queue(qi, timing) else {
                continue;
            };
            if cmd.is_read_write() {
                let mut auto_pre_added = false;
                let row_hit_count = self.count_row_hit_siblings(qi, &cmd, host);

                // The candidate itself is still queued and counted, so a
                // count of one means no other row hit is in flight: the end
                // of the cluster, and the moment to fold in the precharge.
                if self.row_buf_policy[qi] == RowBufPolicy::SmartClose && row_hit_count == 1 {
                    cmd.cmd_type = match cmd.cmd_type {
                        CommandType::Read => CommandType::ReadPrecharge,
                        CommandType::Write => CommandType::WritePrecharge,
                        other => other,
                    };
                    auto_pre_added = true;
                }

                self.erase_rw_command(&cmd, auto_pre_added);
                self.total_command_count[qi] += 1;
            }
            return Some(cmd);
        }
        None
    }

    /// Counts queued commands and buffered transactions targeting the same
    /// row as `cmd` on the same bank.
    ///
    /// Assembled in the order: queued writes, write buffer, queued reads,
    /// read queue. Transactions in the external buffers only count while the
    /// queue has spare capacity, since a full queue cannot absorb them.
    fn count_row_hit_siblings(
        &self,
        qi: usize,
        cmd: &Command,
        host: &dyn TransactionSource,
    ) -> usize {
        let queue = &self.queues[qi];
        let spare = queue.len() < self.queue_size;
        let buffered_hit = |c: &Command| {
            c.addr.channel == cmd.addr.channel && c.same_bank(cmd) && c.addr.row == cmd.addr.row
        };

        let mut count = queue
            .iter()
            .filter(|x| x.same_bank(cmd) && x.addr.row == cmd.addr.row && x.is_write())
            .count();
        if spare {
            count += host
                .write_buffer()
                .iter()
                .filter(|t| buffered_hit(&host.trans_to_command(t)))
                .count();
        }
        count += queue
            .iter()
            .filter(|x| x.same_bank(cmd) && x.addr.row == cmd.addr.row && x.is_read())
            .count();
        if spare {
            count += host
                .read_queue()
                .iter()
                .filter(|t| buffered_hit(&host.trans_to_command(t)))
                .count();
        }
        count
    }

    /// Scans one queue front to back for the first command the oracle deems
    /// legal, updating row-hit statistics along the way.
    ///
    /// A ready WRITE blocked by an earlier READ to the same address is
    /// skipped. A ready PRECHARGE must pass `arbitrate_precharge`; on
    /// success the R/W that requested it is flagged `induced_precharge`, the
    /// victim list is consulted for a repeat hit on the closing row, and the
    /// precharge joins the victim list.
    fn first_ready_in_queue(
        &mut self,
        qi: usize,
        timing: &dyn ChannelTiming,
    ) -> Option<Command> {
        for pos in 0..self.queues[qi].len() {
            let queued = self.queues[qi][pos];
            let Some(cmd) = timing.ready_command(&queued, self.clk) else {
                continue;
            };

            let mut true_row_hit = false;
            if cmd.is_read_write() {
                // A write will not issue past an unreturned read to the same
                // address; read-after-write is filtered upstream.
                if cmd.is_write() && self.has_rw_dependency(qi, pos) {
                    continue;
                }
                if self.queues[qi][pos].induced_precharge {
                    // Already counted when its precharge was scheduled.
                    self.queues[qi][pos].induced_precharge = false;
                } else {
                    true_row_hit = true;
                    self.demand_row_hit_count[qi] += 1;
                }
            } else if cmd.cmd_type == CommandType::Precharge {
                if !self.arbitrate_precharge(qi, pos, timing) {
                    continue;
                }
                self.num_ondemand_pres += 1;
                self.queues[qi][pos].induced_precharge = true;
                let row = self.queues[qi][pos].addr.row;
                if self.victim_cmds[qi].iter().any(|v| v.addr.row == row) {
                    // The row we are closing was itself closed prematurely
                    // before; a repeat closure counts as a true hit.
                    true_row_hit = true;
                }
                self.victim_cmds[qi].push(cmd);
            }

            if true_row_hit {
                self.true_row_hit_count[qi] += 1;
            }
            return Some(cmd);
        }
        None
    }

    /// Returns true iff a predecessor READ in the queue targets the same
    /// (rank, bankgroup, bank, row, column) as the command at `pos`.
    fn has_rw_dependency(&self, qi: usize, pos: usize) -> bool {
        let queue = &self.queues[qi];
        let cmd = &queue[pos];
        queue[..pos].iter().any(|prev| {
            prev.is_read()
                && prev.same_bank(cmd)
                && prev.addr.row == cmd.addr.row
                && prev.addr.column == cmd.addr.column
        })
    }

    /// Decides whether an on-demand PRECHARGE at `pos` may issue.
    ///
    /// Denied when a predecessor targets the same bank (ordering), or when
    /// row hits for the currently open row are still pending and the bank has
    /// not yet exhausted its consecutive-row-hit allowance.
    fn arbitrate_precharge(&self, qi: usize, pos: usize, timing: &dyn ChannelTiming) -> bool {
        let queue = &self.queues[qi];
        let cmd = &queue[pos];

        if queue[..pos].iter().any(|prev| prev.same_bank(cmd)) {
            return false;
        }

        let mut pending_row_hits_exist = false;
        if let Some(open_row) =
            timing.open_row(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank)
        {
            pending_row_hits_exist = queue[pos..]
                .iter()
                .any(|pending| pending.addr.row == open_row && pending.same_bank(cmd));
        }

        let rowhit_limit_reached =
            timing.row_hit_count(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank)
                >= ROW_HIT_CAP;

        !pending_row_hits_exist || rowhit_limit_reached
    }

    /// Drives the refresh interlock while a refresh is pending.
    ///
    /// On first entry the affected queue indices are frozen. Each call asks
    /// the oracle for the next step: a PRECHARGE closing an open row, the
    /// REFRESH itself, or `None` when neither is legal yet. Once the REFRESH
    /// is returned, victim lists and all row-hit counters of the frozen
    /// queues are reset and the interlock is released.
    pub fn finish_refresh(&mut self, timing: &dyn ChannelTiming) -> Option<Command> {
        let ref_cmd = timing.pending_ref_command()?;
        if !self.is_in_ref {
            self.collect_ref_q_indices(&ref_cmd);
            self.is_in_ref = true;
        }

        let cmd = timing.ready_command(&ref_cmd, self.clk)?;

        if cmd.is_refresh() {
            for &i in &self.ref_q_indices {
                self.victim_cmds[i].clear();
                self.total_command_count[i] = 0;
                self.true_row_hit_count[i] = 0;
                self.demand_row_hit_count[i] = 0;
            }
            self.ref_q_indices.clear();
            self.is_in_ref = false;
        }
        Some(cmd)
    }

    /// Collects the queue indices quiesced by `ref_cmd`.
    fn collect_ref_q_indices(&mut self, ref_cmd: &Command) {
        if ref_cmd.cmd_type == CommandType::Refresh {
            match self.queue_structure {
                QueueStructure::PerBank => {
                    for i in 0..self.num_queues {
                        if i / self.banks == ref_cmd.addr.rank {
                            self.ref_q_indices.insert(i);
                        }
                    }
                }
                QueueStructure::PerRank => {
                    self.ref_q_indices.insert(ref_cmd.addr.rank);
                }
            }
        } else {
            let qi = self.get_queue_index(
                ref_cmd.addr.rank,
                ref_cmd.addr.bankgroup,
                ref_cmd.addr.bank,
            );
            self.ref_q_indices.insert(qi);
        }
    }

    /// Removes the queue entry a picked R/W command came from.
    ///
    /// With `auto_pre_added` the picked command carries the auto-precharge
    /// type while its queue entry still holds the plain READ/WRITE, so the
    /// match is by `hex_addr` plus the downgraded type.
    ///
    /// # Panics
    ///
    /// Panics when no matching entry exists: every picked R/W must originate
    /// in its queue, and a miss means that invariant is broken.
    fn erase_rw_command(&mut self, cmd: &Command, auto_pre_added: bool) {
        let qi = self.get_queue_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
        let queue = &mut self.queues[qi];
        for pos in 0..queue.len() {
            let entry = &queue[pos];
            if cmd.hex_addr != entry.hex_addr {
                continue;
            }
            let plain_match = !auto_pre_added && cmd.cmd_type == entry.cmd_type;
            let upgraded_read = auto_pre_added
                && cmd.cmd_type == CommandType::ReadPrecharge
                && entry.cmd_type == CommandType::Read;
            let upgraded_write = auto_pre_added
                && cmd.cmd_type == CommandType::WritePrecharge
                && entry.cmd_type == CommandType::Write;
            if plain_match || upgraded_read || upgraded_write {
                queue.remove(pos);
                return;
            }
        }
        panic!("cannot find command to erase: {}", cmd);
    }

    /// Channel this scheduler belongs to.
    #[inline]
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Number of queues (ranks, or ranks × banks).
    #[inline]
    pub fn num_queues(&self) -> usize {
        self.num_queues
    }

    /// Pending commands in one queue.
    #[inline]
    pub fn queue_len(&self, qi: usize) -> usize {
        self.queues[qi].len()
    }

    /// Channel-level policy this scheduler was configured with.
    #[inline]
    pub fn channel_policy(&self) -> RowBufPolicy {
        self.channel_policy
    }

    /// True while a refresh holds queues quiesced.
    #[inline]
    pub fn in_refresh(&self) -> bool {
        self.is_in_ref
    }

    /// Queue indices currently frozen for the in-flight refresh.
    #[inline]
    pub fn ref_queue_indices(&self) -> &HashSet<usize> {
        &self.ref_q_indices
    }

    /// DPM hysteresis counters, one per queue.
    #[inline]
    pub fn bank_sm(&self) -> &[u8] {
        &self.bank_sm
    }

    /// On-demand precharges granted by `arbitrate_precharge`.
    #[inline]
    pub fn num_ondemand_pres(&self) -> u64 {
        self.num_ondemand_pres
    }

    /// Current scheduler clock.
    #[inline]
    pub fn clk(&self) -> u64 {
        self.clk
    }
}

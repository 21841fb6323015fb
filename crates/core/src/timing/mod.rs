//! Reference timing model.
//!
//! This module implements the `ChannelTiming` oracle for one channel. It
//! provides:
//! 1. **Bank state:** Open row, consecutive row-hit count, and
//!    earliest-legal-cycle bookkeeping per bank.
//! 2. **Prerequisites:** `ready_command` resolves a wanted R/W into itself,
//!    an ACTIVATE, a PRECHARGE, or nothing-yet.
//! 3. **Refresh generation:** An all-bank refresh per rank on the tREFI
//!    cadence, rotating ranks.
//!
//! The model is deliberately coarse compared to a full device model (no
//! four-activate window, no rank-to-rank turnaround); it is exact about the
//! constraints the scheduler arbitrates on: row state, tRCD/tRP/tRAS
//! ordering, column spacing, and refresh quiescing.

use crate::common::{Address, Command, CommandType};
use crate::config::{Config, TimingConfig};
use crate::sched::ChannelTiming;

/// Timing state of one bank.
#[derive(Clone, Copy, Debug)]
struct BankState {
    /// Currently open row, or `None` when precharged.
    open_row: Option<u64>,
    /// Consecutive column commands to the open row since its ACTIVATE.
    row_hit_count: u32,
    /// Earliest cycle an ACTIVATE may issue.
    act_allowed: u64,
    /// Earliest cycle a column command may issue once the row is open.
    cas_allowed: u64,
    /// Earliest cycle a PRECHARGE may issue.
    pre_allowed: u64,
}

impl Default for BankState {
    fn default() -> Self {
        Self {
            open_row: None,
            row_hit_count: 0,
            act_allowed: 0,
            cas_allowed: 0,
            pre_allowed: 0,
        }
    }
}

/// Per-channel DRAM timing state and refresh generator.
pub struct ChannelState {
    channel: usize,
    timing: TimingConfig,
    ranks: usize,
    banks: usize,
    banks_per_group: usize,
    bank_states: Vec<BankState>,
    /// Refresh currently demanded of the scheduler, if any.
    pending_ref: Option<Command>,
    /// Cycle the next refresh becomes due.
    next_ref_due: u64,
    /// Rank the next refresh targets; rotates on completion.
    next_ref_rank: usize,
}

impl ChannelState {
    /// Creates the timing state for one channel.
    pub fn new(channel: usize, config: &Config) -> Self {
        let sys = &config.system;
        Self {
            channel,
            timing: config.timing.clone(),
            ranks: sys.ranks,
            banks: sys.banks(),
            banks_per_group: sys.banks_per_group,
            bank_states: vec![BankState::default(); sys.ranks * sys.banks()],
            pending_ref: None,
            next_ref_due: config.timing.t_refi,
            next_ref_rank: 0,
        }
    }

    #[inline]
    fn bank_index(&self, rank: usize, bankgroup: usize, bank: usize) -> usize {
        rank * self.banks + bankgroup * self.banks_per_group + bank
    }

    #[inline]
    fn bank(&self, rank: usize, bankgroup: usize, bank: usize) -> &BankState {
        &self.bank_states[self.bank_index(rank, bankgroup, bank)]
    }

    /// Raises the pending refresh once its due cycle passes.
    ///
    /// Called once per cycle by the owning controller before scheduling.
    pub fn tick(&mut self, clk: u64) {
        if self.pending_ref.is_none() && clk >= self.next_ref_due {
            let addr = Address::new(self.channel, self.next_ref_rank, 0, 0, 0, 0);
            self.pending_ref = Some(Command::new(CommandType::Refresh, addr, 0));
        }
    }

    /// Applies an issued command to the bank state.
    ///
    /// The scheduler only reads this model; the controller calls `update`
    /// for every command it actually puts on the bus.
    pub fn update(&mut self, cmd: &Command, clk: u64) {
        let t = self.timing.clone();
        match cmd.cmd_type {
            CommandType::Activate => {
                let bank = self.bank_state_mut(cmd);
                bank.open_row = Some(cmd.addr.row);
                bank.row_hit_count = 0;
                bank.cas_allowed = clk + t.t_rcd;
                bank.pre_allowed = bank.pre_allowed.max(clk + t.t_ras);
            }
            CommandType::Read => {
                let bank = self.bank_state_mut(cmd);
                bank.row_hit_count += 1;
                bank.cas_allowed = clk + t.t_ccd;
                bank.pre_allowed = bank.pre_allowed.max(clk + t.t_rtp);
            }
            CommandType::Write => {
                let bank = self.bank_state_mut(cmd);
                bank.row_hit_count += 1;
                bank.cas_allowed = clk + t.t_ccd;
                bank.pre_allowed = bank
                    .pre_allowed
                    .max(clk + t.cwl + t.burst_cycles + t.t_wr);
            }
            CommandType::ReadPrecharge => {
                let bank = self.bank_state_mut(cmd);
                bank.open_row = None;
                bank.row_hit_count = 0;
                bank.act_allowed = clk + t.t_rtp + t.t_rp;
            }
            CommandType::WritePrecharge => {
                let bank = self.bank_state_mut(cmd);
                bank.open_row = None;
                bank.row_hit_count = 0;
                bank.act_allowed = clk + t.cwl + t.burst_cycles + t.t_wr + t.t_rp;
            }
            CommandType::Precharge => {
                let bank = self.bank_state_mut(cmd);
                bank.open_row = None;
                bank.row_hit_count = 0;
                bank.act_allowed = clk + t.t_rp;
            }
            CommandType::Refresh => {
                let rank = cmd.addr.rank;
                for i in rank * self.banks..(rank + 1) * self.banks {
                    self.bank_states[i].act_allowed = clk + t.t_rfc;
                }
                self.refresh_done(clk);
            }
            CommandType::RefreshBank => {
                let bank = self.bank_state_mut(cmd);
                bank.act_allowed = clk + t.t_rfc;
                self.refresh_done(clk);
            }
        }
    }

    fn bank_state_mut(&mut self, cmd: &Command) -> &mut BankState {
        let idx = self.bank_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
        &mut self.bank_states[idx]
    }

    fn refresh_done(&mut self, clk: u64) {
        self.pending_ref = None;
        self.next_ref_rank = (self.next_ref_rank + 1) % self.ranks;
        self.next_ref_due = clk + self.timing.t_refi;
    }

    /// Ready resolution for an all-bank or single-bank refresh: close open
    /// rows first, then the refresh itself once every affected bank has been
    /// precharged long enough.
    fn ready_refresh(&self, cmd: &Command, clk: u64) -> Option<Command> {
        let range = match cmd.cmd_type {
            CommandType::Refresh => {
                let rank = cmd.addr.rank;
                rank * self.banks..(rank + 1) * self.banks
            }
            _ => {
                let idx = self.bank_index(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
                idx..idx + 1
            }
        };

        for idx in range.clone() {
            let bank = &self.bank_states[idx];
            if let Some(open_row) = bank.open_row {
                if clk < bank.pre_allowed {
                    return None;
                }
                let local = idx - cmd.addr.rank * self.banks;
                let addr = Address::new(
                    cmd.addr.channel,
                    cmd.addr.rank,
                    local / self.banks_per_group,
                    local % self.banks_per_group,
                    open_row,
                    0,
                );
                return Some(Command::new(CommandType::Precharge, addr, cmd.hex_addr));
            }
        }

        if range.clone().all(|idx| clk >= self.bank_states[idx].act_allowed) {
            Some(*cmd)
        } else {
            None
        }
    }
}

impl ChannelTiming for ChannelState {
    fn ready_command(&self, cmd: &Command, clk: u64) -> Option<Command> {
        match cmd.cmd_type {
            CommandType::Read
            | CommandType::Write
            | CommandType::ReadPrecharge
            | CommandType::WritePrecharge => {
                let bank = self.bank(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
                match bank.open_row {
                    Some(row) if row == cmd.addr.row => {
                        if clk >= bank.cas_allowed {
                            Some(*cmd)
                        } else {
                            None
                        }
                    }
                    Some(_) => {
                        // Row conflict: the open row must close first.
                        if clk >= bank.pre_allowed {
                            Some(Command::new(CommandType::Precharge, cmd.addr, cmd.hex_addr))
                        } else {
                            None
                        }
                    }
                    None => {
                        if clk >= bank.act_allowed {
                            Some(Command::new(CommandType::Activate, cmd.addr, cmd.hex_addr))
                        } else {
                            None
                        }
                    }
                }
            }
            CommandType::Activate => {
                let bank = self.bank(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
                if bank.open_row.is_none() && clk >= bank.act_allowed {
                    Some(*cmd)
                } else {
                    None
                }
            }
            CommandType::Precharge => {
                let bank = self.bank(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank);
                if clk >= bank.pre_allowed {
                    Some(*cmd)
                } else {
                    None
                }
            }
            CommandType::Refresh | CommandType::RefreshBank => self.ready_refresh(cmd, clk),
        }
    }

    fn open_row(&self, rank: usize, bankgroup: usize, bank: usize) -> Option<u64> {
        self.bank(rank, bankgroup, bank).open_row
    }

    fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u32 {
        self.bank(rank, bankgroup, bank).row_hit_count
    }

    fn pending_ref_command(&self) -> Option<Command> {
        self.pending_ref
    }
}

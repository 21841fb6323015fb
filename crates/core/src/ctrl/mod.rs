//! Per-channel controller.
//!
//! This module owns the transaction layer for one channel and drives the
//! command scheduler each cycle. It provides:
//! 1. **Buffers:** Bounded read queue and write buffer with capacity gates.
//! 2. **Scheduling loop:** One command issued per cycle (refresh interlock
//!    first), one transaction injected into the command queues per cycle.
//! 3. **Completion tracking:** Issued column commands mature into host
//!    completions after the data-bus delay.
//!
//! The scheduler reads timing through `ChannelTiming`; only the controller
//! applies issued commands back to the timing model.

use crate::common::{AddressMapper, Command, CommandType, Transaction};
use crate::config::Config;
use crate::sched::{ChannelTiming, CommandQueue, TransactionSource};
use crate::stats::SchedStats;
use crate::timing::ChannelState;

/// Transaction buffers plus the address mapper that turns a transaction into
/// its R/W command.
///
/// Split out of the controller so the scheduler can borrow it read-only
/// while the command queue is borrowed mutably.
pub struct TransQueues {
    mapper: AddressMapper,
    read_queue: Vec<Transaction>,
    write_buffer: Vec<Transaction>,
}

impl TransactionSource for TransQueues {
    fn trans_to_command(&self, trans: &Transaction) -> Command {
        let addr = self.mapper.decode(trans.addr);
        let cmd_type = if trans.is_write {
            CommandType::Write
        } else {
            CommandType::Read
        };
        Command::new(cmd_type, addr, trans.addr)
    }

    fn read_queue(&self) -> &[Transaction] {
        &self.read_queue
    }

    fn write_buffer(&self) -> &[Transaction] {
        &self.write_buffer
    }
}

/// A column command in flight on the data bus.
#[derive(Clone, Copy, Debug)]
struct PendingReturn {
    addr: u64,
    is_write: bool,
    done_cycle: u64,
    added_cycle: u64,
}

/// One channel: transaction buffers, command scheduler, timing model, and
/// statistics.
pub struct Controller {
    channel: usize,
    clk: u64,
    read_done_delay: u64,
    write_done_delay: u64,
    trans_queue_size: usize,
    write_buffer_size: usize,
    /// Write draining kicks in above this occupancy.
    write_drain_watermark: usize,

    trans: TransQueues,
    channel_state: ChannelState,
    cmd_queue: CommandQueue,
    pending_returns: Vec<PendingReturn>,
    stats: SchedStats,
}

impl Controller {
    /// Creates the controller for one channel.
    pub fn new(channel: usize, config: &Config) -> Self {
        Self {
            channel,
            clk: 0,
            read_done_delay: config.timing.read_done_delay(),
            write_done_delay: config.timing.write_done_delay(),
            trans_queue_size: config.sched.trans_queue_size,
            write_buffer_size: config.sched.write_buffer_size,
            write_drain_watermark: (config.sched.write_buffer_size * 3) / 4,
            trans: TransQueues {
                mapper: AddressMapper::new(config),
                read_queue: Vec::with_capacity(config.sched.trans_queue_size),
                write_buffer: Vec::with_capacity(config.sched.write_buffer_size),
            },
            channel_state: ChannelState::new(channel, config),
            cmd_queue: CommandQueue::new(channel, config),
            pending_returns: Vec::new(),
            stats: SchedStats::default(),
        }
    }

    /// Returns true iff the matching buffer can take one more transaction.
    pub fn will_accept_transaction(&self, is_write: bool) -> bool {
        if is_write {
            self.trans.write_buffer.len() < self.write_buffer_size
        } else {
            self.trans.read_queue.len() < self.trans_queue_size
        }
    }

    /// Accepts a transaction into the read queue or write buffer.
    ///
    /// Returns false when the buffer is full; the host retries later.
    pub fn add_transaction(&mut self, mut trans: Transaction) -> bool {
        if !self.will_accept_transaction(trans.is_write) {
            return false;
        }
        trans.added_cycle = self.clk;
        if trans.is_write {
            self.trans.write_buffer.push(trans);
        } else {
            self.trans.read_queue.push(trans);
        }
        true
    }

    /// Pops one transaction whose data transfer finished by `clk`, if any.
    ///
    /// Returns `(addr, is_write)`. Callers loop until `None` to drain all
    /// completions for the cycle.
    pub fn return_done_transaction(&mut self, clk: u64) -> Option<(u64, bool)> {
        let pos = self
            .pending_returns
            .iter()
            .position(|p| p.done_cycle <= clk)?;
        let done = self.pending_returns.remove(pos);
        if done.is_write {
            self.stats.num_writes_done += 1;
        } else {
            self.stats.num_reads_done += 1;
            self.stats.sum_read_latency += done.done_cycle - done.added_cycle;
        }
        Some((done.addr, done.is_write))
    }

    /// Advances the channel one cycle: refresh generation, page-policy
    /// arbitration, one command issue, one transaction injection.
    pub fn clock_tick(&mut self) {
        self.channel_state.tick(self.clk);
        self.cmd_queue.arbitrate_page_policy();

        let mut cmd = None;
        if self.channel_state.pending_ref_command().is_some() {
            cmd = self.cmd_queue.finish_refresh(&self.channel_state);
        }
        if cmd.is_none() {
            cmd = self
                .cmd_queue
                .get_command_to_issue(&self.channel_state, &self.trans);
        }
        if let Some(cmd) = cmd {
            self.issue_command(cmd);
        }

        self.schedule_transaction();

        self.clk += 1;
        self.stats.cycles += 1;
        self.cmd_queue.clock_tick();
    }

    /// Puts a picked command on the bus: updates statistics and the timing
    /// model, and arms the completion for column commands.
    fn issue_command(&mut self, cmd: Command) {
        match cmd.cmd_type {
            CommandType::Activate => self.stats.num_act += 1,
            CommandType::Precharge => self.stats.num_pre += 1,
            CommandType::Refresh | CommandType::RefreshBank => self.stats.num_ref += 1,
            _ => {}
        }
        if cmd.is_read_write() {
            let delay = if cmd.is_write() {
                self.write_done_delay
            } else {
                self.read_done_delay
            };
            let done_cycle = self.clk + delay;
            // The parked completion was created when the transaction was
            // scheduled into the command queue; arm its deadline now.
            let is_write = cmd.is_write();
            if let Some(parked) = self.pending_returns.iter_mut().find(|p| {
                p.addr == cmd.hex_addr && p.is_write == is_write && p.done_cycle == u64::MAX
            }) {
                parked.done_cycle = done_cycle;
            } else {
                self.pending_returns.push(PendingReturn {
                    addr: cmd.hex_addr,
                    is_write,
                    done_cycle,
                    added_cycle: self.clk,
                });
            }
        }
        self.channel_state.update(&cmd, self.clk);
    }

    /// Moves at most one buffered transaction into the command queues.
    ///
    /// Reads go first unless the write buffer has crossed its drain
    /// watermark or no read fits.
    fn schedule_transaction(&mut self) {
        let drain_writes = self.trans.write_buffer.len() >= self.write_drain_watermark
            || self.trans.read_queue.is_empty();
        if drain_writes && self.try_schedule(true) {
            return;
        }
        if self.try_schedule(false) {
            return;
        }
        if !drain_writes {
            self.try_schedule(true);
        }
    }

    fn try_schedule(&mut self, is_write: bool) -> bool {
        let buffer = if is_write {
            &self.trans.write_buffer
        } else {
            &self.trans.read_queue
        };
        let Some(pos) = buffer.iter().position(|t| {
            let cmd = self.trans.trans_to_command(t);
            self.cmd_queue
                .will_accept_command(cmd.addr.rank, cmd.addr.bankgroup, cmd.addr.bank)
        }) else {
            return false;
        };
        let trans = if is_write {
            self.trans.write_buffer.remove(pos)
        } else {
            self.trans.read_queue.remove(pos)
        };
        let cmd = self.trans.trans_to_command(&trans);
        let accepted = self.cmd_queue.add_command(cmd);
        debug_assert!(accepted);
        // Park the completion with an unarmed deadline until the column
        // command actually issues.
        self.pending_returns.push(PendingReturn {
            addr: trans.addr,
            is_write,
            done_cycle: u64::MAX,
            added_cycle: trans.added_cycle,
        });
        accepted
    }

    /// Channel index.
    #[inline]
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Statistics snapshot, including the scheduler's on-demand precharge
    /// count.
    pub fn stats(&self) -> SchedStats {
        let mut stats = self.stats.clone();
        stats.num_ondemand_pres = self.cmd_queue.num_ondemand_pres();
        stats
    }

    /// The command scheduler (exposed for inspection).
    #[inline]
    pub fn cmd_queue(&self) -> &CommandQueue {
        &self.cmd_queue
    }

    /// True iff no work is pending anywhere in the channel.
    pub fn idle(&self) -> bool {
        self.trans.read_queue.is_empty()
            && self.trans.write_buffer.is_empty()
            && self.cmd_queue.queue_empty()
            && self.pending_returns.is_empty()
    }
}

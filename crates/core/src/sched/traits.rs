//! Contracts between the scheduler and its collaborators.
//!
//! The scheduler never owns DRAM timing state or transaction buffers; it
//! reads both through these traits. It provides:
//! 1. **ChannelTiming:** The timing oracle answering "is this command legal
//!    now, and if not, what must issue first?"
//! 2. **TransactionSource:** Read-only views of the transaction layer for
//!    row-hit sibling counting.

use crate::common::{Command, Transaction};

/// Timing oracle for one channel.
///
/// The scheduler treats the oracle as read-only; state changes happen when
/// the controller applies an issued command back to the timing model.
pub trait ChannelTiming {
    /// Resolves a wanted command against current bank and timing state.
    ///
    /// Returns the command itself when it is legal at `clk`, a prerequisite
    /// ACTIVATE or PRECHARGE that must issue first, or `None` when nothing
    /// for this command is legal yet.
    fn ready_command(&self, cmd: &Command, clk: u64) -> Option<Command>;

    /// Currently open row of a bank, or `None` when the bank is precharged.
    fn open_row(&self, rank: usize, bankgroup: usize, bank: usize) -> Option<u64>;

    /// Consecutive row hits on this bank since its last ACTIVATE.
    fn row_hit_count(&self, rank: usize, bankgroup: usize, bank: usize) -> u32;

    /// The refresh the oracle wants scheduled next, if one is due.
    fn pending_ref_command(&self) -> Option<Command>;
}

/// Read-only view of the transaction layer owned by the controller.
///
/// Used for row-hit sibling counting; the scheduler never mutates the
/// transaction buffers.
pub trait TransactionSource {
    /// Translates a transaction to the R/W command it will become.
    fn trans_to_command(&self, trans: &Transaction) -> Command;

    /// Transactions waiting in the read queue.
    fn read_queue(&self) -> &[Transaction];

    /// Transactions waiting in the write buffer.
    fn write_buffer(&self) -> &[Transaction];
}

//! DRAM commands.
//!
//! This module defines the command vocabulary issued on the DRAM command bus.
//! It provides:
//! 1. **CommandType:** The eight command kinds, including auto-precharge forms.
//! 2. **Command:** A command plus its target coordinates and originating request.
//!
//! "No command" is expressed as `Option<Command>` at API boundaries rather
//! than an in-band invalid sentinel.

use std::fmt;

use super::addr::Address;

/// DRAM command kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    /// Column read from the open row.
    Read,
    /// Column read that closes the row after the burst.
    ReadPrecharge,
    /// Column write to the open row.
    Write,
    /// Column write that closes the row after the burst.
    WritePrecharge,
    /// Open a row in a bank.
    Activate,
    /// Close the open row of a bank.
    Precharge,
    /// All-bank refresh for one rank.
    Refresh,
    /// Single-bank refresh.
    RefreshBank,
}

/// One DRAM command: type, target coordinates, and the host request it
/// descends from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// What to put on the command bus.
    pub cmd_type: CommandType,
    /// Target coordinates (bank triple plus row/column).
    pub addr: Address,
    /// Opaque identifier of the originating transaction.
    pub hex_addr: u64,
    /// Set on a queued R/W once a PRECHARGE was emitted on its behalf, so the
    /// row-hit is not counted twice when the R/W itself issues.
    pub induced_precharge: bool,
}

impl Command {
    /// Creates a command with the `induced_precharge` flag clear.
    pub fn new(cmd_type: CommandType, addr: Address, hex_addr: u64) -> Self {
        Self {
            cmd_type,
            addr,
            hex_addr,
            induced_precharge: false,
        }
    }

    /// Returns true for READ and READ_PRECHARGE.
    #[inline]
    pub fn is_read(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Read | CommandType::ReadPrecharge
        )
    }

    /// Returns true for WRITE and WRITE_PRECHARGE.
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Write | CommandType::WritePrecharge
        )
    }

    /// Returns true for any column (data-moving) command.
    #[inline]
    pub fn is_read_write(&self) -> bool {
        self.is_read() || self.is_write()
    }

    /// Returns true for REFRESH and REFRESH_BANK.
    #[inline]
    pub fn is_refresh(&self) -> bool {
        matches!(
            self.cmd_type,
            CommandType::Refresh | CommandType::RefreshBank
        )
    }

    /// Returns true if both commands target the same (rank, bankgroup, bank).
    #[inline]
    pub fn same_bank(&self, other: &Command) -> bool {
        self.addr.rank == other.addr.rank
            && self.addr.bankgroup == other.addr.bankgroup
            && self.addr.bank == other.addr.bank
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ch{} ra{} bg{} ba{} row{} col{}",
            self.cmd_type,
            self.addr.channel,
            self.addr.rank,
            self.addr.bankgroup,
            self.addr.bank,
            self.addr.row,
            self.addr.column
        )
    }
}

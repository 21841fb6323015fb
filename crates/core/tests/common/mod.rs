//! Shared helpers for the scheduler test suite.

pub mod mocks;

use dram_core::common::{Address, Command, CommandType};
use dram_core::config::{Config, QueueStructure, RowBufPolicy};

/// A small, fully power-of-two device shape the unit tests share:
/// 1 channel, 2 ranks, 2 bank groups of 2 banks (4 banks/rank, 8 queues in
/// PER_BANK), 16 columns, 64-byte requests, 4-entry command queues.
pub fn test_config(structure: QueueStructure, policy: RowBufPolicy) -> Config {
    let mut config = Config::default();
    config.system.channels = 1;
    config.system.ranks = 2;
    config.system.bankgroups = 2;
    config.system.banks_per_group = 2;
    config.system.columns = 16;
    config.sched.queue_structure = structure;
    config.sched.row_buf_policy = policy;
    config.sched.cmd_queue_size = 4;
    config
}

/// Encodes coordinates into the flat address the `test_config` mapper
/// decodes back to them.
///
/// Layout above the 6 request bits: 4 column bits, 1 bank bit, 1 bank group
/// bit, 1 rank bit, then the row.
pub fn encode_addr(rank: usize, bankgroup: usize, bank: usize, row: u64, col: u64) -> u64 {
    (col << 6)
        | ((bank as u64) << 10)
        | ((bankgroup as u64) << 11)
        | ((rank as u64) << 12)
        | (row << 13)
}

/// Builds a command whose `hex_addr` is consistent with its coordinates
/// under `test_config`.
pub fn cmd_at(
    cmd_type: CommandType,
    rank: usize,
    bankgroup: usize,
    bank: usize,
    row: u64,
    col: u64,
) -> Command {
    Command::new(
        cmd_type,
        Address::new(0, rank, bankgroup, bank, row, col),
        encode_addr(rank, bankgroup, bank, row, col),
    )
}

/// READ command shorthand.
pub fn read_at(rank: usize, bankgroup: usize, bank: usize, row: u64, col: u64) -> Command {
    cmd_at(CommandType::Read, rank, bankgroup, bank, row, col)
}

/// WRITE command shorthand.
pub fn write_at(rank: usize, bankgroup: usize, bank: usize, row: u64, col: u64) -> Command {
    cmd_at(CommandType::Write, rank, bankgroup, bank, row, col)
}

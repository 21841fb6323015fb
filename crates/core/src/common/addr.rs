//! DRAM address decomposition.
//!
//! This module maps flat physical addresses onto DRAM coordinates. It provides:
//! 1. **Address:** The decoded (channel, rank, bankgroup, bank, row, column) tuple.
//! 2. **AddressMapper:** Field extraction driven by the configured device shape.
//!
//! The mapper assumes power-of-two counts for every level of the hierarchy and
//! interleaves fields as row–rank–bankgroup–bank–channel–column above the
//! request-aligned low bits, so that consecutive cache lines spread across
//! channels while staying within a row.

use crate::config::Config;

/// Decoded DRAM coordinates for one physical address.
///
/// `(rank, bankgroup, bank)` names a physical bank (the "bank triple");
/// `row` and `column` locate the data within it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Address {
    /// Channel index.
    pub channel: usize,
    /// Rank index within the channel.
    pub rank: usize,
    /// Bank group index within the rank.
    pub bankgroup: usize,
    /// Bank index within the bank group.
    pub bank: usize,
    /// Row index within the bank.
    pub row: u64,
    /// Column index within the row.
    pub column: u64,
}

impl Address {
    /// Creates an address from explicit coordinates.
    pub fn new(
        channel: usize,
        rank: usize,
        bankgroup: usize,
        bank: usize,
        row: u64,
        column: u64,
    ) -> Self {
        Self {
            channel,
            rank,
            bankgroup,
            bank,
            row,
            column,
        }
    }
}

/// Maps flat physical addresses to DRAM coordinates.
///
/// Field widths are derived from the configured counts (all must be powers of
/// two). The low `shift_bits` address bits select a byte within one request
/// and carry no mapping information.
#[derive(Clone, Copy, Debug)]
pub struct AddressMapper {
    shift_bits: u32,
    col_bits: u32,
    ch_bits: u32,
    bank_bits: u32,
    bg_bits: u32,
    rank_bits: u32,
    col_mask: u64,
    ch_mask: u64,
    bank_mask: u64,
    bg_mask: u64,
    rank_mask: u64,
}

impl AddressMapper {
    /// Builds a mapper for the configured device shape.
    ///
    /// # Arguments
    ///
    /// * `config` - System configuration supplying channel/rank/bank/row/column counts.
    pub fn new(config: &Config) -> Self {
        let sys = &config.system;
        let shift_bits = sys.request_bytes.ilog2();
        let col_bits = sys.columns.ilog2();
        let ch_bits = sys.channels.ilog2();
        let bank_bits = sys.banks_per_group.ilog2();
        let bg_bits = sys.bankgroups.ilog2();
        let rank_bits = sys.ranks.ilog2();
        Self {
            shift_bits,
            col_bits,
            ch_bits,
            bank_bits,
            bg_bits,
            rank_bits,
            col_mask: (sys.columns as u64) - 1,
            ch_mask: (sys.channels as u64) - 1,
            bank_mask: (sys.banks_per_group as u64) - 1,
            bg_mask: (sys.bankgroups as u64) - 1,
            rank_mask: (sys.ranks as u64) - 1,
        }
    }

    /// Decodes a physical address into full DRAM coordinates.
    pub fn decode(&self, hex_addr: u64) -> Address {
        let mut addr = hex_addr >> self.shift_bits;
        let column = addr & self.col_mask;
        addr >>= self.col_bits;
        let channel = (addr & self.ch_mask) as usize;
        addr >>= self.ch_bits;
        let bank = (addr & self.bank_mask) as usize;
        addr >>= self.bank_bits;
        let bankgroup = (addr & self.bg_mask) as usize;
        addr >>= self.bg_bits;
        let rank = (addr & self.rank_mask) as usize;
        addr >>= self.rank_bits;
        let row = addr;
        Address {
            channel,
            rank,
            bankgroup,
            bank,
            row,
            column,
        }
    }

    /// Extracts only the channel field; cheaper than a full decode on the
    /// front-door dispatch path.
    pub fn channel_of(&self, hex_addr: u64) -> usize {
        ((hex_addr >> (self.shift_bits + self.col_bits)) & self.ch_mask) as usize
    }
}

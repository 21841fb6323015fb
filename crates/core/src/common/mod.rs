//! Common types shared across the DRAM scheduling core.
//!
//! This module provides the fundamental building blocks used by every
//! component of the simulator. It includes:
//! 1. **Addresses:** Decoded DRAM coordinates and the physical-address mapper.
//! 2. **Commands:** DRAM command types (ACT/PRE/R/W/REF) and the command tuple.
//! 3. **Transactions:** Host-level read/write requests.

/// DRAM coordinate types and the physical address mapper.
pub mod addr;

/// DRAM command types and the command tuple.
pub mod command;

/// Host-level transaction type.
pub mod transaction;

pub use addr::{Address, AddressMapper};
pub use command::{Command, CommandType};
pub use transaction::Transaction;

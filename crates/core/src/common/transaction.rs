//! Host-level transactions.

/// One host read or write request at a flat physical address.
///
/// Transactions carry no data payload; completion is reported back to the
/// host by address through the system callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Flat physical address of the request.
    pub addr: u64,
    /// True for a write, false for a read.
    pub is_write: bool,
    /// Cycle the transaction entered the system.
    pub added_cycle: u64,
}

impl Transaction {
    /// Creates a transaction; `added_cycle` is stamped by the accepting controller.
    pub fn new(addr: u64, is_write: bool) -> Self {
        Self {
            addr,
            is_write,
            added_cycle: 0,
        }
    }
}

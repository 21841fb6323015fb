//! Command scheduling core.
//!
//! This module holds the per-channel command scheduler. It provides:
//! 1. **Traits:** Contracts for the timing oracle and the transaction layer.
//! 2. **CommandQueue:** Queues, ready picking, precharge arbitration, and the
//!    refresh interlock.
//! 3. **Page policy:** The DPM hysteresis arbiter that flips banks between
//!    OPEN_PAGE and SMART_CLOSE.

/// The scheduler core: queue set, ready picker, and refresh interlock.
pub mod command_queue;

/// The DPM page-policy arbiter.
pub mod page_policy;

/// Contracts the scheduler needs from its collaborators.
pub mod traits;

pub use command_queue::CommandQueue;
pub use traits::{ChannelTiming, TransactionSource};

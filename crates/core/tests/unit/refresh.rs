//! Refresh interlock unit tests.
//!
//! Verifies queue quiescing, precharge-then-refresh sequencing, counter
//! reset on completion, and REFRESH_BANK scoping.

use dram_core::common::{Address, Command, CommandType};
use dram_core::config::{QueueStructure, RowBufPolicy};
use dram_core::sched::CommandQueue;

use crate::common::mocks::{MockHost, MockTiming};
use crate::common::{read_at, test_config, write_at};

fn all_bank_refresh(rank: usize) -> Command {
    Command::new(CommandType::Refresh, Address::new(0, rank, 0, 0, 0, 0), 0)
}

// ══════════════════════════════════════════════════════════
// 1. Quiescing
// ══════════════════════════════════════════════════════════

#[test]
fn refresh_freezes_only_affected_rank() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let mut timing = MockTiming::new();
    let host = MockHost::new(&config);

    // Rank 0 has a write behind an open row; rank 1 has a ready read.
    timing.open_row_at(0, 0, 0, 5);
    timing.open_row_at(1, 0, 0, 6);
    cq.add_command(write_at(0, 0, 0, 5, 0));
    let rank1_read = read_at(1, 0, 0, 6, 0);
    cq.add_command(rank1_read);

    timing.pending_ref = Some(all_bank_refresh(0));
    // The open row in rank 0 must close first.
    let step = cq.finish_refresh(&timing).unwrap();
    assert_eq!(step.cmd_type, CommandType::Precharge);
    assert!(cq.in_refresh());
    let frozen: Vec<usize> = (0..4).collect();
    for qi in frozen {
        assert!(cq.ref_queue_indices().contains(&qi));
    }

    // Rank 1 is not quiesced: its read still issues.
    let picked = cq.get_command_to_issue(&timing, &host).unwrap();
    assert_eq!(picked, rank1_read);

    // Nothing from rank 0 leaks out while the interlock holds.
    assert!(cq.get_command_to_issue(&timing, &host).is_none());
}

#[test]
fn per_rank_structure_freezes_single_queue() {
    let config = test_config(QueueStructure::PerRank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let mut timing = MockTiming::new();

    timing.pending_ref = Some(all_bank_refresh(1));
    let step = cq.finish_refresh(&timing).unwrap();
    assert_eq!(step.cmd_type, CommandType::Refresh);
    // Completion already cleared the interlock; the collected index was
    // exactly the rank.
    assert!(!cq.in_refresh());
}

#[test]
fn refresh_bank_freezes_one_queue() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let mut timing = MockTiming::new();

    // Keep the bank open so the interlock stays up after the first step.
    timing.open_row_at(0, 1, 1, 7);
    let refb = Command::new(
        CommandType::RefreshBank,
        Address::new(0, 0, 1, 1, 0, 0),
        0,
    );
    timing.pending_ref = Some(refb);

    let step = cq.finish_refresh(&timing).unwrap();
    assert_eq!(step.cmd_type, CommandType::Precharge);
    assert!(cq.in_refresh());
    assert_eq!(cq.ref_queue_indices().len(), 1);
    let qi = cq.get_queue_index(0, 1, 1);
    assert!(cq.ref_queue_indices().contains(&qi));
}

// ══════════════════════════════════════════════════════════
// 2. Completion
// ══════════════════════════════════════════════════════════

#[test]
fn refresh_completion_resets_counters_and_victims() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let mut timing = MockTiming::new();

    // Rank 0 queues carry stale bookkeeping; rank 1 keeps its own.
    for qi in 0..4 {
        cq.true_row_hit_count[qi] = 3;
        cq.demand_row_hit_count[qi] = 2;
        cq.total_command_count[qi] = 7;
        cq.victim_cmds[qi].push(read_at(0, 0, 0, 9, 0));
    }
    cq.total_command_count[4] = 11;

    timing.pending_ref = Some(all_bank_refresh(0));
    let done = cq.finish_refresh(&timing).unwrap();
    assert_eq!(done.cmd_type, CommandType::Refresh);
    assert!(!cq.in_refresh());
    assert!(cq.ref_queue_indices().is_empty());

    for qi in 0..4 {
        assert_eq!(cq.true_row_hit_count[qi], 0);
        assert_eq!(cq.demand_row_hit_count[qi], 0);
        assert_eq!(cq.total_command_count[qi], 0);
        assert!(cq.victim_cmds[qi].is_empty());
    }
    assert_eq!(cq.total_command_count[4], 11);
}

#[test]
fn interlock_holds_across_precharge_steps() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let mut timing = MockTiming::new();

    timing.open_row_at(0, 0, 0, 5);
    timing.open_row_at(0, 1, 0, 6);
    timing.pending_ref = Some(all_bank_refresh(0));

    // Two open rows: two precharge steps before the refresh goes out.
    for _ in 0..2 {
        let step = cq.finish_refresh(&timing).unwrap();
        assert_eq!(step.cmd_type, CommandType::Precharge);
        assert!(cq.in_refresh());
        timing.close_bank(
            step.addr.rank,
            step.addr.bankgroup,
            step.addr.bank,
        );
    }
    let done = cq.finish_refresh(&timing).unwrap();
    assert_eq!(done.cmd_type, CommandType::Refresh);
    assert!(!cq.in_refresh());
}

#[test]
fn no_pending_refresh_is_a_no_op() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    let timing = MockTiming::new();
    assert!(cq.finish_refresh(&timing).is_none());
    assert!(!cq.in_refresh());
}

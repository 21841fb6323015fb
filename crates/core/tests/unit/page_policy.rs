//! DPM page-policy arbiter unit tests.
//!
//! Verifies the arbitration window, the hysteresis transitions, counter
//! preservation, and the zero-denominator boundary.

use dram_core::config::{QueueStructure, RowBufPolicy};
use dram_core::sched::CommandQueue;

use crate::common::test_config;

fn dpm_queue() -> CommandQueue {
    CommandQueue::new(0, &test_config(QueueStructure::PerBank, RowBufPolicy::Dpm))
}

fn tick_to(cq: &mut CommandQueue, clk: u64) {
    while cq.clk() < clk {
        cq.clock_tick();
    }
}

// ══════════════════════════════════════════════════════════
// 1. Arbitration window
// ══════════════════════════════════════════════════════════

#[test]
fn no_arbitration_before_first_window() {
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;

    tick_to(&mut cq, 500);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 3);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);

    tick_to(&mut cq, 999);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 3);
}

#[test]
fn arbitration_runs_at_exactly_1000() {
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 0);
}

#[test]
fn non_dpm_channel_never_arbitrates() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let mut cq = CommandQueue::new(0, &config);
    cq.true_row_hit_count[0] = 0;
    cq.total_command_count[0] = 100;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
    assert_eq!(cq.bank_sm()[0], 3);
}

// ══════════════════════════════════════════════════════════
// 2. OPEN_PAGE transitions
// ══════════════════════════════════════════════════════════

#[test]
fn open_page_low_ratio_snaps_to_smart_close() {
    // ratio 0.125: 1 < 8>>2, so the counter snaps to 0 and policy flips.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 0);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::SmartClose);
}

#[test]
fn open_page_low_ratio_threshold_uses_integer_shift() {
    // ratio 0.2 sits below 0.25, but the threshold is the integer shift
    // total>>2: 2 < 2 is false, so this is a middling window (2 < 5), one
    // step down from 3.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 2;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 2);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
}

#[test]
fn open_page_middling_ratio_decrements() {
    // ratio 0.3 in [0.25, 0.5): one step down, policy holds at sm=2.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 3;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 2);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
}

#[test]
fn open_page_decrement_crosses_threshold() {
    // Two middling windows in a row walk the counter to 1 and flip policy.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 3;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    tick_to(&mut cq, 2000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 1);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::SmartClose);
}

#[test]
fn open_page_high_ratio_increments_and_saturates() {
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 8;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 3);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
}

// ══════════════════════════════════════════════════════════
// 3. SMART_CLOSE transitions
// ══════════════════════════════════════════════════════════

#[test]
fn smart_close_high_ratio_snaps_to_open_page() {
    // ratio 0.8 >= 0.75: counter snaps to 3, policy flips back.
    let mut cq = dpm_queue();
    cq.row_buf_policy[0] = RowBufPolicy::SmartClose;
    cq.true_row_hit_count[0] = 8;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 3);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
}

#[test]
fn smart_close_middling_ratio_increments() {
    // First window: ratio 0.125 (1 < 8>>2) drives the bank to SMART_CLOSE
    // with sm=0.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!((cq.bank_sm()[0], cq.row_buf_policy[0]), (0, RowBufPolicy::SmartClose));

    // Second window: ratio 0.6 in [0.5, 0.75) steps up once; still below
    // the flip threshold.
    cq.true_row_hit_count[0] = 6;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 2000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 1);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::SmartClose);
}

#[test]
fn smart_close_increment_crosses_threshold() {
    // Walk the counter 0 → 1 → 2 with middling windows; the bank reopens at 2.
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();

    for window in 2..=3u64 {
        cq.true_row_hit_count[0] = 6;
        cq.total_command_count[0] = 10;
        tick_to(&mut cq, window * 1000);
        cq.arbitrate_page_policy();
    }
    assert_eq!(cq.bank_sm()[0], 2);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::OpenPage);
}

#[test]
fn smart_close_low_ratio_decrements_with_floor() {
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 8;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!((cq.bank_sm()[0], cq.row_buf_policy[0]), (0, RowBufPolicy::SmartClose));

    // Still cold: the counter cannot go below zero.
    cq.true_row_hit_count[0] = 1;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 2000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 0);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::SmartClose);
}

// ══════════════════════════════════════════════════════════
// 4. Boundaries and preservation
// ══════════════════════════════════════════════════════════

#[test]
fn zero_total_reads_as_ratio_zero() {
    // An idle bank must not divide by zero; it falls into the low-ratio arm.
    let mut cq = dpm_queue();
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.bank_sm()[0], 0);
    assert_eq!(cq.row_buf_policy[0], RowBufPolicy::SmartClose);
}

#[test]
fn arbitration_preserves_counters() {
    let mut cq = dpm_queue();
    cq.true_row_hit_count[0] = 3;
    cq.demand_row_hit_count[0] = 2;
    cq.total_command_count[0] = 10;
    tick_to(&mut cq, 1000);
    cq.arbitrate_page_policy();
    assert_eq!(cq.true_row_hit_count[0], 3);
    assert_eq!(cq.demand_row_hit_count[0], 2);
    assert_eq!(cq.total_command_count[0], 10);
}

#[test]
fn bank_sm_stays_in_range_over_many_windows() {
    let mut cq = dpm_queue();
    for window in 1..=20u64 {
        // Alternate hot and cold windows.
        for i in 0..cq.num_queues() {
            cq.true_row_hit_count[i] = if window % 2 == 0 { 9 } else { 0 };
            cq.total_command_count[i] = 10;
        }
        tick_to(&mut cq, window * 1000);
        cq.arbitrate_page_policy();
        for &sm in cq.bank_sm() {
            assert!(sm <= 3);
        }
    }
}

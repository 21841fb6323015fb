//! End-to-end runs through the controller and memory system.
//!
//! Drives the full stack (mapper, controller, scheduler, reference timing
//! model) with small workloads and checks completion, command mix, and the
//! queue-capacity invariant.

use std::cell::Cell;
use std::rc::Rc;

use dram_core::config::{QueueStructure, RowBufPolicy};
use dram_core::system::MemorySystem;

use crate::common::{encode_addr, test_config};

/// Builds a system wired to completion counters.
fn counted_system(
    config: &dram_core::config::Config,
) -> (MemorySystem, Rc<Cell<u64>>, Rc<Cell<u64>>) {
    let reads = Rc::new(Cell::new(0u64));
    let writes = Rc::new(Cell::new(0u64));
    let r = reads.clone();
    let w = writes.clone();
    let system = MemorySystem::new(
        config,
        Box::new(move |_| r.set(r.get() + 1)),
        Box::new(move |_| w.set(w.get() + 1)),
    );
    (system, reads, writes)
}

/// Ticks until idle, with a hard bound so a scheduling bug cannot hang the
/// suite.
fn run_to_idle(system: &mut MemorySystem, max_cycles: u64) {
    let mut cycles = 0;
    while !system.idle() {
        system.clock_tick();
        cycles += 1;
        assert!(cycles < max_cycles, "system failed to drain");
    }
    // One extra tick delivers completions that matured on the final cycle.
    system.clock_tick();
}

// ══════════════════════════════════════════════════════════
// 1. Completion
// ══════════════════════════════════════════════════════════

#[test]
fn reads_and_writes_complete() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    let (mut system, reads, writes) = counted_system(&config);

    for i in 0..20u64 {
        let addr = encode_addr((i % 2) as usize, 0, (i % 2) as usize, i / 4, i % 16);
        assert!(system.add_transaction(addr, i % 4 == 0));
        system.clock_tick();
    }
    run_to_idle(&mut system, 100_000);

    assert_eq!(reads.get(), 15);
    assert_eq!(writes.get(), 5);
}

#[test]
fn row_hits_need_fewer_activates_than_conflicts() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);

    // Streaming within one row.
    let (mut system, reads, _) = counted_system(&config);
    for col in 0..16u64 {
        assert!(system.add_transaction(encode_addr(0, 0, 0, 3, col), false));
        system.clock_tick();
    }
    run_to_idle(&mut system, 100_000);
    assert_eq!(reads.get(), 16);
    let stream_acts = system.channel_stats(0).num_act;

    // Same volume ping-ponging between two rows of one bank.
    let (mut system, reads, _) = counted_system(&config);
    for i in 0..16u64 {
        assert!(system.add_transaction(encode_addr(0, 0, 0, i % 2, i), false));
        system.clock_tick();
    }
    run_to_idle(&mut system, 100_000);
    assert_eq!(reads.get(), 16);
    let pingpong_acts = system.channel_stats(0).num_act;

    assert!(stream_acts < pingpong_acts);
    assert_eq!(stream_acts, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Refresh in the full stack
// ══════════════════════════════════════════════════════════

#[test]
fn refreshes_issue_on_cadence() {
    let mut config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    config.timing.t_refi = 500;
    config.timing.t_rfc = 40;
    let (mut system, reads, _) = counted_system(&config);

    // Trickle reads across three refresh windows.
    let mut issued = 0u64;
    for cycle in 0..2000u64 {
        if cycle % 50 == 0 {
            let addr = encode_addr(0, 0, 0, cycle / 100, cycle % 16);
            if system.add_transaction(addr, false) {
                issued += 1;
            }
        }
        system.clock_tick();
    }
    run_to_idle(&mut system, 100_000);

    let stats = system.channel_stats(0);
    assert!(stats.num_ref >= 2, "expected refreshes, got {}", stats.num_ref);
    assert_eq!(reads.get(), issued);
}

// ══════════════════════════════════════════════════════════
// 3. Capacity invariants
// ══════════════════════════════════════════════════════════

#[test]
fn queue_capacity_never_exceeded_under_pressure() {
    let mut config = test_config(QueueStructure::PerBank, RowBufPolicy::OpenPage);
    config.sched.cmd_queue_size = 2;
    let (mut system, _, _) = counted_system(&config);

    // Hammer one bank so its command queue saturates.
    let mut issued = 0u64;
    while issued < 30 {
        let addr = encode_addr(0, 0, 0, issued, 0);
        if system.will_accept_transaction(addr, false) {
            system.add_transaction(addr, false);
            issued += 1;
        }
        system.clock_tick();
        let cq = system.controller(0).cmd_queue();
        for qi in 0..cq.num_queues() {
            assert!(cq.queue_len(qi) <= 2);
        }
    }
    run_to_idle(&mut system, 1_000_000);
}

#[test]
fn smart_close_drains_same_workload() {
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::SmartClose);
    let (mut system, reads, writes) = counted_system(&config);

    for i in 0..32u64 {
        let addr = encode_addr(0, (i % 2) as usize, 0, i / 8, i % 16);
        assert!(system.add_transaction(addr, i % 3 == 0));
        system.clock_tick();
    }
    run_to_idle(&mut system, 200_000);
    assert_eq!(reads.get() + writes.get(), 32);
}

#[test]
fn dpm_full_stack_smoke() {
    // Surface the DPM snapshot logging when RUST_LOG is set.
    let _ = env_logger::builder().is_test(true).try_init();
    let config = test_config(QueueStructure::PerBank, RowBufPolicy::Dpm);
    let (mut system, reads, _) = counted_system(&config);

    // Enough traffic and cycles to cross several arbitration windows.
    let mut issued = 0u64;
    for cycle in 0..5000u64 {
        if cycle % 10 == 0 && issued < 400 {
            let addr = encode_addr(0, 0, 0, (cycle / 40) % 8, cycle % 16);
            if system.add_transaction(addr, false) {
                issued += 1;
            }
        }
        system.clock_tick();
    }
    run_to_idle(&mut system, 1_000_000);
    assert_eq!(reads.get(), issued);
    for &sm in system.controller(0).cmd_queue().bank_sm() {
        assert!(sm <= 3);
    }
}

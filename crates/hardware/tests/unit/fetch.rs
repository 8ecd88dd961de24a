//! # Fetch Tests
//!
//! Lock-step and per-thread fetch, scalar ALU issue slots, the instruction ceiling,
//! fetch delay and the scheduler each configuration selects.

use pretty_assertions::assert_eq;
use shadersim_core::common::{GroupId, SlotId};
use shadersim_core::config::SchedulerKind;
use shadersim_core::core::fetch::pool::SlotStatus;
use shadersim_core::core::fetch::scheduler::Scheduler;
use shadersim_core::core::protocol::Partition;
use shadersim_core::isa::Operand;

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, attribute, fragments};
use crate::common::harness::TestContext;

fn mov_end() -> Vec<shadersim_core::isa::DecodedInstruction> {
    ProgramBuilder::new().mov(Operand::output(0), Operand::input(0)).end()
}

fn scalar_core(code: &[shadersim_core::isa::DecodedInstruction]) -> TestContext {
    let config = ConfigBuilder::new().lock_step(false).rates(1, 2).scalar_alu().build();
    TestContext::new(config).with_program(code)
}

#[test]
fn test_lock_step_group_fetched_once_complete() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&mov_end());
    for work in fragments(0, 3) {
        ctx.send_work(work);
        ctx.step();
    }
    ctx.step();
    assert_eq!(ctx.stats.fetched, 0);

    ctx.admit(fragments(3, 1));
    assert_eq!(ctx.stats.fetched, 4);
    for slot in 0..4 {
        assert_eq!(ctx.pool().slot(SlotId(slot)).unwrap().instruction_count, 1);
    }
}

#[test]
fn test_lock_step_run_delivers_every_output() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&mov_end());
    ctx.admit(fragments(0, 8));
    ctx.run_until_outputs(8);

    let mut ids = ctx.delivered_ids();
    ids.sort_unstable();
    assert_eq!(ids, (0..8).collect::<Vec<_>>());
    for (_, output) in &ctx.delivered {
        assert_eq!(output.attributes[0], attribute(output.id));
        assert!(!output.killed);
    }
    assert_eq!(ctx.stats.ends, 8);
}

#[test]
fn test_per_thread_fetch_round_robin() {
    let config = ConfigBuilder::new().lock_step(false).build();
    let mut ctx = TestContext::new(config).with_program(&mov_end());
    ctx.send_work(fragments(0, 1).remove(0));
    ctx.run(2);
    // A single ready thread is fetched without waiting for its group.
    assert_eq!(ctx.stats.fetched, 1);

    ctx.admit(fragments(1, 3));
    ctx.run_until_outputs(4);
    assert_eq!(ctx.delivered.len(), 4);
}

#[test]
fn test_scalar_alu_fakes_second_simd_fetch() {
    let code = ProgramBuilder::new()
        .mov(Operand::temp(0), Operand::input(0))
        .mov(Operand::temp(1), Operand::input(1))
        .end();
    let mut ctx = scalar_core(&code);
    ctx.send_work(fragments(0, 1).remove(0));
    ctx.run(2);
    assert_eq!(ctx.stats.fetched, 1);
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 1);

    ctx.step();
    assert_eq!(ctx.stats.faked, 1);
}

#[test]
fn test_scalar_alu_pairs_simd_with_scalar() {
    let code = ProgramBuilder::new()
        .mov(Operand::temp(0), Operand::input(0))
        .mov_scalar(Operand::temp(1), Operand::input(1))
        .end();
    let mut ctx = scalar_core(&code);
    ctx.send_work(fragments(0, 1).remove(0));
    ctx.run(2);
    assert_eq!(ctx.stats.fetched, 2);
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 2);
    ctx.step();
    assert_eq!(ctx.stats.faked, 0);
}

#[test]
fn test_instruction_ceiling_ends_runaway_threads() {
    // Nothing is loaded, so every thread runs NOPs until it is forced to end.
    let config = ConfigBuilder::new().max_thread_instructions(3).build();
    let mut ctx = TestContext::new(config);
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    for slot in 0..4 {
        assert_eq!(ctx.status(slot), SlotStatus::Free);
    }
    assert_eq!(ctx.stats.fetched, 16);
    assert_eq!(ctx.stats.ends, 0);
}

#[test]
fn test_fetch_delay_spaces_group_fetches() {
    let fetched_after = |delay: u64| {
        let mut ctx = TestContext::new(ConfigBuilder::new().fetch_delay(delay).build());
        ctx.admit(fragments(0, 4));
        ctx.run(20);
        ctx.stats.fetched
    };
    assert!(fetched_after(4) < fetched_after(0));
}

#[test]
fn test_swap_on_block_runs_to_completion() {
    let config = ConfigBuilder::new().swap_on_block().build();
    let mut ctx = TestContext::new(config).with_program(&mov_end());
    ctx.admit(fragments(0, 8));
    ctx.run_until_outputs(8);
    assert_eq!(ctx.stats.outputs, 8);
}

#[test]
fn test_config_selects_scheduler() {
    let window = TestContext::new(ConfigBuilder::new().build());
    assert_eq!(window.core.fetch().scheduler().kind(), SchedulerKind::Window);

    let batch = TestContext::new(ConfigBuilder::new().scheduler(SchedulerKind::Batch).build());
    assert_eq!(batch.core.fetch().scheduler().kind(), SchedulerKind::Batch);
}

#[test]
fn test_batch_collects_admitted_group() {
    let config = ConfigBuilder::new().table(2, 2, 2).resources(8).scheduler(SchedulerKind::Batch).build();
    let mut ctx = TestContext::new(config);
    ctx.admit(fragments(0, 2));

    let Scheduler::Batch(batch) = ctx.core.fetch().scheduler() else {
        panic!("expected batch scheduler");
    };
    assert_eq!(batch.fetch_batch(Partition::Fragment), &[GroupId(0)]);
    assert!(batch.fetch_batch(Partition::Vertex).is_empty());
    assert!(batch.fetch_batch(Partition::Triangle).is_empty());
}

#[test]
fn test_batch_admissions_fill_one_partition_only() {
    // Four slots in groups of two; per-thread fetch keeps the core out of back-pressure.
    let config = ConfigBuilder::new()
        .table(2, 2, 2)
        .resources(16)
        .lock_step(false)
        .scheduler(SchedulerKind::Batch)
        .build();
    let mut ctx = TestContext::new(config).with_program(&mov_end());
    assert_eq!(ctx.pool().total(), 4);
    ctx.admit(fragments(0, 2));

    let Scheduler::Batch(batch) = ctx.core.fetch().scheduler() else {
        panic!("expected batch scheduler");
    };
    assert_eq!(batch.fetch_batch(Partition::Fragment), &[GroupId(0)]);
    assert_eq!(batch.load_batch(Partition::Fragment), &[GroupId(0)]);
    assert!(!batch.load_closed(Partition::Fragment));
    assert!(batch.fetch_batch(Partition::Vertex).is_empty());
    assert!(batch.load_batch(Partition::Vertex).is_empty());
}

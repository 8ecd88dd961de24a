//! # Admission Tests
//!
//! Binding work items to slots, staging into input buffers, reload after output,
//! per-partition entry points and the published back-pressure state.

use shadersim_core::common::SlotId;
use shadersim_core::core::fetch::pool::SlotStatus;
use shadersim_core::core::protocol::{InputMode, Partition, ShaderCommand, ShaderState, ShaderWork};
use shadersim_core::isa::DecodedInstruction;

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::fragments;
use crate::common::harness::TestContext;

fn small_table() -> TestContext {
    TestContext::new(ConfigBuilder::new().table(4, 4, 4).build())
}

#[test]
fn test_fresh_core_publishes_empty() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.run(2);
    assert_eq!(ctx.state, Some(ShaderState::Empty));
    assert_eq!(ctx.stats.empty_cycles, 2);
}

#[test]
fn test_admission_activates_while_executable_slots_remain() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.admit(fragments(0, 4));
    assert_eq!(ctx.stats.inputs, 4);
    for slot in 0..4 {
        assert_eq!(ctx.status(slot), SlotStatus::Ready);
    }
    assert_eq!(ctx.pool().staged_len(), 0);
    assert_eq!(ctx.pool().used_resources(), 4);
    assert_eq!(ctx.core.fetch().state(), ShaderState::Ready);
}

#[test]
fn test_admission_stages_into_input_buffers() {
    let mut ctx = small_table();
    ctx.admit(fragments(0, 5));
    for slot in 0..4 {
        assert_eq!(ctx.status(slot), SlotStatus::Ready);
    }
    assert_eq!(ctx.status(4), SlotStatus::Staged);
    assert_eq!(ctx.pool().staged_len(), 1);
    assert_eq!(ctx.pool().census().blocked, 1);
    // Fewer than two groups of free slots remain.
    assert_eq!(ctx.core.fetch().state(), ShaderState::Busy);
}

#[test]
fn test_staged_slot_activates_on_reload() {
    let mut ctx = small_table().with_program(&[DecodedInstruction::end()]);
    ctx.admit(fragments(0, 5));
    assert_eq!(ctx.status(4), SlotStatus::Staged);

    ctx.run_until(|ctx| ctx.status(4) == SlotStatus::Ready);
    assert_eq!(ctx.pool().staged_len(), 0);
    assert_eq!(ctx.status(0), SlotStatus::Free);
    assert!(ctx.stats.outputs >= 1);
}

#[test]
fn test_work_binds_record() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.admit([ShaderWork::new(77, InputMode::Vertex).last()]);
    let record = ctx.pool().slot(SlotId(0)).unwrap();
    assert_eq!(record.partition, Partition::Vertex);
    assert_eq!(record.work.as_ref().map(|w| (w.id, w.last)), Some((77, true)));
    assert_eq!(record.instruction_count, 0);
}

#[test]
fn test_triangle_uses_fixed_entry_and_cost() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.admit([ShaderWork::new(1, InputMode::Triangle)]);
    let record = ctx.pool().slot(SlotId(0)).unwrap();
    assert_eq!(record.partition, Partition::Triangle);
    assert_eq!(record.pc, 384);
    assert_eq!(record.cost, 4);
    assert_eq!(ctx.stats.input_attributes, 3);
}

#[test]
fn test_non_unified_work_runs_in_primary() {
    let mut ctx = TestContext::new(ConfigBuilder::new().unified(false).build());
    ctx.admit([ShaderWork::new(1, InputMode::Fragment), ShaderWork::new(2, InputMode::Triangle)]);
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().partition, Partition::Primary);
    assert_eq!(ctx.pool().slot(SlotId(1)).unwrap().partition, Partition::Primary);
    assert_eq!(ctx.pool().slot(SlotId(1)).unwrap().pc, 0);
}

#[test]
fn test_resource_budget_drives_backpressure() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.send_command(Partition::Fragment, ShaderCommand::SetThreadResources { target: Partition::Fragment, count: 10 });
    ctx.run(2);
    assert_eq!(ctx.core.fetch().partitions().max_thread_resources(), 10);

    ctx.admit(fragments(0, 4));
    assert_eq!(ctx.pool().free_resources(), 88);
    assert_eq!(ctx.core.fetch().state(), ShaderState::Ready);

    ctx.admit(fragments(4, 1));
    assert_eq!(ctx.pool().free_resources(), 78);
    assert_eq!(ctx.core.fetch().state(), ShaderState::Busy);
}

#[test]
fn test_admission_without_capacity_is_fatal() {
    let mut ctx = small_table();
    for work in fragments(0, 8) {
        ctx.send_work(work);
        ctx.step();
    }
    ctx.send_work(ShaderWork::new(8, InputMode::Fragment));
    ctx.step();
    assert!(ctx.try_step().is_err());
}

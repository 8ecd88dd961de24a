//! # Control Protocol Tests
//!
//! Decode→fetch control commands against slot states, and command processor commands
//! on the vertex and fragment ports.

use shadersim_core::common::constants::UNIFIED_CONSTANT_NUM_REGS;
use shadersim_core::common::{SimError, SlotId};
use shadersim_core::core::fetch::pool::SlotStatus;
use shadersim_core::core::protocol::{ControlCommand, Partition, ShaderCommand};
use shadersim_core::emulator::ShaderEmulator;
use shadersim_core::isa::{Bank, DecodedInstruction, Operand};

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, fragments};
use crate::common::harness::TestContext;

/// Writes `command` on the control wire and clocks until fetch has read it.
fn control(ctx: &mut TestContext, command: ControlCommand) {
    let cycle = ctx.cycle;
    ctx.core.wires_mut().control.write(cycle, command).unwrap();
    ctx.run(2);
}

fn try_control(ctx: &mut TestContext, command: ControlCommand) -> Result<(), SimError> {
    let cycle = ctx.cycle;
    ctx.core.wires_mut().control.write(cycle, command).unwrap();
    ctx.try_step()?;
    ctx.try_step()
}

fn command(ctx: &mut TestContext, port: Partition, command: ShaderCommand) {
    ctx.send_command(port, command);
    ctx.run(2);
}

/// One fragment admitted; its group is incomplete, so it is never fetched.
fn one_thread() -> TestContext {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.admit(fragments(0, 1));
    ctx
}

#[test]
fn test_command_on_free_slot_is_illegal() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    assert_eq!(
        try_control(&mut ctx, ControlCommand::Block { slot: SlotId(0), pc: 0 }),
        Err(SimError::IllegalCommand { command: "BLOCK", slot: SlotId(0), state: "FREE" })
    );
}

#[test]
fn test_unblock_of_ready_thread_is_illegal() {
    let mut ctx = one_thread();
    assert_eq!(
        try_control(&mut ctx, ControlCommand::Unblock { slot: SlotId(0), pc: 0 }),
        Err(SimError::IllegalCommand { command: "UNBLOCK", slot: SlotId(0), state: "READY" })
    );
}

#[test]
fn test_block_resumes_after_blocking_instruction() {
    let mut ctx = one_thread();
    control(&mut ctx, ControlCommand::Block { slot: SlotId(0), pc: 5 });
    assert_eq!(ctx.status(0), SlotStatus::Blocked);
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 6);

    control(&mut ctx, ControlCommand::Unblock { slot: SlotId(0), pc: 0 });
    assert_eq!(ctx.status(0), SlotStatus::Ready);
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 6);
}

#[test]
fn test_block_and_unblock_after_end_are_dropped() {
    let mut ctx = one_thread();
    control(&mut ctx, ControlCommand::End { slot: SlotId(0), pc: 0 });
    assert_eq!(try_control(&mut ctx, ControlCommand::Block { slot: SlotId(0), pc: 4 }), Ok(()));
    assert_eq!(try_control(&mut ctx, ControlCommand::Unblock { slot: SlotId(0), pc: 4 }), Ok(()));
    assert_eq!(ctx.status(0), SlotStatus::Ending);
    assert_eq!(ctx.pool().census().ending, 1);
}

#[test]
fn test_unblock_of_staged_thread_is_illegal() {
    let mut ctx = TestContext::new(ConfigBuilder::new().table(4, 4, 4).build());
    ctx.admit(fragments(0, 5));
    assert_eq!(
        try_control(&mut ctx, ControlCommand::Unblock { slot: SlotId(4), pc: 0 }),
        Err(SimError::IllegalCommand { command: "UNBLOCK", slot: SlotId(4), state: "STAGED" })
    );
}

#[test]
fn test_zexport_counts_until_end() {
    let mut ctx = one_thread();
    control(&mut ctx, ControlCommand::ZExport { slot: SlotId(0), pc: 0 });
    assert_eq!(ctx.core.fetch().pending_zexports(), 1);
    assert!(ctx.pool().slot(SlotId(0)).unwrap().zexported);

    control(&mut ctx, ControlCommand::End { slot: SlotId(0), pc: 0 });
    assert_eq!(ctx.core.fetch().pending_zexports(), 0);
    assert_eq!(ctx.status(0), SlotStatus::Ending);
}

#[test]
fn test_zexport_of_staged_thread_is_illegal() {
    let mut ctx = TestContext::new(ConfigBuilder::new().table(4, 4, 4).build());
    ctx.admit(fragments(0, 5));
    assert_eq!(
        try_control(&mut ctx, ControlCommand::ZExport { slot: SlotId(4), pc: 0 }),
        Err(SimError::IllegalCommand { command: "ZEXPORT", slot: SlotId(4), state: "STAGED" })
    );
}

#[test]
fn test_zexport_program_completes() {
    let code = ProgramBuilder::new()
        .zxp(Operand::input(0))
        .mov(Operand::output(0), Operand::input(0))
        .end();
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    assert_eq!(ctx.stats.zexports, 4);
    assert_eq!(ctx.core.fetch().pending_zexports(), 0);
}

#[test]
fn test_end_is_idempotent() {
    let mut ctx = one_thread();
    control(&mut ctx, ControlCommand::End { slot: SlotId(0), pc: 0 });
    control(&mut ctx, ControlCommand::End { slot: SlotId(0), pc: 0 });
    assert_eq!(ctx.status(0), SlotStatus::Ending);
    assert_eq!(ctx.pool().census().ending, 1);
    // The rest of the group never finished.
    assert_eq!(ctx.core.fetch().drain().finished(), 0);
}

#[test]
fn test_repeat_last_rewinds_whole_group() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.admit(fragments(0, 3));
    control(&mut ctx, ControlCommand::RepeatLast { slot: SlotId(0), pc: 9 });

    for slot in 0..3 {
        let record = ctx.pool().slot(SlotId(slot)).unwrap();
        assert_eq!((record.pc, record.repeat), (9, true));
        assert_eq!(ctx.core.emulator().thread_pc(SlotId(slot)), 9);
    }
    assert_eq!(ctx.stats.refetched, 4);
}

#[test]
fn test_repeat_last_outside_lock_step_targets_one_thread() {
    let mut ctx = TestContext::new(ConfigBuilder::new().lock_step(false).build());
    ctx.admit(fragments(0, 2));
    control(&mut ctx, ControlCommand::RepeatLast { slot: SlotId(1), pc: 3 });
    assert_eq!(ctx.stats.refetched, 1);
}

#[test]
fn test_new_pc() {
    let mut ctx = one_thread();
    control(&mut ctx, ControlCommand::NewPc { slot: SlotId(0), pc: 42 });
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 42);
}

#[test]
fn test_fragment_port_configures_fragment_partition() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    command(&mut ctx, Partition::Fragment, ShaderCommand::SetInitPc { target: Partition::Fragment, pc: 20 });
    command(&mut ctx, Partition::Fragment, ShaderCommand::SetOutputAttribute { attr: 1, active: true });
    command(&mut ctx, Partition::Fragment, ShaderCommand::SetInputAttribute { attr: 2, active: true });

    let partitions = ctx.core.fetch().partitions();
    assert_eq!(partitions.init_pc(Partition::Fragment), 20);
    assert_eq!(partitions.active_outputs(Partition::Fragment), 2);
    assert_eq!(partitions.active_inputs(Partition::Fragment), 1);

    ctx.admit(fragments(0, 1));
    assert_eq!(ctx.pool().slot(SlotId(0)).unwrap().pc, 20);
}

#[test]
fn test_param_write_uses_partition_bank() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    let value = [1.0, 2.0, 3.0, 4.0];
    command(&mut ctx, Partition::Fragment, ShaderCommand::ParamWrite { first: 3, values: vec![value] });
    command(&mut ctx, Partition::Vertex, ShaderCommand::ParamWrite { first: 3, values: vec![[5.0; 4]] });

    let offset = UNIFIED_CONSTANT_NUM_REGS as usize + 3;
    let params = ctx.core.emulator().read_state(SlotId(0), Bank::Param, offset + 1);
    assert_eq!(params[offset], value);
    assert_eq!(params[3], [5.0; 4]);
}

#[test]
fn test_load_program_command() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    let code = ProgramBuilder::new().mov(Operand::output(0), Operand::input(0)).end();
    command(&mut ctx, Partition::Vertex, ShaderCommand::LoadProgram { code: code.clone(), pc: 100 });

    let emu = ctx.core.emulator_mut();
    assert_eq!(emu.fetch_instruction(SlotId(0), 100, Partition::Vertex), Some(code[0].clone()));
    assert_eq!(emu.fetch_instruction(SlotId(0), 101, Partition::Vertex), Some(DecodedInstruction::end()));
}

#[test]
fn test_vertex_port_cannot_configure_fragment() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build());
    ctx.send_command(Partition::Vertex, ShaderCommand::SetInitPc { target: Partition::Fragment, pc: 7 });
    ctx.step();
    assert!(matches!(ctx.try_step(), Err(SimError::InvalidShaderCommand(_))));
}

#[test]
fn test_non_unified_commands_need_idle_core() {
    let mut ctx = TestContext::new(ConfigBuilder::new().unified(false).build());
    command(&mut ctx, Partition::Vertex, ShaderCommand::SetInitPc { target: Partition::Fragment, pc: 7 });
    assert_eq!(ctx.core.fetch().partitions().init_pc(Partition::Primary), 7);

    ctx.admit(fragments(0, 1));
    ctx.send_command(Partition::Vertex, ShaderCommand::SetInitPc { target: Partition::Primary, pc: 8 });
    ctx.step();
    assert!(matches!(ctx.try_step(), Err(SimError::InvalidShaderCommand(_))));
}

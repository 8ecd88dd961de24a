//! # Decode-Execute Tests
//!
//! Dependence replays, texture blocking, kill propagation and the decode reset command.

use shadersim_core::common::SlotId;
use shadersim_core::core::protocol::DecodeCommand;
use shadersim_core::isa::{DecodedInstruction, Opcode, Operand};
use shadersim_core::ScriptedEmulator;
use shadersim_core::sim::Simulator;

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, attribute, fragments};
use crate::common::harness::{TestContext, init_tracing};

#[test]
fn test_read_after_write_replays_group() {
    let code = ProgramBuilder::new()
        .mov(Operand::temp(0), Operand::input(0))
        .mov(Operand::output(0), Operand::temp(0))
        .end();
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);

    assert!(ctx.stats.replays >= 1);
    // Every replay rewinds the whole group.
    assert_eq!(ctx.stats.refetched, ctx.stats.replays * 4);
    for (_, output) in &ctx.delivered {
        assert_eq!(output.attributes[0], attribute(output.id));
    }
}

#[test]
fn test_independent_moves_issue_without_replay() {
    let code = ProgramBuilder::new()
        .mov(Operand::temp(0), Operand::input(0))
        .mov(Operand::output(0), Operand::input(0))
        .end();
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    assert_eq!(ctx.stats.replays, 0);
    assert_eq!(ctx.stats.ends, 4);
    assert_eq!(ctx.stats.blocks, 4);
}

#[test]
fn test_texture_load_blocks_until_result() {
    init_tracing();
    let code = ProgramBuilder::new()
        .tex(Operand::temp(0), Operand::input(0))
        .mov(Operand::output(0), Operand::temp(0))
        .end();
    let config = ConfigBuilder::new().build();
    let emu = ScriptedEmulator::new(config.threads.total_slots()).with_program(&code, 0);
    let mut sim = Simulator::new(config, emu).unwrap();
    for work in fragments(0, 4) {
        sim.queue_work(work);
    }
    let _ = sim.run(500).unwrap();

    assert!(sim.is_done());
    let stats = sim.stats();
    assert_eq!(stats.texture_requests, 1);
    assert_eq!(stats.unblocks, 4);
    // One block for the texture load and one for END.
    assert_eq!(stats.blocks, 8);
    for output in sim.consumer.received() {
        assert_eq!(output.attributes[0], attribute(output.id));
    }
    assert_eq!(sim.texture_units[0].completed(), 1);
}

#[test]
fn test_texture_load_without_units_keeps_replaying() {
    let code = ProgramBuilder::new().tex(Operand::temp(0), Operand::input(0)).end();
    let config = ConfigBuilder::new().texture_units(0).build();
    let mut ctx = TestContext::new(config).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run(40);

    assert!(ctx.delivered.is_empty());
    assert!(ctx.stats.replays > 0);
    assert_eq!(ctx.stats.texture_requests, 0);
    assert_eq!(ctx.stats.ends, 0);
}

#[test]
fn test_kill_marks_only_its_thread() {
    let code = ProgramBuilder::new()
        .kil(Operand::input(0))
        .mov(Operand::output(0), Operand::input(0))
        .end();
    let mut items = fragments(0, 4);
    items[2].attributes = vec![[-1.0, 0.0, 0.0, 0.0]];

    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(items);
    ctx.run_until_outputs(4);

    let killed: Vec<u64> = ctx.delivered.iter().filter(|(_, o)| o.killed).map(|(_, o)| o.id).collect();
    assert_eq!(killed, vec![2]);
}

#[test]
fn test_decode_reset_clears_in_flight_state() {
    let code = ProgramBuilder::new()
        .op(DecodedInstruction::alu(Opcode::Sin, Operand::temp(0), &[Operand::input(0)]))
        .end();
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run_until(|ctx| ctx.core.decode().in_flight() > 0);
    assert_eq!(ctx.core.decode().in_flight(), 4);
    assert_eq!(ctx.core.decode().hazards().thread(SlotId(0)).unwrap().pending, 1);

    let cycle = ctx.cycle;
    ctx.core.send_decode_command(cycle, DecodeCommand::Reset).unwrap();
    ctx.run(2);

    assert_eq!(ctx.core.decode().in_flight(), 0);
    assert_eq!(ctx.core.decode().hazards().thread(SlotId(0)).unwrap().pending, 0);
}

#[test]
fn test_scalar_alu_issues_simd_scalar_pair() {
    let code = ProgramBuilder::new()
        .mov(Operand::output(0), Operand::input(0))
        .mov_scalar(Operand::temp(1), Operand::input(1))
        .end();
    let config = ConfigBuilder::new().lock_step(false).rates(1, 2).scalar_alu().build();
    let mut ctx = TestContext::new(config).with_program(&code);
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);

    assert_eq!(ctx.stats.ends, 4);
    for (_, output) in &ctx.delivered {
        assert_eq!(output.attributes[0], attribute(output.id));
    }
}

//! # Simulator Tests
//!
//! End-to-end runs of the cycle driver: feeding under back-pressure, both scheduling
//! policies, a slow consumer and command ordering.

use pretty_assertions::assert_eq;
use shadersim_core::config::SchedulerKind;
use shadersim_core::core::protocol::{Partition, ShaderCommand, ShaderWork};
use shadersim_core::isa::{DecodedInstruction, Operand};
use shadersim_core::sim::{OutputConsumer, Simulator};
use shadersim_core::{ScriptedEmulator, ShaderConfig};

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, attribute, fragments};
use crate::common::harness::init_tracing;

fn mov_end() -> Vec<DecodedInstruction> {
    ProgramBuilder::new().mov(Operand::output(0), Operand::input(0)).end()
}

fn simulator(config: ShaderConfig, code: &[DecodedInstruction], work: Vec<ShaderWork>) -> Simulator<ScriptedEmulator> {
    init_tracing();
    let emu = ScriptedEmulator::new(config.threads.total_slots()).with_program(code, 0);
    let mut sim = Simulator::new(config, emu).unwrap();
    for item in work {
        sim.queue_work(item);
    }
    sim
}

fn sorted_ids(sim: &Simulator<ScriptedEmulator>) -> Vec<u64> {
    let mut ids: Vec<u64> = sim.consumer.received().iter().map(|o| o.id).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_window_run_completes() {
    let mut sim = simulator(ConfigBuilder::new().build(), &mov_end(), fragments(0, 16));
    let cycles = sim.run(2_000).unwrap();

    assert!(sim.is_done());
    assert_eq!(cycles, sim.cycle());
    assert_eq!(sorted_ids(&sim), (0..16).collect::<Vec<_>>());
    for output in sim.consumer.received() {
        assert_eq!(output.attributes[0], attribute(output.id));
    }
    assert_eq!(sim.stats().inputs, 16);
    assert_eq!(sim.stats().outputs, 16);
}

#[test]
fn test_feed_waits_while_busy() {
    // Sixteen slots go busy once fewer than eight are free.
    let config = ConfigBuilder::new().table(8, 8, 4).resources(64).build();
    let mut sim = simulator(config, &[DecodedInstruction::end()], fragments(0, 12));
    let _ = sim.run(2_000).unwrap();

    assert!(sim.is_done());
    assert_eq!(sim.stats().inputs, 12);
    assert!(sim.stats().blocked_thread_cycles > 0);
}

#[test]
fn test_batch_run_completes() {
    let config = ConfigBuilder::new().scheduler(SchedulerKind::Batch).build();
    let mut work = fragments(0, 8);
    if let Some(last) = work.pop() {
        work.push(last.last());
    }
    let mut sim = simulator(config, &mov_end(), work);
    let _ = sim.run(5_000).unwrap();

    assert!(sim.is_done());
    assert_eq!(sorted_ids(&sim), (0..8).collect::<Vec<_>>());
}

#[test]
fn test_slow_consumer_paces_outputs() {
    let fast = {
        let mut sim = simulator(ConfigBuilder::new().build(), &mov_end(), fragments(0, 8));
        sim.run(2_000).unwrap()
    };
    let mut sim = simulator(ConfigBuilder::new().build(), &mov_end(), fragments(0, 8)).with_consumer(OutputConsumer::new(3));
    let slow = sim.run(2_000).unwrap();

    assert!(sim.is_done());
    assert!(slow > fast);
}

#[test]
fn test_program_loaded_by_command_before_work() {
    init_tracing();
    let config = ConfigBuilder::new().build();
    let emu = ScriptedEmulator::new(config.threads.total_slots());
    let mut sim = Simulator::new(config, emu).unwrap();
    sim.queue_command(Partition::Fragment, ShaderCommand::LoadProgram { code: mov_end(), pc: 40 });
    sim.queue_command(Partition::Fragment, ShaderCommand::SetInitPc { target: Partition::Fragment, pc: 40 });
    for work in fragments(0, 4) {
        sim.queue_work(work);
    }
    let _ = sim.run(500).unwrap();

    assert!(sim.is_done());
    for output in sim.consumer.received() {
        assert_eq!(output.attributes[0], attribute(output.id));
    }
    assert_eq!(sim.core.fetch().partitions().init_pc(Partition::Fragment), 40);
}

#[test]
fn test_run_stops_at_cycle_limit() {
    // Three fragments never fill a group, so nothing comes back.
    let mut sim = simulator(ConfigBuilder::new().build(), &mov_end(), fragments(0, 3));
    assert_eq!(sim.run(50).unwrap(), 50);
    assert!(!sim.is_done());
    assert!(sim.consumer.received().is_empty());
}

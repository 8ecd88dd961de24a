//! # Output Drain Tests
//!
//! Consumer back-pressure, transmission pacing and multi-output transmission.

use shadersim_core::core::fetch::pool::SlotStatus;
use shadersim_core::core::protocol::ConsumerState;
use shadersim_core::isa::{DecodedInstruction, Operand};

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, fragments};
use crate::common::harness::TestContext;

fn mov_end() -> Vec<DecodedInstruction> {
    ProgramBuilder::new().mov(Operand::output(0), Operand::input(0)).end()
}

/// Cycles between consecutive deliveries.
fn spacing(ctx: &TestContext) -> Vec<u64> {
    ctx.delivered.windows(2).map(|w| w[1].0 - w[0].0).collect()
}

#[test]
fn test_busy_consumer_holds_finished_threads() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&mov_end());
    ctx.core.set_consumer_state(ConsumerState::Busy);
    ctx.admit(fragments(0, 4));
    ctx.run(60);

    assert!(ctx.delivered.is_empty());
    assert_eq!(ctx.core.fetch().drain().finished(), 4);
    assert_eq!(ctx.pool().census().ending, 4);

    ctx.core.set_consumer_state(ConsumerState::Ready);
    ctx.run_until_outputs(4);
    // Transmission follows group member order.
    assert_eq!(ctx.delivered_ids(), vec![0, 1, 2, 3]);
    for slot in 0..4 {
        assert_eq!(ctx.status(slot), SlotStatus::Free);
    }
    // Released slots return their resources to the budget.
    assert_eq!(ctx.pool().used_resources(), 0);
}

#[test]
fn test_single_cycle_transmission_delivers_every_cycle() {
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&mov_end());
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    assert_eq!(spacing(&ctx), vec![1, 1, 1]);
}

#[test]
fn test_transmission_latency_spaces_outputs() {
    let config = ConfigBuilder::new().transmission_latency(3.0).output_latency(64).build();
    let mut ctx = TestContext::new(config).with_program(&mov_end());
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    assert_eq!(spacing(&ctx), vec![3, 3, 3]);
}

#[test]
fn test_outputs_per_cycle_transmits_pairs() {
    let mut config = ConfigBuilder::new().build();
    config.output.outputs_per_cycle = 2;
    let mut ctx = TestContext::new(config).with_program(&mov_end());
    ctx.admit(fragments(0, 4));
    ctx.run_until_outputs(4);
    assert_eq!(spacing(&ctx), vec![0, 1, 0]);
}

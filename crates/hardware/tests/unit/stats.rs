//! # Statistics Tests

use shadersim_core::ShaderStats;
use shadersim_core::isa::Operand;

use crate::common::builder::config::ConfigBuilder;
use crate::common::builder::program::{ProgramBuilder, fragments};
use crate::common::harness::TestContext;

#[test]
fn test_occupancy_accounts_for_every_slot_each_cycle() {
    let code = ProgramBuilder::new().mov(Operand::output(0), Operand::input(0)).end();
    let mut ctx = TestContext::new(ConfigBuilder::new().build()).with_program(&code);
    ctx.admit(fragments(0, 8));
    ctx.run_until_outputs(8);

    let s = &ctx.stats;
    let total = u64::from(ctx.core.config().threads.total_slots());
    assert_eq!(s.cycles, ctx.cycle);
    assert_eq!(
        s.ready_thread_cycles + s.blocked_thread_cycles + s.finished_thread_cycles + s.free_thread_cycles,
        total * s.cycles
    );
    assert!(s.used_resource_cycles > 0);
    assert!(s.fetch_cycles > 0);
    assert!(s.executed <= s.fetched);
}

#[test]
fn test_json_report() {
    let mut stats = ShaderStats::default();
    stats.fetched = 12;
    stats.outputs = 3;

    let json = stats.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["fetched"], 12);
    assert_eq!(value["outputs"], 3);
    assert!(value.get("start_time").is_none());
}

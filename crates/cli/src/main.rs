//! SIMT shader core front-end simulator CLI.
//!
//! This binary drives the shader core with the scripted emulator. It performs:
//! 1. **Configuration:** Built-in defaults, or a JSON file with the same keys as `ShaderConfig`.
//! 2. **Run:** Streams fragment work items through a fixed-latency texture unit and an
//!    always-ready consumer until every output is back or the cycle limit is reached.
//! 3. **Report:** Prints the selected statistics sections, or the counters as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shadersim_core::config::SchedulerKind;
use shadersim_core::core::protocol::{InputMode, ShaderWork};
use shadersim_core::isa::{DecodedInstruction, Opcode, Operand};
use shadersim_core::sim::Simulator;
use shadersim_core::{ScriptedEmulator, ShaderConfig, SimError};

#[derive(Parser, Debug)]
#[command(
    name = "shadersim",
    author,
    version,
    about = "SIMT shader core fetch and decode-execute simulator",
    long_about = "Run fragment work through a cycle-accurate model of a shader core front end.\n\nExamples:\n  shadersim run --work 256\n  shadersim run --config core.json --policy batch --stats fetch --stats occupancy\n  RUST_LOG=shadersim_core=debug shadersim run --work 8"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream fragment work items through the shader core.
    Run {
        /// JSON configuration file (defaults are used for missing keys).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cycle limit.
        #[arg(long, default_value_t = 1_000_000)]
        cycles: u64,

        /// Number of fragment work items.
        #[arg(short, long, default_value_t = 64)]
        work: u64,

        /// Group scheduling policy (overrides the configuration).
        #[arg(long, value_enum)]
        policy: Option<Policy>,

        /// Statistics sections to print (summary, fetch, control, execute, occupancy).
        /// Repeat the flag for several sections; pass it without a value for all of them.
        #[arg(long, num_args = 0..=1, default_missing_value = "all")]
        stats: Vec<String>,

        /// Print the counters as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Batch,
    Window,
}

impl From<Policy> for SchedulerKind {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Batch => Self::Batch,
            Policy::Window => Self::Window,
        }
    }
}

/// The fragment program every work item runs.
///
/// With texture units attached the first input is sampled, otherwise it is copied.
fn fragment_program(texture: bool) -> Vec<DecodedInstruction> {
    let first = if texture {
        DecodedInstruction::alu(Opcode::Tex, Operand::temp(0), &[Operand::input(0)])
    } else {
        DecodedInstruction::alu(Opcode::Mov, Operand::temp(0), &[Operand::input(0)])
    };
    vec![
        first,
        DecodedInstruction::alu(Opcode::Mul, Operand::temp(1), &[Operand::temp(0), Operand::input(1)]),
        DecodedInstruction::alu(Opcode::Mov, Operand::output(0), &[Operand::temp(1)]),
        DecodedInstruction::end(),
    ]
}

fn fragment_work(count: u64) -> impl Iterator<Item = ShaderWork> {
    (0..count).map(move |id| {
        let x = (id % 64) as f32;
        let y = (id / 64) as f32;
        let work = ShaderWork::new(id, InputMode::Fragment).with_attributes(vec![[x, y, 0.0, 1.0], [1.0; 4]]);
        if id + 1 == count { work.last() } else { work }
    })
}

fn load_config(path: Option<&PathBuf>, policy: Option<Policy>) -> Result<ShaderConfig, SimError> {
    let mut config = match path {
        Some(path) => ShaderConfig::from_json_path(path)?,
        None => ShaderConfig::default(),
    };
    if let Some(policy) = policy {
        config.fetch.set_scheduler(policy.into());
    }
    Ok(config)
}

/// Runs the simulation and returns true if every work item completed.
fn cmd_run(
    config: Option<&PathBuf>,
    cycles: u64,
    work: u64,
    policy: Option<Policy>,
    stats: &[String],
    json: bool,
) -> Result<bool, SimError> {
    let config = load_config(config, policy)?;
    let program = fragment_program(config.texture.units > 0);
    info!(
        slots = config.threads.total_slots(),
        group = config.threads.thread_group,
        scheduler = ?config.fetch.scheduler(),
        work,
        "starting run"
    );

    let emu = ScriptedEmulator::new(config.threads.total_slots()).with_program(&program, 0);
    let mut sim = Simulator::new(config, emu)?;
    for item in fragment_work(work) {
        sim.queue_work(item);
    }
    let elapsed = sim.run(cycles)?;

    println!(
        "[*] {} cycles, {}/{} outputs ({} killed)",
        elapsed,
        sim.consumer.received().len(),
        work,
        sim.consumer.killed()
    );
    if json {
        match sim.stats().to_json() {
            Ok(text) => println!("{text}"),
            Err(e) => error!(%e, "failed to serialize statistics"),
        }
    } else if !stats.is_empty() {
        let sections: Vec<String> = stats.iter().filter(|s| s.as_str() != "all").cloned().collect();
        sim.stats().print_sections(&sections);
    }
    Ok(sim.is_done())
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_target(false).try_init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, cycles, work, policy, stats, json } => {
            match cmd_run(config.as_ref(), cycles, work, policy, &stats, json) {
                Ok(true) => ExitCode::SUCCESS,
                Ok(false) => {
                    eprintln!("[!] cycle limit reached before every output was received");
                    ExitCode::from(2)
                }
                Err(e) => {
                    eprintln!("\n[!] FATAL: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

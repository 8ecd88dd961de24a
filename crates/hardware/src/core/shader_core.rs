//! Shader core: owns both boxes and the wires between them.
//!
//! Neither box holds a reference to the other; every cycle the core clocks fetch and
//! then decode-execute against the same `Wires` and emulator. It provides:
//! 1. **Construction:** Validates the configuration and builds the boxes and signals.
//! 2. **Clock:** One call per cycle, returning the first fatal error.
//! 3. **Endpoints:** Producer, command processor, consumer and texture unit ports.

use tracing::debug;

use crate::common::SimResult;
use crate::config::ShaderConfig;
use crate::core::decode::ShaderDecodeExecute;
use crate::core::fetch::ShaderFetch;
use crate::core::protocol::{
    ConsumerState, DecodeCommand, Partition, ShaderCommand, ShaderOutput, ShaderState, ShaderWork,
};
use crate::core::wires::{TexturePorts, Wires};
use crate::emulator::ShaderEmulator;
use crate::stats::ShaderStats;

/// A shader core driven by a functional emulator `E`.
///
/// # Examples
///
/// ```
/// use shadersim_core::config::ShaderConfig;
/// use shadersim_core::core::protocol::ShaderState;
/// use shadersim_core::{ScriptedEmulator, ShaderCore, ShaderStats};
///
/// let config = ShaderConfig::default();
/// let emu = ScriptedEmulator::new(config.threads.total_slots());
/// let mut core = ShaderCore::new(config, emu).unwrap();
/// let mut stats = ShaderStats::default();
///
/// core.clock(0, &mut stats).unwrap();
/// core.clock(1, &mut stats).unwrap();
/// assert_eq!(core.shader_state(1), Some(ShaderState::Empty));
/// ```
#[derive(Debug)]
pub struct ShaderCore<E: ShaderEmulator> {
    config: ShaderConfig,
    fetch: ShaderFetch,
    decode: ShaderDecodeExecute,
    wires: Wires,
    emu: E,
    consumer: ConsumerState,
}

impl<E: ShaderEmulator> ShaderCore<E> {
    /// Builds a core after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the configuration is invalid.
    pub fn new(config: ShaderConfig, emu: E) -> SimResult<Self> {
        config.validate()?;
        debug!(
            slots = config.threads.total_slots(),
            group = config.threads.thread_group,
            scheduler = ?config.fetch.scheduler(),
            unified = config.threads.unified,
            "shader core built"
        );
        Ok(Self {
            fetch: ShaderFetch::new(&config),
            decode: ShaderDecodeExecute::new(&config),
            wires: Wires::new(&config),
            emu,
            consumer: ConsumerState::Ready,
            config,
        })
    }

    /// Advances both boxes by one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first fatal `SimError` raised by either box.
    pub fn clock(&mut self, cycle: u64, stats: &mut ShaderStats) -> SimResult<()> {
        self.fetch.clock(cycle, &mut self.wires, &mut self.emu, stats)?;
        self.decode.clock(cycle, &mut self.wires, &mut self.emu, stats)?;
        self.wires.consumer_state.write(cycle, self.consumer)?;
        stats.cycles = cycle + 1;
        Ok(())
    }

    /// Configuration the core was built with.
    pub const fn config(&self) -> &ShaderConfig {
        &self.config
    }

    /// Fetch box.
    pub const fn fetch(&self) -> &ShaderFetch {
        &self.fetch
    }

    /// Decode-execute box.
    pub const fn decode(&self) -> &ShaderDecodeExecute {
        &self.decode
    }

    /// Functional emulator.
    pub const fn emulator(&self) -> &E {
        &self.emu
    }

    /// Mutable functional emulator.
    pub const fn emulator_mut(&mut self) -> &mut E {
        &mut self.emu
    }

    /// Every signal of the core.
    pub const fn wires_mut(&mut self) -> &mut Wires {
        &mut self.wires
    }

    /// Sends a work item, visible to fetch on the next cycle.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` beyond the input rate.
    pub fn send_work(&mut self, cycle: u64, work: ShaderWork) -> SimResult<()> {
        self.wires.work.write(cycle, work)
    }

    /// Sends a command processor command on the port of `port`.
    ///
    /// The fragment port is only read in unified mode; everything else uses the
    /// vertex (primary) port.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if the port already carries a command this cycle.
    pub fn send_command(&mut self, cycle: u64, port: Partition, command: ShaderCommand) -> SimResult<()> {
        let index = usize::from(port == Partition::Fragment);
        self.wires.commands[index].write(cycle, command)
    }

    /// Sends a command to the decode-execute box.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if a command was already sent this cycle.
    pub fn send_decode_command(&mut self, cycle: u64, command: DecodeCommand) -> SimResult<()> {
        self.wires.decode_commands.write(cycle, command)
    }

    /// Sets the consumer state published from the next clock on.
    pub const fn set_consumer_state(&mut self, state: ConsumerState) {
        self.consumer = state;
    }

    /// Back-pressure state published in the previous cycle, read at `cycle`.
    pub fn shader_state(&mut self, cycle: u64) -> Option<ShaderState> {
        self.wires.shader_state.read(cycle)
    }

    /// Outputs delivered to the consumer at `cycle`.
    pub fn receive_outputs(&mut self, cycle: u64) -> Vec<ShaderOutput> {
        self.wires.output.read_all(cycle)
    }

    /// Ports of texture unit `unit`.
    pub fn texture_ports(&mut self, unit: usize) -> Option<&mut TexturePorts> {
        self.wires.texture.get_mut(unit)
    }
}

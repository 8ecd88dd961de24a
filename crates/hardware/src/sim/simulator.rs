//! Simulator: owns the shader core and its neighbours side by side.
//!
//! Each `tick` publishes the consumer state, feeds at most one command per port or the
//! input rate of work items, clocks the core and the texture units, and collects the
//! outputs delivered in that cycle.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::common::SimResult;
use crate::config::ShaderConfig;
use crate::core::ShaderCore;
use crate::core::protocol::{Partition, ShaderCommand, ShaderState, ShaderWork};
use crate::emulator::ShaderEmulator;
use crate::sim::consumer::OutputConsumer;
use crate::sim::texture_unit::{DEFAULT_TEXTURE_LATENCY, FixedLatencyTextureUnit};
use crate::stats::ShaderStats;

/// Top-level simulator: shader core, texture units, consumer and input queues.
#[derive(Debug)]
pub struct Simulator<E: ShaderEmulator> {
    /// The shader core.
    pub core: ShaderCore<E>,
    /// One model per configured texture unit.
    pub texture_units: Vec<FixedLatencyTextureUnit>,
    /// Output sink.
    pub consumer: OutputConsumer,
    commands: VecDeque<(Partition, ShaderCommand)>,
    work: VecDeque<ShaderWork>,
    submitted: u64,
    last_state: ShaderState,
    cycle: u64,
    stats: ShaderStats,
}

impl<E: ShaderEmulator> Simulator<E> {
    /// Creates a simulator with default texture units and an always-ready consumer.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the configuration is invalid.
    pub fn new(config: ShaderConfig, emu: E) -> SimResult<Self> {
        let slots = config.threads.total_slots();
        let texture_units = (0..config.texture.units)
            .map(|_| FixedLatencyTextureUnit::for_slots(DEFAULT_TEXTURE_LATENCY, slots))
            .collect();
        Ok(Self {
            core: ShaderCore::new(config, emu)?,
            texture_units,
            consumer: OutputConsumer::default(),
            commands: VecDeque::new(),
            work: VecDeque::new(),
            submitted: 0,
            last_state: ShaderState::Empty,
            cycle: 0,
            stats: ShaderStats::default(),
        })
    }

    /// Replaces the consumer.
    #[must_use]
    pub fn with_consumer(mut self, consumer: OutputConsumer) -> Self {
        self.consumer = consumer;
        self
    }

    /// Queues a command processor command. Commands are sent before any queued work.
    pub fn queue_command(&mut self, port: Partition, command: ShaderCommand) {
        self.commands.push_back((port, command));
    }

    /// Queues a work item.
    pub fn queue_work(&mut self, work: ShaderWork) {
        self.work.push_back(work);
        self.submitted += 1;
    }

    /// Next cycle to simulate.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Statistics collected so far.
    pub const fn stats(&self) -> &ShaderStats {
        &self.stats
    }

    /// Returns true once every queued work item came back as an output.
    pub fn is_done(&self) -> bool {
        self.commands.is_empty() && self.work.is_empty() && self.consumer.received().len() as u64 == self.submitted
    }

    /// Advances every component by one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first fatal `SimError` of the core or a texture unit.
    pub fn tick(&mut self) -> SimResult<()> {
        let cycle = self.cycle;
        if let Some(state) = self.core.shader_state(cycle) {
            self.last_state = state;
        }

        self.feed(cycle)?;
        self.core.set_consumer_state(self.consumer.state(cycle));
        self.core.clock(cycle, &mut self.stats)?;

        for (unit, model) in self.texture_units.iter_mut().enumerate() {
            if let Some(ports) = self.core.texture_ports(unit) {
                model.clock(cycle, ports)?;
            }
        }

        self.consumer.accept(self.core.receive_outputs(cycle));
        self.cycle += 1;
        Ok(())
    }

    fn feed(&mut self, cycle: u64) -> SimResult<()> {
        let mut sent_ports = [false; 2];
        while let Some((port, _)) = self.commands.front() {
            let index = usize::from(*port == Partition::Fragment);
            if sent_ports[index] {
                break;
            }
            let Some((port, command)) = self.commands.pop_front() else { break };
            debug!(cycle, command = command.name(), %port, "command sent");
            self.core.send_command(cycle, port, command)?;
            sent_ports[index] = true;
        }
        if !self.commands.is_empty() || sent_ports.iter().any(|&s| s) || self.last_state == ShaderState::Busy {
            return Ok(());
        }

        for _ in 0..self.core.config().output.inputs_per_cycle {
            let Some(work) = self.work.pop_front() else { break };
            self.core.send_work(cycle, work)?;
        }
        Ok(())
    }

    /// Ticks until every queued work item is back or `max_cycles` elapse.
    ///
    /// Returns the number of cycles simulated by this call.
    ///
    /// # Errors
    ///
    /// Returns the first fatal `SimError`.
    pub fn run(&mut self, max_cycles: u64) -> SimResult<u64> {
        let start = self.cycle;
        while !self.is_done() && self.cycle - start < max_cycles {
            self.tick()?;
        }
        info!(
            cycles = self.cycle - start,
            outputs = self.consumer.received().len(),
            submitted = self.submitted,
            "simulation stopped"
        );
        Ok(self.cycle - start)
    }
}

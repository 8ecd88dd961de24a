//! Shader fetch box.
//!
//! The fetch box owns the thread slot table and everything that decides which thread
//! sends instructions to decode next. It provides:
//! 1. **Admission:** Binds incoming work items to free slots and loads their inputs.
//! 2. **Commands:** Applies command processor commands and decode control commands.
//! 3. **Fetch:** Lock-step group fetch through a `Scheduler`, or per-thread round robin.
//! 4. **Drain:** Transmits finished threads to the consumer and reloads their slots.
//! 5. **Back-pressure:** Publishes `ShaderState` to the producer every cycle.

/// Finished-thread output drain.
pub mod drain;

/// Lock-step group fetch buffer and issue slots.
pub mod group_fetch;

/// Per-partition program state.
pub mod partition;

/// Thread slot table and resource budget.
pub mod pool;

/// Group scheduling policies.
pub mod scheduler;

use tracing::{debug, trace, warn};

use self::drain::OutputDrain;
use self::group_fetch::{GroupFetchUnit, IssueSlots};
use self::partition::PartitionTable;
use self::pool::{SlotStatus, ThreadSlotPool};
use self::scheduler::{Scheduler, SchedulingPolicy};
use crate::common::constants::{MAX_ATTRIBUTES, UNIFIED_CONSTANT_NUM_REGS};
use crate::common::{GroupId, SimError, SimResult, SlotId};
use crate::config::ShaderConfig;
use crate::core::protocol::{
    ConsumerState, ControlCommand, DecodeState, FetchedInstruction, Partition, ShaderCommand, ShaderOutput,
    ShaderState, ShaderWork,
};
use crate::core::wires::Wires;
use crate::emulator::ShaderEmulator;
use crate::isa::Bank;
use crate::stats::ShaderStats;

/// The fetch box.
#[derive(Clone, Debug)]
pub struct ShaderFetch {
    unified: bool,
    lock_step: bool,
    scalar_alu: bool,
    threads_per_cycle: u32,
    instr_per_cycle: u32,
    fetch_delay: u64,
    max_thread_instructions: u32,
    input_buffers: u32,
    inputs_per_cycle: u32,
    outputs_per_cycle: u32,
    output_transmission_latency: f64,
    output_delay: u64,
    pool: ThreadSlotPool,
    partitions: PartitionTable,
    scheduler: Scheduler,
    group_fetch: GroupFetchUnit,
    issue: IssueSlots,
    drain: OutputDrain,
    next_thread: SlotId,
    pending_zexports: u32,
    state: ShaderState,
}

impl ShaderFetch {
    /// Builds the fetch box. The configuration must already be validated.
    pub fn new(config: &ShaderConfig) -> Self {
        let t = &config.threads;
        let f = &config.fetch;
        let o = &config.output;
        Self {
            unified: t.unified,
            lock_step: f.lock_step,
            scalar_alu: f.scalar_alu,
            threads_per_cycle: f.threads_per_cycle,
            instr_per_cycle: f.instr_per_cycle,
            fetch_delay: f.fetch_delay,
            max_thread_instructions: f.max_thread_instructions,
            input_buffers: t.input_buffers,
            inputs_per_cycle: o.inputs_per_cycle,
            outputs_per_cycle: o.outputs_per_cycle,
            output_transmission_latency: o.output_transmission_latency,
            output_delay: o.output_delay,
            pool: ThreadSlotPool::new(t.total_slots(), t.resources, t.thread_group),
            partitions: PartitionTable::new(t.unified),
            scheduler: Scheduler::from_config(config),
            group_fetch: GroupFetchUnit::new(t.thread_group),
            issue: IssueSlots::default(),
            drain: OutputDrain::new(),
            next_thread: SlotId(0),
            pending_zexports: 0,
            state: ShaderState::Empty,
        }
    }

    /// Thread slot table.
    pub const fn pool(&self) -> &ThreadSlotPool {
        &self.pool
    }

    /// Partition program state.
    pub const fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Group scheduler.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Output drain.
    pub const fn drain(&self) -> &OutputDrain {
        &self.drain
    }

    /// State published in the last clock.
    pub const fn state(&self) -> ShaderState {
        self.state
    }

    /// Z-exports reported by decode for threads still running.
    pub const fn pending_zexports(&self) -> u32 {
        self.pending_zexports
    }

    /// Advances the fetch box by one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first fatal `SimError` raised while processing the cycle.
    pub fn clock<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        for work in wires.work.read_all(cycle) {
            self.admit(cycle, work, emu, stats)?;
        }

        let ports = if self.unified { wires.commands.len() } else { 1 };
        for port in 0..ports {
            if let Some(command) = wires.commands[port].read(cycle) {
                self.process_command(command, port, emu)?;
            }
        }

        for command in wires.control.read_all(cycle) {
            self.process_control(command, emu, stats)?;
        }

        let decode_state = wires.decode_state.read_required(cycle)?;

        self.scheduler.process_fetched(&self.pool, cycle)?;

        if decode_state == DecodeState::Ready {
            let sent = if self.lock_step {
                self.fetch_lock_step(cycle, wires, emu, stats)?
            } else {
                self.fetch_threads(cycle, wires, emu, stats)?
            };
            if sent > 0 {
                stats.fetch_cycles += 1;
            } else {
                stats.no_ready_cycles += 1;
            }
        }

        let consumer = wires.consumer_state.read_required(cycle)?;
        self.drain_outputs(cycle, consumer, wires, emu, stats)?;

        self.publish_state(cycle, wires)?;
        self.update_stats(stats);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════
    // Admission
    // ══════════════════════════════════════════════════════════

    fn admit<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        work: ShaderWork,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        let partition = work.mode.partition(self.unified);
        let cost = self.partitions.cost(partition);
        let slot = self.pool.acquire(partition, cost)?;

        emu.reset_state(slot);
        emu.load_state(slot, Bank::Input, &work.attributes, 0, work.mode.input_registers());
        let pc = self.partitions.init_pc(partition);
        emu.set_pc(slot, pc);

        debug!(%slot, %partition, id = work.id, pc, last = work.last, "work admitted");
        let record = self.pool.slot_mut(slot)?;
        record.pc = pc;
        record.instruction_count = 0;
        record.repeat = false;
        record.zexported = false;
        record.work = Some(work);

        stats.inputs += 1;
        stats.input_attributes += u64::from(self.partitions.active_inputs(partition));
        stats.input_registers += u64::from(self.partitions.thread_resources(partition));

        if self.pool.free_slots() >= self.input_buffers {
            self.activate(cycle, slot)
        } else {
            self.pool.push_staged(slot);
            Ok(())
        }
    }

    fn activate(&mut self, cycle: u64, slot: SlotId) -> SimResult<()> {
        self.pool.set_status(slot, SlotStatus::Ready)?;
        let group = slot.group(self.pool.group_size());
        if self.pool.group_ready(group) {
            trace!(%group, "group ready after admission");
            self.scheduler.on_activated(group, &self.pool, cycle)?;
        }
        Ok(())
    }

    /// Frees a transmitted slot and activates the oldest staged slot in its place.
    fn reload(&mut self, cycle: u64, slot: SlotId) -> SimResult<()> {
        let cost = self.pool.release(slot)?;
        trace!(%slot, cost, free = self.pool.free_resources(), "slot released");
        if self.pool.free_slots() <= self.input_buffers
            && let Some(staged) = self.pool.pop_staged()
        {
            self.activate(cycle, staged)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════
    // Commands
    // ══════════════════════════════════════════════════════════

    const fn port_partition(&self, port: usize) -> Partition {
        if !self.unified {
            Partition::Primary
        } else if port == 0 {
            Partition::Vertex
        } else {
            Partition::Fragment
        }
    }

    fn process_command<E: ShaderEmulator>(&mut self, command: ShaderCommand, port: usize, emu: &mut E) -> SimResult<()> {
        if !self.unified && !self.pool.is_empty() {
            return Err(SimError::InvalidShaderCommand(format!(
                "{} while {} threads are active",
                command.name(),
                self.pool.total() - self.pool.free_slots()
            )));
        }
        let partition = self.port_partition(port);
        debug!(command = command.name(), %partition, "shader command");

        match command {
            ShaderCommand::LoadProgram { code, pc } => emu.load_program(&code, pc),
            ShaderCommand::ParamWrite { first, values } => {
                let offset = if self.unified { partition.index() as u32 * UNIFIED_CONSTANT_NUM_REGS } else { 0 };
                emu.load_state(SlotId(0), Bank::Param, &values, first + offset, values.len());
            }
            ShaderCommand::SetInitPc { target, pc } => {
                self.check_target(partition, target)?;
                self.partitions.set_init_pc(target, pc);
            }
            ShaderCommand::SetThreadResources { target, count } => {
                self.check_target(partition, target)?;
                self.partitions.set_thread_resources(target, count);
            }
            ShaderCommand::SetInputAttribute { attr, active } => self.partitions.set_input(partition, attr, active)?,
            ShaderCommand::SetOutputAttribute { attr, active } => self.partitions.set_output(partition, attr, active)?,
            ShaderCommand::SetMultisampling(enable) => self.partitions.set_multisampling(enable),
            ShaderCommand::SetMsaaSamples(samples) => self.partitions.set_msaa_samples(samples),
        }
        Ok(())
    }

    /// The vertex port may only configure the vertex partition.
    fn check_target(&self, port: Partition, target: Partition) -> SimResult<()> {
        if self.unified && port == Partition::Vertex && target.index() != Partition::Vertex.index() {
            return Err(SimError::InvalidShaderCommand(format!("vertex port cannot configure the {target} partition")));
        }
        Ok(())
    }

    fn process_control<E: ShaderEmulator>(
        &mut self,
        command: ControlCommand,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        let slot = command.slot();
        let status = self.pool.status(slot)?;
        let illegal = || SimError::IllegalCommand { command: command.name(), slot, state: status.name() };
        if status == SlotStatus::Free {
            return Err(illegal());
        }
        trace!(%command, state = status.name(), "control command");

        match command {
            ControlCommand::Unblock { .. } => match status {
                SlotStatus::Blocked => {
                    self.pool.set_status(slot, SlotStatus::Ready)?;
                    let group = slot.group(self.pool.group_size());
                    if self.pool.group_ready(group) {
                        self.scheduler.on_unblocked(group)?;
                    }
                }
                // Pairs with a BLOCK dropped after a forced end by the instruction ceiling.
                SlotStatus::Ending | SlotStatus::Draining => {}
                _ => return Err(illegal()),
            },
            ControlCommand::Block { pc, .. } => match status {
                SlotStatus::Ready => {
                    self.pool.set_status(slot, SlotStatus::Blocked)?;
                    self.pool.slot_mut(slot)?.pc = pc + 1;
                }
                SlotStatus::Ending | SlotStatus::Draining => {}
                _ => return Err(illegal()),
            },
            ControlCommand::End { .. } => self.finish_thread(slot)?,
            ControlCommand::RepeatLast { pc, .. } => {
                let members = if self.lock_step { self.pool.group_size() } else { 1 };
                let total = self.pool.total();
                for i in 0..members {
                    let target = slot.wrapping_add(i, total);
                    let record = self.pool.slot_mut(target)?;
                    record.pc = pc;
                    record.repeat = true;
                    emu.set_pc(target, pc);
                    stats.refetched += 1;
                }
            }
            ControlCommand::NewPc { pc, .. } => self.pool.slot_mut(slot)?.pc = pc,
            ControlCommand::ZExport { .. } => {
                // END issued after the export may already have blocked the thread.
                if !matches!(status, SlotStatus::Ready | SlotStatus::Blocked) {
                    return Err(illegal());
                }
                self.pool.slot_mut(slot)?.zexported = true;
                self.pending_zexports += 1;
            }
        }
        Ok(())
    }

    /// Marks a thread as ending and hands drainable slots to the output drain.
    fn finish_thread(&mut self, slot: SlotId) -> SimResult<()> {
        let status = self.pool.status(slot)?;
        if matches!(status, SlotStatus::Ending | SlotStatus::Draining) {
            return Ok(());
        }
        self.pool.set_status(slot, SlotStatus::Ending)?;
        let record = self.pool.slot_mut(slot)?;
        if record.zexported {
            record.zexported = false;
            self.pending_zexports = self.pending_zexports.saturating_sub(1);
        }
        let drainable = self.scheduler.thread_finished(slot, &self.pool)?;
        trace!(%slot, drainable = drainable.len(), "thread finished");
        self.drain.push_finished(drainable);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════
    // Fetch
    // ══════════════════════════════════════════════════════════

    fn fetch_instruction<E: ShaderEmulator>(
        &mut self,
        slot: SlotId,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<FetchedInstruction> {
        let record = self.pool.slot(slot)?;
        let (pc, partition, repeated) = (record.pc, record.partition, record.repeat);
        let instr = emu.fetch_instruction(slot, pc, partition).ok_or(SimError::NoInstruction { slot, pc })?;

        if self.scalar_alu && !self.issue.claim(instr.scalar) {
            trace!(%slot, pc, "issue slot taken, fetch faked");
            return Ok(FetchedInstruction { slot, pc, partition, instr, repeated, fake: true });
        }

        let record = self.pool.slot_mut(slot)?;
        record.instruction_count += 1;
        if record.instruction_count > self.max_thread_instructions {
            warn!(%slot, pc, limit = self.max_thread_instructions, "instruction ceiling reached, ending thread");
            self.finish_thread(slot)?;
        }

        let still_ready = self.pool.is_ready(slot);
        let record = self.pool.slot_mut(slot)?;
        if still_ready {
            record.pc += 1;
        }
        record.repeat = false;
        stats.fetched += 1;

        #[cfg(feature = "always-trace")]
        trace!(%slot, pc, %instr, "fetched");

        Ok(FetchedInstruction { slot, pc, partition, instr, repeated, fake: false })
    }

    fn fetch_group<E: ShaderEmulator>(&mut self, group: GroupId, emu: &mut E, stats: &mut ShaderStats) -> SimResult<()> {
        self.group_fetch.begin(group);
        for (member, slot) in group.members(self.pool.group_size()).enumerate() {
            self.issue.reset();
            for _ in 0..self.instr_per_cycle {
                let instr = self.fetch_instruction(slot, emu, stats)?;
                self.group_fetch.store(member as u32, instr);
            }
        }
        Ok(())
    }

    /// Sends up to the thread rate of group members. Returns the instructions sent.
    fn fetch_lock_step<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<u32> {
        let mut search = self.pool.census().ready > 0;
        let mut fetched = 0;
        let mut sent = 0;

        while fetched < self.threads_per_cycle
            && (self.group_fetch.active().is_some() || (self.scheduler.has_candidates() && search))
        {
            if self.group_fetch.active().is_none() {
                match self.scheduler.select(&self.pool, cycle)? {
                    Some(group) => self.fetch_group(group, emu, stats)?,
                    None => {
                        search = false;
                        continue;
                    }
                }
            }

            let Some((slot, row, completed)) = self.group_fetch.send_next() else { break };
            for instr in row {
                wires.instructions.write(cycle, instr)?;
                sent += 1;
            }
            self.pool.slot_mut(slot)?.next_fetch_cycle = cycle + self.fetch_delay;
            fetched += 1;

            if let Some(group) = completed {
                self.scheduler.group_sent(group)?;
            }
        }
        Ok(sent)
    }

    /// Round robin over ready slots, each fetched at most once per cycle.
    fn fetch_threads<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<u32> {
        let total = self.pool.total();
        let mut visited = 0;
        let mut sent = 0;

        for _ in 0..self.threads_per_cycle {
            while !self.pool.is_ready(self.next_thread) && visited < total {
                self.next_thread = self.next_thread.wrapping_add(1, total);
                visited += 1;
            }
            if visited >= total {
                break;
            }

            let slot = self.next_thread;
            self.issue.reset();
            for _ in 0..self.instr_per_cycle {
                let instr = self.fetch_instruction(slot, emu, stats)?;
                wires.instructions.write(cycle, instr)?;
                sent += 1;
            }
            self.pool.slot_mut(slot)?.next_fetch_cycle = cycle + self.fetch_delay;
            self.next_thread = slot.wrapping_add(1, total);
            visited += 1;
        }
        Ok(sent)
    }

    // ══════════════════════════════════════════════════════════
    // Output and back-pressure
    // ══════════════════════════════════════════════════════════

    fn drain_outputs<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        consumer: ConsumerState,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        if self.drain.in_progress() {
            for slot in self.drain.countdown() {
                self.reload(cycle, slot)?;
            }
            return Ok(());
        }

        if consumer != ConsumerState::Ready
            || !self.drain.should_transmit(self.outputs_per_cycle, self.pool.free_slots(), self.pool.total())
        {
            return Ok(());
        }

        let slots = self.drain.candidates(self.outputs_per_cycle);
        let mut trans_cycles = 0;
        for &slot in &slots {
            self.pool.set_status(slot, SlotStatus::Draining)?;
            let record = self.pool.slot(slot)?;
            let partition = record.partition;
            let (id, mode) = record.work.as_ref().map(|w| (w.id, w.mode)).ok_or(SimError::IllegalCommand {
                command: "OUTPUT",
                slot,
                state: SlotStatus::Free.name(),
            })?;

            let trans = self.partitions.transmission_cycles(partition, self.output_transmission_latency);
            trans_cycles = trans_cycles.max(trans);
            let output = ShaderOutput {
                id,
                mode,
                attributes: emu.read_state(slot, Bank::Output, MAX_ATTRIBUTES),
                killed: emu.was_killed(slot),
                slot,
            };
            debug!(%slot, id, killed = output.killed, trans, "output transmitted");
            wires.output.write_delayed(cycle, output, (trans + self.output_delay).max(1))?;
            stats.outputs += 1;
        }

        for slot in self.drain.start(slots.len(), trans_cycles) {
            self.reload(cycle, slot)?;
        }
        Ok(())
    }

    fn publish_state(&mut self, cycle: u64, wires: &mut Wires) -> SimResult<()> {
        let inputs = if self.lock_step {
            self.inputs_per_cycle.max(self.pool.group_size())
        } else {
            self.inputs_per_cycle
        };
        let max_resources = self.partitions.max_thread_resources();

        let state = if self.pool.free_slots() < 2 * inputs || self.pool.free_resources() < 2 * inputs * max_resources
        {
            self.scheduler.backpressure();
            ShaderState::Busy
        } else if self.pool.is_empty() {
            ShaderState::Empty
        } else {
            ShaderState::Ready
        };

        if state != self.state {
            trace!(?state, free = self.pool.free_slots(), "shader state changed");
        }
        self.state = state;
        wires.shader_state.write(cycle, state)
    }

    fn update_stats(&self, stats: &mut ShaderStats) {
        let census = self.pool.census();
        stats.ready_thread_cycles += u64::from(census.ready);
        stats.blocked_thread_cycles += u64::from(census.blocked);
        stats.finished_thread_cycles += u64::from(census.ending);
        stats.free_thread_cycles += u64::from(census.free);
        stats.used_resource_cycles += u64::from(self.pool.used_resources());
        if census.free == self.pool.total() {
            stats.empty_cycles += 1;
        }
    }
}

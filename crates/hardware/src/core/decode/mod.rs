//! Shader decode-execute box.
//!
//! The decode-execute box receives fetched instructions, checks each against the
//! thread's register dependences and the shared execution resources, and either issues
//! it into the execution pipeline or asks fetch to replay it. It provides:
//! 1. **Hazards:** RAW, WAW, write-port, ALU and texture ticket checks per instruction.
//! 2. **Group Decode:** Members of a lock-step group issue the instructions the first
//!    member issued; a stall on a later member holds the decode loop.
//! 3. **Execution:** Fixed per-opcode latency through an internal delayed signal.
//! 4. **Control:** BLOCK, UNBLOCK, END, REPEAT_LAST and ZEXPORT commands back to fetch.
//! 5. **Texture:** Ticket accounting, request dispatch and result handling.

/// Per-thread dependence tracking.
pub mod hazards;

/// Instruction buffer between fetch and decode.
pub mod ibuffer;

/// Texture ticket accounting and request dispatch.
pub mod texture;

/// Register write-port reservation table.
pub mod write_ports;

use tracing::{debug, trace};

use self::hazards::HazardTracker;
use self::ibuffer::InstructionBuffer;
use self::texture::TextureArbiter;
use self::write_ports::WritePortTable;
use crate::common::constants::{MAX_EXEC_BW, MAX_EXEC_LAT};
use crate::common::{SimError, SimResult, SlotId};
use crate::config::ShaderConfig;
use crate::core::fetch::group_fetch::IssueSlots;
use crate::core::protocol::{ControlCommand, DecodeCommand, DecodeState, FetchedInstruction};
use crate::core::signal::Signal;
use crate::core::wires::Wires;
use crate::emulator::ShaderEmulator;
use crate::stats::ShaderStats;

/// Outcome of decoding one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decoded {
    /// Issue now.
    Issue,
    /// Drop without replay.
    Drop,
    /// A hazard or resource conflict; replay or hold.
    Stall(&'static str),
}

/// The decode-execute box.
#[derive(Clone, Debug)]
pub struct ShaderDecodeExecute {
    threads_per_cycle: u32,
    instr_per_cycle: u32,
    group_size: u32,
    groups_per_cycle: u32,
    scalar_alu: bool,
    resetting: bool,
    hazards: HazardTracker,
    ibuffer: InstructionBuffer,
    write_ports: WritePortTable,
    texture: TextureArbiter,
    alu: IssueSlots,
    exec: Signal<FetchedInstruction>,
    group_thread: u32,
    instr_thread: u32,
    instr_group: u32,
}

impl ShaderDecodeExecute {
    /// Builds the decode-execute box. The configuration must already be validated.
    ///
    /// The box starts in reset: the first clock clears all state.
    pub fn new(config: &ShaderConfig) -> Self {
        let f = &config.fetch;
        let lanes = f.threads_per_cycle * f.instr_per_cycle;
        // Outside lock-step mode every fetched thread decodes on its own.
        let group_size = if f.lock_step { config.threads.thread_group } else { 1 };
        Self {
            threads_per_cycle: f.threads_per_cycle,
            instr_per_cycle: f.instr_per_cycle,
            group_size,
            groups_per_cycle: f.threads_per_cycle.div_ceil(group_size),
            scalar_alu: f.scalar_alu,
            resetting: true,
            hazards: HazardTracker::new(config.threads.total_slots()),
            ibuffer: InstructionBuffer::new(lanes as usize),
            write_ports: WritePortTable::new(MAX_EXEC_BW * lanes),
            texture: TextureArbiter::new(
                config.texture.units,
                config.texture.request_rate,
                config.texture.requests_per_unit,
            ),
            alu: IssueSlots::default(),
            exec: Signal::new("shader execution", (lanes * MAX_EXEC_BW) as usize, 1)
                .with_max_latency(MAX_EXEC_LAT as u64),
            group_thread: 0,
            instr_thread: 0,
            instr_group: 0,
        }
    }

    /// Per-thread decode state.
    pub const fn hazards(&self) -> &HazardTracker {
        &self.hazards
    }

    /// Texture ticket state.
    pub const fn texture(&self) -> &TextureArbiter {
        &self.texture
    }

    /// Instruction buffer.
    pub const fn instruction_buffer(&self) -> &InstructionBuffer {
        &self.ibuffer
    }

    /// Instructions issued and not yet completed, over all threads.
    pub fn in_flight(&self) -> usize {
        self.exec.in_flight()
    }

    /// Advances the decode-execute box by one cycle.
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
        if wires.decode_commands.read(cycle) == Some(DecodeCommand::Reset) {
            debug!(cycle, "decode reset requested");
            self.resetting = true;
        }

        for (unit, ports) in wires.texture.iter_mut().enumerate() {
            if ports.tickets.read(cycle).is_some() {
                self.texture.grant(unit);
            }
        }

        if self.resetting {
            self.reset();
        } else {
            self.write_ports.retire();
            self.end_execution(cycle, wires, emu, stats)?;
            self.ibuffer.receive(wires.instructions.read_all(cycle))?;
            self.decode_cycle(cycle, wires, emu, stats)?;
            self.texture.dispatch(cycle, emu, &mut wires.texture, stats)?;
            self.texture_results(cycle, wires, emu, stats)?;
        }

        let state = if self.ibuffer.free_entries() >= 2 { DecodeState::Ready } else { DecodeState::Busy };
        wires.decode_state.write(cycle, state)
    }

    fn reset(&mut self) {
        self.hazards.reset();
        self.ibuffer.reset();
        self.write_ports.reset();
        self.texture.reset();
        self.alu.reset();
        self.exec.clear();
        self.group_thread = 0;
        self.instr_thread = 0;
        self.instr_group = 0;
        self.resetting = false;
    }

    // ══════════════════════════════════════════════════════════
    // Decode loop
    // ══════════════════════════════════════════════════════════

    fn decode_cycle<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        let mut exec_groups = 0;
        let mut block = false;
        let mut thread = 0;

        while thread < self.threads_per_cycle && exec_groups < self.groups_per_cycle && !block && !self.ibuffer.is_empty()
        {
            self.alu.reset();

            let mut lane = 0;
            while lane < self.instr_per_cycle && self.instr_thread < self.instr_per_cycle && !block {
                lane += 1;
                let Some(taken) = self.ibuffer.take() else { break };
                let Some(instr) = taken else {
                    self.ibuffer.advance();
                    continue;
                };

                if instr.fake {
                    stats.faked += 1;
                    self.consume();
                    continue;
                }

                let in_group = self.group_thread > 0;
                let outcome = if in_group && self.instr_thread >= self.instr_group {
                    Decoded::Drop
                } else {
                    self.decode(cycle, &instr, in_group)?
                };

                match outcome {
                    Decoded::Issue => {
                        self.start_execution(cycle, instr, wires, emu, stats)?;
                        if !in_group {
                            self.instr_group += 1;
                        }
                        self.consume();
                    }
                    Decoded::Stall(reason) if in_group => {
                        trace!(slot = %instr.slot, pc = instr.pc, reason, "group member stalled");
                        stats.blocked_instructions += 1;
                        self.ibuffer.put_back(instr);
                        block = true;
                    }
                    Decoded::Stall(reason) => {
                        trace!(slot = %instr.slot, pc = instr.pc, reason, "replay");
                        wires.control.write(cycle, ControlCommand::RepeatLast { slot: instr.slot, pc: instr.pc })?;
                        stats.replays += 1;
                        stats.removed_instructions += 1;
                        self.consume();
                    }
                    Decoded::Drop => {
                        stats.removed_instructions += 1;
                        self.consume();
                    }
                }
            }

            if self.instr_thread == self.instr_per_cycle {
                self.instr_thread = 0;
                self.group_thread += 1;
                if self.group_thread == self.group_size {
                    self.group_thread = 0;
                    self.instr_group = 0;
                    exec_groups += 1;
                }
            }
            thread += 1;
        }
        Ok(())
    }

    /// Moves past the current instruction and counts it for its thread.
    fn consume(&mut self) {
        self.ibuffer.advance();
        self.instr_thread += 1;
    }

    fn decode(&mut self, cycle: u64, fetched: &FetchedInstruction, in_group: bool) -> SimResult<Decoded> {
        let slot = fetched.slot;
        let thread = self.hazards.thread_mut(slot)?;
        thread.wait_repeated &= !fetched.repeated;
        if thread.wait_repeated || thread.end || !thread.ready {
            return Ok(Decoded::Drop);
        }

        let Some(reason) = self.stall_reason(cycle, fetched)? else {
            return Ok(Decoded::Issue);
        };
        if !in_group {
            self.hazards.thread_mut(slot)?.wait_repeated = true;
        }
        Ok(Decoded::Stall(reason))
    }

    fn stall_reason(&self, cycle: u64, fetched: &FetchedInstruction) -> SimResult<Option<&'static str>> {
        let instr = &fetched.instr;
        let thread = self.hazards.thread(fetched.slot)?;

        if instr.opcode.is_texture_load() && !self.texture.has_ticket() {
            return Ok(Some("no texture ticket"));
        }
        if self.scalar_alu && self.alu.taken(instr.scalar) {
            return Ok(Some(if instr.scalar { "scalar alu busy" } else { "simd alu busy" }));
        }
        for op in instr.hazard_sources() {
            if thread.has_raw(op)? {
                return Ok(Some("read after write"));
            }
        }
        let latency = instr.issue_latency();
        if let Some(result) = instr.written_register()
            && thread.write_cycle(result)? >= cycle + u64::from(latency)
        {
            return Ok(Some("write after write"));
        }
        if self.write_ports.is_full(latency) {
            return Ok(Some("write port"));
        }
        Ok(None)
    }

    // ══════════════════════════════════════════════════════════
    // Execution
    // ══════════════════════════════════════════════════════════

    fn start_execution<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        fetched: FetchedInstruction,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        let latency = fetched.instr.issue_latency();
        let opcode = fetched.instr.opcode;
        if latency as usize > MAX_EXEC_LAT {
            return Err(SimError::LatencyOverflow { opcode: opcode.mnemonic(), latency });
        }
        let (slot, pc) = (fetched.slot, fetched.pc);

        if opcode.is_end() {
            self.hazards.thread_mut(slot)?.end = true;
            self.block_thread(cycle, slot, pc, wires, stats)?;
        }
        if opcode.is_zexport() {
            self.hazards.thread_mut(slot)?.zexport = true;
        }
        if opcode.is_texture_load() {
            self.hazards.thread_mut(slot)?.wait_texture = true;
            self.texture.consume();
            self.block_thread(cycle, slot, pc, wires, stats)?;
        }

        let thread = self.hazards.thread_mut(slot)?;
        if let Some(result) = fetched.instr.written_register() {
            thread.mark_write(slot, result, cycle + u64::from(latency))?;
        }
        thread.pending += 1;

        emu.execute(slot, pc, &fetched.instr);
        if self.scalar_alu {
            let claimed = self.alu.claim(fetched.instr.scalar);
            debug_assert!(claimed, "issue slot taken after the stall check passed");
        }
        self.write_ports.reserve(latency);

        #[cfg(feature = "always-trace")]
        trace!(%slot, pc, instr = %fetched.instr, latency, "issue");

        self.exec.write_delayed(cycle, fetched, u64::from(latency))
    }

    fn end_execution<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        for fetched in self.exec.read_all(cycle) {
            let slot = fetched.slot;
            let pc = emu.thread_pc(slot);
            let thread = self.hazards.thread_mut(slot)?;
            thread.pending = thread.pending.saturating_sub(1);

            if thread.zexport {
                thread.zexport = false;
                wires.control.write(cycle, ControlCommand::ZExport { slot, pc })?;
                stats.zexports += 1;
            }

            if thread.end && !thread.wait_texture && thread.pending == 0 {
                thread.end = false;
                thread.ready = true;
                trace!(%slot, pc, "thread end");
                wires.control.write(cycle, ControlCommand::End { slot, pc })?;
                stats.ends += 1;
            }

            if let Some(result) = fetched.instr.written_register() {
                thread.complete_write(result, cycle)?;
            }
            stats.executed += 1;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════
    // Control and texture
    // ══════════════════════════════════════════════════════════

    fn block_thread(
        &mut self,
        cycle: u64,
        slot: SlotId,
        pc: u32,
        wires: &mut Wires,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        let thread = self.hazards.thread_mut(slot)?;
        if thread.ready {
            thread.ready = false;
            trace!(%slot, pc, "block");
            wires.control.write(cycle, ControlCommand::Block { slot, pc })?;
            stats.blocks += 1;
        }
        Ok(())
    }

    fn unblock_thread(&mut self, cycle: u64, slot: SlotId, wires: &mut Wires, stats: &mut ShaderStats) -> SimResult<()> {
        let thread = self.hazards.thread_mut(slot)?;
        if thread.ready {
            return Err(SimError::NotBlocked(slot));
        }
        thread.ready = true;
        trace!(%slot, "unblock");
        wires.control.write(cycle, ControlCommand::Unblock { slot, pc: 0 })?;
        stats.unblocks += 1;
        Ok(())
    }

    fn texture_results<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        wires: &mut Wires,
        emu: &mut E,
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        for unit in 0..wires.texture.len() {
            for result in wires.texture[unit].results.read_all(cycle) {
                let threads = emu.complete_texture_access(result.access_id)?;
                trace!(id = result.access_id, unit, "texture result");
                for slot in threads {
                    if !self.hazards.thread(slot)?.end {
                        self.unblock_thread(cycle, slot, wires, stats)?;
                    }
                    let thread = self.hazards.thread_mut(slot)?;
                    thread.wait_texture = false;
                    if thread.end && thread.pending == 0 {
                        thread.end = false;
                        thread.ready = true;
                        wires.control.write(cycle, ControlCommand::End { slot, pc: 0 })?;
                        stats.ends += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

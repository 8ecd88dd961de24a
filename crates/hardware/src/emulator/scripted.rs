//! Deterministic scripted emulator.
//!
//! Serves instructions from programs loaded into a flat instruction memory and keeps
//! just enough register state to make outputs observable. It provides:
//! 1. **Program Memory:** `DecodedInstruction`s indexed by PC, shared by all partitions.
//!    Addresses inside the memory that were never loaded read as `NOP`.
//! 2. **Move Semantics:** A result-writing instruction copies its first source operand.
//! 3. **Kill:** Kill-class instructions take effect when the first source has a negative
//!    component, or unconditionally for slots marked with `inject_kill`.
//! 4. **Texture Stamps:** A texture access forms once every thread of a four-slot stamp
//!    executed a texture load at the same PC; completion writes the coordinate back.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::trace;

use super::ShaderEmulator;
use crate::common::constants::{INSTRUCTION_MEMORY_SIZE, STAMP_FRAGMENTS};
use crate::common::{SimError, SimResult, SlotId};
use crate::core::protocol::{Partition, TextureAccess, Vec4};
use crate::isa::{Bank, DecodedInstruction, Operand};

const ZERO: Vec4 = [0.0; 4];

#[derive(Clone, Debug, Default)]
struct ThreadState {
    pc: u32,
    input: Vec<Vec4>,
    output: Vec<Vec4>,
    temp: Vec<Vec4>,
    addr: Vec<Vec4>,
    pred: Vec<Vec4>,
    killed: bool,
}

impl ThreadState {
    fn bank(&self, bank: Bank) -> Option<&Vec<Vec4>> {
        match bank {
            Bank::Input => Some(&self.input),
            Bank::Output => Some(&self.output),
            Bank::Temp => Some(&self.temp),
            Bank::Addr => Some(&self.addr),
            Bank::Pred => Some(&self.pred),
            Bank::Param | Bank::Texture => None,
        }
    }

    fn bank_mut(&mut self, bank: Bank) -> Option<&mut Vec<Vec4>> {
        match bank {
            Bank::Input => Some(&mut self.input),
            Bank::Output => Some(&mut self.output),
            Bank::Temp => Some(&mut self.temp),
            Bank::Addr => Some(&mut self.addr),
            Bank::Pred => Some(&mut self.pred),
            Bank::Param | Bank::Texture => None,
        }
    }
}

/// A texture load waiting for the rest of its stamp.
#[derive(Clone, Copy, Debug)]
struct StampMember {
    slot: SlotId,
    result: Option<Operand>,
    coord: Vec4,
}

/// Scripted functional emulator.
#[derive(Clone, Debug, Default)]
pub struct ScriptedEmulator {
    memory_size: u32,
    program: BTreeMap<u32, DecodedInstruction>,
    params: Vec<Vec4>,
    threads: Vec<ThreadState>,
    forced_kills: BTreeSet<SlotId>,
    stamps: HashMap<(usize, u32), Vec<StampMember>>,
    texture_queue: VecDeque<TextureAccess>,
    texture_in_flight: HashMap<u64, Vec<StampMember>>,
    next_access_id: u64,
    executed: u64,
}

impl ScriptedEmulator {
    /// Creates an emulator for `num_slots` hardware threads.
    pub fn new(num_slots: u32) -> Self {
        Self {
            memory_size: INSTRUCTION_MEMORY_SIZE,
            threads: vec![ThreadState::default(); num_slots as usize],
            ..Self::default()
        }
    }

    /// Loads a program at `pc` and returns the emulator.
    #[must_use]
    pub fn with_program(mut self, code: &[DecodedInstruction], pc: u32) -> Self {
        self.load_program(code, pc);
        self
    }

    /// Makes the next kill-class instruction executed by `slot` take effect.
    pub fn inject_kill(&mut self, slot: SlotId) {
        let _ = self.forced_kills.insert(slot);
    }

    /// Instructions executed since construction.
    pub const fn executed(&self) -> u64 {
        self.executed
    }

    /// Number of texture accesses formed but not yet completed.
    pub fn texture_accesses_in_flight(&self) -> usize {
        self.texture_queue.len() + self.texture_in_flight.len()
    }

    fn read_operand(&self, slot: SlotId, op: Operand) -> Vec4 {
        let reg = op.reg as usize;
        match op.bank {
            Bank::Param => self.params.get(reg).copied().unwrap_or(ZERO),
            Bank::Texture => ZERO,
            bank => self
                .threads
                .get(slot.index())
                .and_then(|t| t.bank(bank))
                .and_then(|regs| regs.get(reg))
                .copied()
                .unwrap_or(ZERO),
        }
    }

    fn write_operand(&mut self, slot: SlotId, op: Operand, value: Vec4) {
        let Some(regs) = self.threads.get_mut(slot.index()).and_then(|t| t.bank_mut(op.bank)) else {
            return;
        };
        let reg = op.reg as usize;
        if regs.len() <= reg {
            regs.resize(reg + 1, ZERO);
        }
        regs[reg] = value;
    }

    fn record_texture_load(&mut self, slot: SlotId, pc: u32, instr: &DecodedInstruction) {
        let coord = instr.sources.first().map_or(ZERO, |&op| self.read_operand(slot, op));
        let key = (slot.index() / STAMP_FRAGMENTS, pc);
        let members = self.stamps.entry(key).or_default();
        members.push(StampMember { slot, result: instr.result, coord });
        if members.len() < STAMP_FRAGMENTS {
            return;
        }
        let Some(members) = self.stamps.remove(&key) else {
            return;
        };
        let id = self.next_access_id;
        self.next_access_id += 1;
        let threads = std::array::from_fn(|i| members[i].slot);
        trace!(id, stamp = key.0, pc, "texture access formed");
        self.texture_queue.push_back(TextureAccess { id, threads, cycle: 0 });
        let _ = self.texture_in_flight.insert(id, members);
    }
}

impl ShaderEmulator for ScriptedEmulator {
    fn reset_state(&mut self, slot: SlotId) {
        if let Some(thread) = self.threads.get_mut(slot.index()) {
            *thread = ThreadState::default();
        }
        let _ = self.forced_kills.remove(&slot);
    }

    fn load_state(&mut self, slot: SlotId, bank: Bank, values: &[Vec4], first: u32, count: usize) {
        let first = first as usize;
        let regs = if bank == Bank::Param {
            &mut self.params
        } else {
            match self.threads.get_mut(slot.index()).and_then(|t| t.bank_mut(bank)) {
                Some(regs) => regs,
                None => return,
            }
        };
        if regs.len() < first + count {
            regs.resize(first + count, ZERO);
        }
        for (i, reg) in regs[first..first + count].iter_mut().enumerate() {
            *reg = values.get(i).copied().unwrap_or(ZERO);
        }
    }

    fn set_pc(&mut self, slot: SlotId, pc: u32) {
        if let Some(thread) = self.threads.get_mut(slot.index()) {
            thread.pc = pc;
        }
    }

    fn thread_pc(&self, slot: SlotId) -> u32 {
        self.threads.get(slot.index()).map_or(0, |t| t.pc)
    }

    fn fetch_instruction(&mut self, _slot: SlotId, pc: u32, _partition: Partition) -> Option<DecodedInstruction> {
        if pc >= self.memory_size {
            return None;
        }
        Some(self.program.get(&pc).cloned().unwrap_or_else(DecodedInstruction::nop))
    }

    fn read_state(&self, slot: SlotId, bank: Bank, count: usize) -> Vec<Vec4> {
        (0..count as u32).map(|reg| self.read_operand(slot, Operand::new(bank, reg))).collect()
    }

    fn was_killed(&self, slot: SlotId) -> bool {
        self.threads.get(slot.index()).is_some_and(|t| t.killed)
    }

    fn load_program(&mut self, code: &[DecodedInstruction], pc: u32) {
        for (addr, instr) in (pc..).zip(code) {
            let _ = self.program.insert(addr, instr.clone());
        }
    }

    fn execute(&mut self, slot: SlotId, pc: u32, instr: &DecodedInstruction) {
        self.executed += 1;
        self.set_pc(slot, pc + 1);

        if instr.opcode.is_texture_load() {
            self.record_texture_load(slot, pc, instr);
        } else if instr.opcode.is_kill() {
            let src = instr.sources.first().map_or(ZERO, |&op| self.read_operand(slot, op));
            let forced = self.forced_kills.remove(&slot);
            if forced || src.iter().any(|c| *c < 0.0) {
                if let Some(thread) = self.threads.get_mut(slot.index()) {
                    thread.killed = true;
                }
            }
        } else if let Some(res) = instr.written_register() {
            let value = instr.sources.first().map_or(ZERO, |&op| self.read_operand(slot, op));
            self.write_operand(slot, res, value);
        }
    }

    fn next_texture_access(&mut self) -> Option<TextureAccess> {
        self.texture_queue.pop_front()
    }

    fn complete_texture_access(&mut self, id: u64) -> SimResult<[SlotId; STAMP_FRAGMENTS]> {
        let members = self.texture_in_flight.remove(&id).ok_or(SimError::UnknownTextureAccess(id))?;
        for member in &members {
            if let Some(res) = member.result {
                self.write_operand(member.slot, res, member.coord);
            }
        }
        Ok(std::array::from_fn(|i| members[i].slot))
    }
}

//! Functional emulator seam.
//!
//! The shader boxes model timing only; register contents, program memory and
//! texture access formation belong to a functional emulator behind this trait. It provides:
//! 1. **Thread State:** Reset, register bank loads and reads, PC control.
//! 2. **Instruction Supply:** Decoded instructions by thread and PC.
//! 3. **Execution:** Functional execution at issue and kill reporting.
//! 4. **Texture Accesses:** Accesses formed by fragment stamps and their completion.

/// Deterministic emulator serving scripted programs.
pub mod scripted;

pub use scripted::ScriptedEmulator;

use crate::common::{SimResult, SlotId};
use crate::common::constants::STAMP_FRAGMENTS;
use crate::core::protocol::{Partition, TextureAccess, Vec4};
use crate::isa::{Bank, DecodedInstruction};

/// Functional emulator driven by the fetch and decode-execute boxes.
///
/// Parameter (constant) bank writes go through `load_state` on slot 0 with the
/// partition offset already applied to `first`.
pub trait ShaderEmulator {
    /// Clears all per-thread state of `slot`.
    fn reset_state(&mut self, slot: SlotId);

    /// Loads `count` registers of `bank` starting at `first`. Missing values load as zero.
    fn load_state(&mut self, slot: SlotId, bank: Bank, values: &[Vec4], first: u32, count: usize);

    /// Sets the PC of a thread.
    fn set_pc(&mut self, slot: SlotId, pc: u32);

    /// Returns the PC of a thread after its last executed instruction.
    fn thread_pc(&self, slot: SlotId) -> u32;

    /// Returns the instruction at `pc` for a thread, or `None` if there is none.
    fn fetch_instruction(&mut self, slot: SlotId, pc: u32, partition: Partition) -> Option<DecodedInstruction>;

    /// Reads the first `count` registers of `bank` of a thread.
    fn read_state(&self, slot: SlotId, bank: Bank, count: usize) -> Vec<Vec4>;

    /// Returns true if the thread executed a kill that took effect.
    fn was_killed(&self, slot: SlotId) -> bool;

    /// Copies a program into instruction memory at `pc`.
    fn load_program(&mut self, code: &[DecodedInstruction], pc: u32);

    /// Functionally executes an issued instruction.
    fn execute(&mut self, slot: SlotId, pc: u32, instr: &DecodedInstruction);

    /// Pops the next texture access ready to be sent to a texture unit.
    fn next_texture_access(&mut self) -> Option<TextureAccess>;

    /// Completes a texture access and returns the stamp threads it covered.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownTextureAccess` if `id` is not in flight.
    fn complete_texture_access(&mut self, id: u64) -> SimResult<[SlotId; STAMP_FRAGMENTS]>;
}

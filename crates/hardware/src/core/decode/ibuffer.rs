//! Decode instruction buffer.
//!
//! Each entry holds one fetch cycle: up to `threads_per_cycle * instr_per_cycle`
//! instructions in arrival order, padded with empty lanes. Instructions are consumed
//! lane by lane; a stalled instruction is put back and retried on a later cycle.

use crate::common::constants::INSTRUCTION_BUFFER_ENTRIES;
use crate::common::{SimError, SimResult};
use crate::core::protocol::FetchedInstruction;

/// Ring of fetch-cycle entries.
#[derive(Clone, Debug)]
pub struct InstructionBuffer {
    entries: Vec<Vec<Option<FetchedInstruction>>>,
    lanes: usize,
    next_entry: usize,
    next_lane: usize,
    next_free: usize,
    free: usize,
}

impl InstructionBuffer {
    /// Creates an empty buffer of `lanes` instructions per entry.
    pub fn new(lanes: usize) -> Self {
        Self {
            entries: vec![vec![None; lanes]; INSTRUCTION_BUFFER_ENTRIES],
            lanes,
            next_entry: 0,
            next_lane: 0,
            next_free: 0,
            free: INSTRUCTION_BUFFER_ENTRIES,
        }
    }

    /// Free entries.
    #[inline]
    pub const fn free_entries(&self) -> usize {
        self.free
    }

    /// Returns true if no entry holds unconsumed lanes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.free == INSTRUCTION_BUFFER_ENTRIES
    }

    /// Stores the instructions received in one cycle in a new entry.
    ///
    /// Nothing is stored when `received` is empty.
    ///
    /// # Errors
    ///
    /// Returns `SimError::QueueOverflow` if no entry is free or the cycle carried more
    /// instructions than an entry holds.
    pub fn receive(&mut self, received: Vec<FetchedInstruction>) -> SimResult<()> {
        if received.is_empty() {
            return Ok(());
        }
        if self.free == 0 {
            return Err(SimError::QueueOverflow { queue: "instruction buffer", capacity: INSTRUCTION_BUFFER_ENTRIES });
        }
        if received.len() > self.lanes {
            return Err(SimError::QueueOverflow { queue: "instruction buffer entry", capacity: self.lanes });
        }
        let entry = &mut self.entries[self.next_free];
        entry.clear();
        entry.extend(received.into_iter().map(Some));
        entry.resize(self.lanes, None);
        self.next_free = (self.next_free + 1) % INSTRUCTION_BUFFER_ENTRIES;
        self.free -= 1;
        Ok(())
    }

    /// Takes the instruction in the current lane.
    ///
    /// Returns `None` when the buffer is empty and `Some(None)` for a padding lane.
    pub fn take(&mut self) -> Option<Option<FetchedInstruction>> {
        if self.is_empty() {
            return None;
        }
        Some(self.entries[self.next_entry][self.next_lane].take())
    }

    /// Returns a taken instruction to the current lane without advancing.
    pub fn put_back(&mut self, instr: FetchedInstruction) {
        self.entries[self.next_entry][self.next_lane] = Some(instr);
    }

    /// Moves to the next lane, freeing the entry after its last lane.
    pub fn advance(&mut self) {
        self.next_lane += 1;
        if self.next_lane == self.lanes {
            self.next_lane = 0;
            self.next_entry = (self.next_entry + 1) % INSTRUCTION_BUFFER_ENTRIES;
            self.free += 1;
        }
    }

    /// Drops every buffered instruction.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.fill(None);
        }
        self.next_entry = 0;
        self.next_lane = 0;
        self.next_free = 0;
        self.free = INSTRUCTION_BUFFER_ENTRIES;
    }
}

//! Per-thread decode state and register dependence tracking.
//!
//! Every hazard-tracked register carries a pending-write flag and the cycle its last
//! issued write completes. It provides:
//! 1. **Thread Flags:** Ready, end, texture wait, replay wait and z-export per slot.
//! 2. **RAW:** Pending-write lookup for the temporary, address and predicate banks.
//! 3. **WAW:** Completion stamps compared against the latency of a new write.
//! 4. **Completion:** A pending flag clears only when the completing write is the latest one.

use crate::common::constants::{ADDR_BANK_REGS, OUTPUT_BANK_REGS, PRED_BANK_REGS, TEMP_BANK_REGS};
use crate::common::{SimError, SimResult, SlotId};
use crate::isa::{Bank, Operand};

/// Writable banks in table order.
const TRACKED_BANKS: [(Bank, usize); 4] = [
    (Bank::Temp, TEMP_BANK_REGS),
    (Bank::Addr, ADDR_BANK_REGS),
    (Bank::Pred, PRED_BANK_REGS),
    (Bank::Output, OUTPUT_BANK_REGS),
];

const fn table_index(bank: Bank) -> Option<usize> {
    match bank {
        Bank::Temp => Some(0),
        Bank::Addr => Some(1),
        Bank::Pred => Some(2),
        Bank::Output => Some(3),
        Bank::Input | Bank::Param | Bank::Texture => None,
    }
}

#[derive(Clone, Debug)]
struct RegisterTable {
    pending: Vec<bool>,
    write_cycle: Vec<u64>,
}

impl RegisterTable {
    fn new(regs: usize) -> Self {
        Self { pending: vec![false; regs], write_cycle: vec![0; regs] }
    }

    fn reset(&mut self) {
        self.pending.fill(false);
        self.write_cycle.fill(0);
    }
}

/// Decode-side state of one thread.
#[derive(Clone, Debug)]
pub struct ThreadHazards {
    /// Instructions issued and not yet completed.
    pub pending: u32,
    /// The thread may issue; cleared when decode sends BLOCK.
    pub ready: bool,
    /// A texture load is waiting for its result.
    pub wait_texture: bool,
    /// END was issued; later instructions are dropped.
    pub end: bool,
    /// A replay was requested; instructions are dropped until the replayed one arrives.
    pub wait_repeated: bool,
    /// A z-export instruction is in flight.
    pub zexport: bool,
    tables: [RegisterTable; 4],
}

impl ThreadHazards {
    fn new() -> Self {
        Self {
            pending: 0,
            ready: true,
            wait_texture: false,
            end: false,
            wait_repeated: false,
            zexport: false,
            tables: TRACKED_BANKS.map(|(_, regs)| RegisterTable::new(regs)),
        }
    }

    fn reset(&mut self) {
        self.pending = 0;
        self.ready = true;
        self.wait_texture = false;
        self.end = false;
        self.wait_repeated = false;
        self.zexport = false;
        for table in &mut self.tables {
            table.reset();
        }
    }

    fn entry(&self, op: Operand) -> SimResult<(&RegisterTable, usize)> {
        let table = table_index(op.bank).map(|i| &self.tables[i]).ok_or_else(|| illegal(op))?;
        let reg = op.reg as usize;
        if reg >= table.pending.len() {
            return Err(illegal(op));
        }
        Ok((table, reg))
    }

    fn entry_mut(&mut self, op: Operand) -> SimResult<(&mut RegisterTable, usize)> {
        let table = table_index(op.bank).map(|i| &mut self.tables[i]).ok_or_else(|| illegal(op))?;
        let reg = op.reg as usize;
        if reg >= table.pending.len() {
            return Err(illegal(op));
        }
        Ok((table, reg))
    }

    /// Returns true if a read of `op` must wait for an outstanding write.
    ///
    /// Banks the tracker does not cover for reads never report a dependence.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegister` for a register outside its bank.
    pub fn has_raw(&self, op: Operand) -> SimResult<bool> {
        if !op.bank.tracks_reads() {
            return Ok(false);
        }
        let (table, reg) = self.entry(op)?;
        Ok(table.pending[reg])
    }

    /// Cycle the latest issued write to `op` completes.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegister` if `op` is not a writable register.
    pub fn write_cycle(&self, op: Operand) -> SimResult<u64> {
        let (table, reg) = self.entry(op)?;
        Ok(table.write_cycle[reg])
    }

    /// Records an issued write to `op` completing at `until`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegister` if `op` is not a writable register and
    /// `SimError::WriteAfterWrite` if an earlier write completes at or after `until`.
    pub fn mark_write(&mut self, slot: SlotId, op: Operand, until: u64) -> SimResult<()> {
        let (table, reg) = self.entry_mut(op)?;
        if table.write_cycle[reg] >= until {
            return Err(SimError::WriteAfterWrite { slot, bank: op.bank.name(), reg: op.reg });
        }
        table.pending[reg] = true;
        table.write_cycle[reg] = until;
        Ok(())
    }

    /// Clears the pending flag of `op` if the write completing at `cycle` is the latest.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegister` if `op` is not a writable register.
    pub fn complete_write(&mut self, op: Operand, cycle: u64) -> SimResult<()> {
        let (table, reg) = self.entry_mut(op)?;
        if table.write_cycle[reg] == cycle {
            table.pending[reg] = false;
        }
        Ok(())
    }
}

const fn illegal(op: Operand) -> SimError {
    SimError::IllegalRegister { bank: op.bank.name(), reg: op.reg }
}

/// Decode state for every slot of the thread table.
#[derive(Clone, Debug)]
pub struct HazardTracker {
    threads: Vec<ThreadHazards>,
}

impl HazardTracker {
    /// Creates ready, idle state for `total` slots.
    pub fn new(total: u32) -> Self {
        Self { threads: (0..total).map(|_| ThreadHazards::new()).collect() }
    }

    /// Borrows the state of a slot.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn thread(&self, slot: SlotId) -> SimResult<&ThreadHazards> {
        let total = self.threads.len() as u32;
        self.threads.get(slot.index()).ok_or(SimError::IllegalSlot { slot, total })
    }

    /// Mutably borrows the state of a slot.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn thread_mut(&mut self, slot: SlotId) -> SimResult<&mut ThreadHazards> {
        let total = self.threads.len() as u32;
        self.threads.get_mut(slot.index()).ok_or(SimError::IllegalSlot { slot, total })
    }

    /// Returns every slot to the ready, dependence-free state.
    pub fn reset(&mut self) {
        for thread in &mut self.threads {
            thread.reset();
        }
    }
}

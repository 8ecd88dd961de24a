//! Decoded shader instruction.
//!
//! A `DecodedInstruction` is what the emulator hands to the fetch box for one thread and PC.
//! It carries exactly what the hazard tracker inspects: opcode, scalar flag, source operands,
//! result register and the address register of a relative constant access.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::bank::{Bank, Operand};
use super::opcode::Opcode;

/// One decoded shader instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    /// Operation.
    pub opcode: Opcode,
    /// Executes on the scalar ALU instead of the SIMD ALU.
    #[serde(default)]
    pub scalar: bool,
    /// Source operands in order (at most three).
    #[serde(default)]
    pub sources: Vec<Operand>,
    /// Result register, if the opcode writes one.
    #[serde(default)]
    pub result: Option<Operand>,
    /// Address register used for a relative access to the constant bank.
    #[serde(default)]
    pub relative_addr: Option<u32>,
}

impl DecodedInstruction {
    /// Creates an instruction with no operands.
    pub const fn new(opcode: Opcode) -> Self {
        Self { opcode, scalar: false, sources: Vec::new(), result: None, relative_addr: None }
    }

    /// `END`.
    pub const fn end() -> Self {
        Self::new(Opcode::End)
    }

    /// `NOP`.
    pub const fn nop() -> Self {
        Self::new(Opcode::Nop)
    }

    /// Builds `opcode result, sources...`.
    pub fn alu(opcode: Opcode, result: Operand, sources: &[Operand]) -> Self {
        Self {
            opcode,
            scalar: false,
            sources: sources.iter().copied().take(3).collect(),
            result: Some(result),
            relative_addr: None,
        }
    }

    /// Marks the instruction as a scalar operation.
    #[must_use]
    pub const fn scalar(mut self) -> Self {
        self.scalar = true;
        self
    }

    /// Adds a relative constant access through address register `reg`.
    #[must_use]
    pub const fn relative(mut self, reg: u32) -> Self {
        self.relative_addr = Some(reg);
        self
    }

    /// Execution latency including the writeback cycle.
    #[inline]
    pub const fn issue_latency(&self) -> u32 {
        self.opcode.latency() + 1
    }

    /// The register written at completion, if any.
    #[inline]
    pub fn written_register(&self) -> Option<Operand> {
        if self.opcode.writes_result() { self.result } else { None }
    }

    /// Source operands the hazard tracker checks for read-after-write.
    pub fn hazard_sources(&self) -> impl Iterator<Item = Operand> + '_ {
        self.sources
            .iter()
            .take(3)
            .copied()
            .filter(|op| op.bank.tracks_reads())
            .chain(self.relative_addr.map(|reg| Operand::new(Bank::Addr, reg)))
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if self.scalar {
            f.write_str(".s")?;
        }
        let mut sep = " ";
        if let Some(res) = self.result {
            write!(f, "{sep}{res}")?;
            sep = ", ";
        }
        for src in &self.sources {
            write!(f, "{sep}{src}")?;
            sep = ", ";
        }
        if let Some(reg) = self.relative_addr {
            write!(f, " [a{reg}]")?;
        }
        Ok(())
    }
}

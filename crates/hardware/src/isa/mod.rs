//! Shader Instruction Model.
//!
//! The boxes never execute shader math; they only need enough of each instruction to
//! schedule it. This module provides:
//! 1. **Register Banks:** The register files an operand can name.
//! 2. **Opcodes:** Mnemonics with execution latencies and classification predicates.
//! 3. **Decoded Instructions:** Operands, result and relative addressing of one instruction.

/// Register bank identifiers.
pub mod bank;

/// Decoded instruction record.
pub mod instruction;

/// Opcode table with execution latencies.
pub mod opcode;

pub use bank::{Bank, Operand};
pub use instruction::DecodedInstruction;
pub use opcode::Opcode;

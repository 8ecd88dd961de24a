//! Global Shader Constants.
//!
//! This module defines constants shared by the fetch and decode-execute boxes. It includes:
//! 1. **Execution Window:** Depth and bandwidth of the register write-port table.
//! 2. **Register Banks:** Number of registers per hazard-tracked bank.
//! 3. **Attributes:** Input/output attribute limits per work item kind.
//! 4. **Partitions:** Constant bank layout and fixed program entry points.

/// Depth of the register write-port table in cycles.
///
/// Every instruction latency (plus the writeback cycle) must fit in this window.
pub const MAX_EXEC_LAT: usize = 32;

/// Register writes per cycle allowed for each fetched instruction lane.
pub const MAX_EXEC_BW: u32 = 1;

/// Registers in the temporary bank.
pub const TEMP_BANK_REGS: usize = 32;

/// Registers in the address bank.
pub const ADDR_BANK_REGS: usize = 4;

/// Registers in the predicate bank.
pub const PRED_BANK_REGS: usize = 32;

/// Registers in the output bank.
pub const OUTPUT_BANK_REGS: usize = MAX_ATTRIBUTES;

/// Maximum number of input or output attributes a program can toggle.
pub const MAX_ATTRIBUTES: usize = 16;

/// Attributes loaded for vertex, triangle and fragment work items.
pub const STANDARD_INPUT_ATTRIBUTES: usize = 16;

/// Attributes loaded for micro-triangle fragment work items.
pub const MICRO_FRAGMENT_INPUT_ATTRIBUTES: usize = STANDARD_INPUT_ATTRIBUTES * 3;

/// Fragments in a stamp; texture accesses and results cover one stamp.
pub const STAMP_FRAGMENTS: usize = 4;

/// Constant registers reserved per partition in the unified parameter bank.
pub const UNIFIED_CONSTANT_NUM_REGS: u32 = 512;

/// Fixed entry point of the triangle setup program in unified mode.
pub const TRIANGLE_SETUP_PROGRAM_PC: u32 = 384;

/// Texture tickets granted by each texture unit state signal.
pub const TICKETS_PER_GRANT: u32 = 4;

/// Entries in the decode instruction buffer (one fetch cycle each).
pub const INSTRUCTION_BUFFER_ENTRIES: usize = 2;

/// Initial value of the maximum per-thread resource cost.
pub const INITIAL_MAX_THREAD_RESOURCES: u32 = 3;

/// Instruction memory size of the scripted emulator, in instructions.
pub const INSTRUCTION_MEMORY_SIZE: u32 = 4096;

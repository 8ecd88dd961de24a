//! Fatal simulation errors and configuration errors.
//!
//! This module defines the error types returned by the shader boxes. It provides:
//! 1. **Fatal Conditions:** One `SimError` variant per class of internal consistency violation.
//! 2. **Configuration Errors:** Validation, parse and I/O failures while building a `ShaderConfig`.
//! 3. **Result Alias:** `SimResult<T>` for every fallible clock and command handler.

use thiserror::Error;

use super::ids::{GroupId, SlotId};

/// Result type returned by every fallible operation of the shader boxes.
pub type SimResult<T> = Result<T, SimError>;

/// Fatal simulation errors.
///
/// Any of these stops the simulation: they indicate a protocol violation between
/// boxes or a broken internal invariant, never a recoverable scheduling outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A bounded queue received more entries than its capacity.
    #[error("{queue} queue overflow (capacity {capacity})")]
    QueueOverflow {
        /// Name of the overflowing queue.
        queue: &'static str,
        /// Configured capacity.
        capacity: usize,
    },

    /// A slot index outside the thread table.
    #[error("illegal thread id {slot} (table holds {total} slots)")]
    IllegalSlot {
        /// Offending slot.
        slot: SlotId,
        /// Size of the thread table.
        total: u32,
    },

    /// A slot was released while already free.
    #[error("{0} released while already free")]
    DoubleFree(SlotId),

    /// A release would push the free counters above the configured totals.
    #[error("resource budget overflow: {free} free units exceeds total {total}")]
    BudgetOverflow {
        /// Free units after the release.
        free: u32,
        /// Configured total.
        total: u32,
    },

    /// No free slot or resource units for a new work item.
    #[error("no capacity for new work: {free_slots} free slots, {free_resources} free resources, cost {cost}")]
    NoCapacity {
        /// Free slots at the time of the request.
        free_slots: u32,
        /// Free resource units at the time of the request.
        free_resources: u32,
        /// Resource cost of the requested partition.
        cost: u32,
    },

    /// A per-cycle signal that must carry a value was empty.
    #[error("required signal {signal} missing at cycle {cycle}")]
    MissingSignal {
        /// Signal name.
        signal: &'static str,
        /// Cycle of the read.
        cycle: u64,
    },

    /// More values were written to a signal in one cycle than its bandwidth.
    #[error("signal {signal} bandwidth {bandwidth} exceeded at cycle {cycle}")]
    SignalBandwidth {
        /// Signal name.
        signal: &'static str,
        /// Values allowed per cycle.
        bandwidth: usize,
        /// Cycle of the write.
        cycle: u64,
    },

    /// A signal write used a latency outside `1..=max`.
    #[error("signal {signal} written with latency {latency} (max {max})")]
    SignalLatency {
        /// Signal name.
        signal: &'static str,
        /// Requested latency.
        latency: u64,
        /// Largest latency the signal accepts.
        max: u64,
    },

    /// A texture result named an access the emulator does not know.
    #[error("unknown texture access {0}")]
    UnknownTextureAccess(u64),

    /// A thread was fetched before its fetch delay elapsed.
    #[error("{slot} fetched at cycle {cycle} before its next fetch cycle {ready_at}")]
    FetchDelay {
        /// Fetched slot.
        slot: SlotId,
        /// Current cycle.
        cycle: u64,
        /// First cycle the slot may be fetched again.
        ready_at: u64,
    },

    /// Groups inside one batch reached different program counters.
    #[error("batch PC desynchronized: {group} at pc {found}, batch at pc {expected}")]
    BatchPcMismatch {
        /// Group found out of step.
        group: GroupId,
        /// PC of the first group of the batch.
        expected: u32,
        /// PC of the offending group.
        found: u32,
    },

    /// A group was appended to a batch that cannot accept it.
    #[error("cannot append {group} to batch: {reason}")]
    BatchAppend {
        /// Group being appended.
        group: GroupId,
        /// Why the append was rejected.
        reason: &'static str,
    },

    /// A control command arrived for a slot in the wrong state.
    #[error("{command} for {slot} in state {state}")]
    IllegalCommand {
        /// Command name.
        command: &'static str,
        /// Target slot.
        slot: SlotId,
        /// Current state of the slot.
        state: &'static str,
    },

    /// A command processor command that is not allowed in the current mode.
    #[error("shader command rejected: {0}")]
    InvalidShaderCommand(String),

    /// The emulator returned no instruction for an active thread.
    #[error("no instruction for {slot} at pc {pc}")]
    NoInstruction {
        /// Fetched slot.
        slot: SlotId,
        /// Program counter of the fetch.
        pc: u32,
    },

    /// An instruction latency does not fit the write-port window.
    #[error("latency {latency} of {opcode} exceeds the execution window")]
    LatencyOverflow {
        /// Mnemonic of the instruction.
        opcode: &'static str,
        /// Latency including writeback.
        latency: u32,
    },

    /// An issued instruction would overwrite a register with a later pending write.
    #[error("write-after-write on {slot} register {bank}[{reg}] at issue")]
    WriteAfterWrite {
        /// Issuing slot.
        slot: SlotId,
        /// Bank name.
        bank: &'static str,
        /// Register index.
        reg: u32,
    },

    /// A register outside its bank, or a result written to a read-only bank.
    #[error("illegal register {bank}[{reg}]")]
    IllegalRegister {
        /// Bank name.
        bank: &'static str,
        /// Register index.
        reg: u32,
    },

    /// Unblock arrived for a thread the decode box already considers ready.
    #[error("unblock for {0} which is not blocked")]
    NotBlocked(SlotId),

    /// Configuration validation failure surfaced at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A parameter combination the boxes cannot be built with.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// I/O error text.
        message: String,
    },

    /// The configuration text is not valid JSON for `ShaderConfig`.
    #[error("cannot parse configuration: {0}")]
    Parse(String),
}

//! SIMT shader core front-end simulator library.
//!
//! This crate implements a cycle-accurate model of the fetch and decode-execute front end
//! of a unified GPU shader core with the following:
//! 1. **Core:** The fetch box (thread slot pool, work admission, group scheduling, output
//!    drain) and the decode-execute box (hazard tracking, write ports, ALU and texture
//!    arbitration) connected by latency-aware signals.
//! 2. **ISA:** Register banks, opcodes with execution latencies and decoded instructions.
//! 3. **Emulator:** The functional emulator seam and a deterministic scripted emulator.
//! 4. **Simulation:** Texture unit and consumer models and a cycle driver.
//! 5. **Configuration and Statistics:** Serde-loaded configuration and counters.

/// Common types and constants (slot and group ids, limits, errors).
pub mod common;
/// Shader configuration (defaults, scheduling policy, validation).
pub mod config;
/// Shader core boxes (fetch, decode-execute, signals, protocol).
pub mod core;
/// Functional emulator trait and scripted implementation.
pub mod emulator;
/// Instruction model (banks, operands, opcodes, decoded instructions).
pub mod isa;
/// Simulation driver and external unit models.
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;

/// Fatal error type and result alias returned by every clock.
pub use crate::common::{SimError, SimResult};
/// Root configuration type; use `ShaderConfig::default()` or deserialize from JSON.
pub use crate::config::ShaderConfig;
/// Shader core; owns both boxes, their wires and the emulator.
pub use crate::core::ShaderCore;
/// Scripted functional emulator.
pub use crate::emulator::ScriptedEmulator;
/// Shader statistics counters.
pub use crate::stats::ShaderStats;

//! Shader core boxes.
//!
//! This module contains the two clocked boxes of the shader front end, the messages
//! they exchange, the latency-aware signals that carry those messages, and the core
//! that owns them side by side.

/// Decode-execute box (hazards, write ports, ALU and texture arbitration).
pub mod decode;

/// Fetch box (slot pool, admission, scheduling, group fetch, output drain).
pub mod fetch;

/// Messages exchanged between boxes and neighbours.
pub mod protocol;

/// Owner of both boxes, their wires and the emulator.
pub mod shader_core;

/// Latched, latency-aware ports.
pub mod signal;

/// Every signal of a shader core.
pub mod wires;

pub use self::shader_core::ShaderCore;

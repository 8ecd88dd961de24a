//! Common types shared by the fetch and decode-execute boxes.
//!
//! This module provides fundamental building blocks used across the shader core. It includes:
//! 1. **Index Types:** Strong types for thread slots and thread groups.
//! 2. **Constants:** Execution window, register bank and attribute limits.
//! 3. **Error Handling:** Fatal simulation errors and configuration errors.

/// Shader-wide constants.
pub mod constants;

/// Error types and the `SimResult` alias.
pub mod error;

/// Slot and group index types.
pub mod ids;

pub use error::{ConfigError, SimError, SimResult};
pub use ids::{GroupId, SlotId};

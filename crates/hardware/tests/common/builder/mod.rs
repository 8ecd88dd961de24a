//! Fluent builders used across the unit tests.

/// Shader configuration builder.
pub mod config;

/// Shader program and work item builders.
pub mod program;

//! Configuration system for the shader core.
//!
//! This module defines the configuration structures used to parameterize the fetch and
//! decode-execute boxes. It provides:
//! 1. **Defaults:** Baseline shader core dimensions (slots, groups, rates, latencies).
//! 2. **Structures:** Sectioned config for threads, fetch, output and texture arbitration.
//! 3. **Validation:** Every construction-time check the boxes rely on.
//!
//! Configuration is supplied as JSON (`ShaderConfig::from_json_str` / `from_json_path`) or
//! built with `ShaderConfig::default()`. Field names also accept the classic parameter names
//! (`ExecutableThreads`, `ThreadGroup`, `ThreadWindow`, ...).

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::common::ConfigError;
use crate::common::constants::MAX_ATTRIBUTES;

/// Default configuration constants for the shader core.
///
/// These values define the baseline core when a field is not present in the
/// JSON configuration.
mod defaults {
    /// Executable thread slots.
    pub const NUM_THREADS: u32 = 32;

    /// Extra slots used as input buffers for staged work.
    pub const INPUT_BUFFERS: u32 = 8;

    /// Resource units shared by all threads (registers per thread cost).
    pub const RESOURCES: u32 = 128;

    /// Threads fetched per cycle.
    pub const THREADS_PER_CYCLE: u32 = 4;

    /// Instructions fetched per thread per cycle.
    pub const INSTR_PER_CYCLE: u32 = 1;

    /// Threads per lock-step group.
    pub const THREAD_GROUP: u32 = 4;

    /// Cycles between two fetches of the same thread.
    pub const FETCH_DELAY: u64 = 0;

    /// Cycles without load activity before an open batch is force-closed.
    pub const BATCH_TIMEOUT: u64 = 1000;

    /// Instructions a thread may fetch before it is forced to end.
    pub const MAX_THREAD_INSTRUCTIONS: u32 = 65536;

    /// Work items received per cycle.
    pub const INPUTS_PER_CYCLE: u32 = 1;

    /// Finished threads transmitted per cycle.
    pub const OUTPUTS_PER_CYCLE: u32 = 1;

    /// Maximum latency of the output signal to the consumer.
    pub const OUTPUT_LATENCY: u64 = 20;

    /// Transmission cycles per active output attribute.
    pub const OUTPUT_TRANSMISSION_LATENCY: f64 = 1.0;

    /// Fixed delay added to every output transmission.
    pub const OUTPUT_DELAY: u64 = 1;

    /// Texture units attached to the core.
    pub const TEXTURE_UNITS: u32 = 1;

    /// Texture requests dispatched per cycle.
    pub const TEXTURE_REQUEST_RATE: u32 = 1;

    /// Consecutive requests sent to one texture unit before moving on.
    pub const TEXTURE_REQUEST_GROUP: u32 = 64;
}

/// Thread scheduling discipline selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SchedulerKind {
    /// In-order, double-buffered batches per partition.
    Batch,
    /// Out-of-order window over all ready groups.
    #[default]
    Window,
}

/// Root configuration of a shader core.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use shadersim_core::config::ShaderConfig;
///
/// let config = ShaderConfig::default();
/// assert_eq!(config.threads.num_threads, 32);
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing from JSON with classic parameter names:
///
/// ```
/// use shadersim_core::config::{SchedulerKind, ShaderConfig};
///
/// let json = r#"{
///     "threads": { "ExecutableThreads": 8, "InputBuffers": 4, "ThreadGroup": 2, "ThreadResources": 16 },
///     "fetch": { "ThreadWindow": false, "FetchDelay": 4, "ScalarALU": true, "FetchRate": 2 }
/// }"#;
///
/// let config = ShaderConfig::from_json_str(json).unwrap();
/// assert_eq!(config.threads.num_threads, 8);
/// assert_eq!(config.fetch.scheduler(), SchedulerKind::Batch);
/// assert!(config.fetch.scalar_alu);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShaderConfig {
    /// Thread table and partition model
    #[serde(default)]
    pub threads: ThreadConfig,
    /// Fetch and scheduling parameters
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Input and output transmission parameters
    #[serde(default)]
    pub output: OutputConfig,
    /// Texture unit arbitration
    #[serde(default)]
    pub texture: TextureConfig,
}

/// Thread table dimensions and partition model.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadConfig {
    /// Executable thread slots
    #[serde(default = "ThreadConfig::default_num_threads", alias = "ExecutableThreads")]
    pub num_threads: u32,

    /// Additional slots used to stage incoming work
    #[serde(default = "ThreadConfig::default_input_buffers", alias = "InputBuffers")]
    pub input_buffers: u32,

    /// Total resource units (registers) shared by all slots
    #[serde(default = "ThreadConfig::default_resources", alias = "ThreadResources")]
    pub resources: u32,

    /// Threads per lock-step group
    #[serde(default = "ThreadConfig::default_thread_group", alias = "ThreadGroup")]
    pub thread_group: u32,

    /// Vertex, fragment and triangle work share the core (three partitions)
    #[serde(default = "ThreadConfig::default_unified", alias = "Unified")]
    pub unified: bool,
}

impl ThreadConfig {
    fn default_num_threads() -> u32 {
        defaults::NUM_THREADS
    }

    fn default_input_buffers() -> u32 {
        defaults::INPUT_BUFFERS
    }

    fn default_resources() -> u32 {
        defaults::RESOURCES
    }

    fn default_thread_group() -> u32 {
        defaults::THREAD_GROUP
    }

    fn default_unified() -> bool {
        true
    }

    /// Total slots in the table: executable threads plus input buffers.
    #[inline]
    pub const fn total_slots(&self) -> u32 {
        self.num_threads + self.input_buffers
    }

    /// Number of thread groups covering the table.
    #[inline]
    pub const fn num_groups(&self) -> u32 {
        self.total_slots() / self.thread_group
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            num_threads: defaults::NUM_THREADS,
            input_buffers: defaults::INPUT_BUFFERS,
            resources: defaults::RESOURCES,
            thread_group: defaults::THREAD_GROUP,
            unified: true,
        }
    }
}

/// Fetch rates and scheduling behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Threads fetched per cycle
    #[serde(default = "FetchConfig::default_threads_per_cycle", alias = "ThreadRate")]
    pub threads_per_cycle: u32,

    /// Instructions fetched per thread per cycle
    #[serde(default = "FetchConfig::default_instr_per_cycle", alias = "FetchRate")]
    pub instr_per_cycle: u32,

    /// Fetch whole groups in lock step
    #[serde(default = "FetchConfig::default_lock_step", alias = "LockedExecutionMode")]
    pub lock_step: bool,

    /// One SIMD plus one scalar instruction per thread-cycle (requires two instructions per cycle)
    #[serde(default, alias = "ScalarALU")]
    pub scalar_alu: bool,

    /// Out-of-order window scheduling instead of in-order batches
    #[serde(default = "FetchConfig::default_thread_window", alias = "ThreadWindow")]
    pub thread_window: bool,

    /// Cycles between two fetches of the same thread
    #[serde(default = "FetchConfig::default_fetch_delay", alias = "FetchDelay")]
    pub fetch_delay: u64,

    /// Keep fetching the head group of the window until it blocks
    #[serde(default, alias = "SwapOnBlock")]
    pub swap_on_block: bool,

    /// Cycles without load activity before an open batch is closed
    #[serde(default = "FetchConfig::default_batch_timeout", alias = "BatchTimeout")]
    pub batch_timeout: u64,

    /// Instructions a thread may fetch before it is forced to end
    #[serde(default = "FetchConfig::default_max_thread_instructions", alias = "MaxThreadInstructions")]
    pub max_thread_instructions: u32,
}

impl FetchConfig {
    fn default_threads_per_cycle() -> u32 {
        defaults::THREADS_PER_CYCLE
    }

    fn default_instr_per_cycle() -> u32 {
        defaults::INSTR_PER_CYCLE
    }

    fn default_lock_step() -> bool {
        true
    }

    fn default_thread_window() -> bool {
        true
    }

    fn default_fetch_delay() -> u64 {
        defaults::FETCH_DELAY
    }

    fn default_batch_timeout() -> u64 {
        defaults::BATCH_TIMEOUT
    }

    fn default_max_thread_instructions() -> u32 {
        defaults::MAX_THREAD_INSTRUCTIONS
    }

    /// Scheduling discipline implied by `thread_window`.
    #[inline]
    pub const fn scheduler(&self) -> SchedulerKind {
        if self.thread_window { SchedulerKind::Window } else { SchedulerKind::Batch }
    }

    /// Selects the scheduling discipline.
    pub const fn set_scheduler(&mut self, kind: SchedulerKind) {
        self.thread_window = matches!(kind, SchedulerKind::Window);
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            threads_per_cycle: defaults::THREADS_PER_CYCLE,
            instr_per_cycle: defaults::INSTR_PER_CYCLE,
            lock_step: true,
            scalar_alu: false,
            thread_window: true,
            fetch_delay: defaults::FETCH_DELAY,
            swap_on_block: false,
            batch_timeout: defaults::BATCH_TIMEOUT,
            max_thread_instructions: defaults::MAX_THREAD_INSTRUCTIONS,
        }
    }
}

/// Input admission and output transmission.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Work items received per cycle
    #[serde(default = "OutputConfig::default_inputs_per_cycle", alias = "InputsPerCycle")]
    pub inputs_per_cycle: u32,

    /// Finished threads transmitted per cycle
    #[serde(default = "OutputConfig::default_outputs_per_cycle", alias = "OutputsPerCycle")]
    pub outputs_per_cycle: u32,

    /// Maximum latency of the output signal
    #[serde(default = "OutputConfig::default_output_latency", alias = "OutputLatency")]
    pub output_latency: u64,

    /// Transmission cycles per active output attribute
    #[serde(default = "OutputConfig::default_transmission_latency")]
    pub output_transmission_latency: f64,

    /// Fixed delay added to each transmission
    #[serde(default = "OutputConfig::default_output_delay")]
    pub output_delay: u64,
}

impl OutputConfig {
    fn default_inputs_per_cycle() -> u32 {
        defaults::INPUTS_PER_CYCLE
    }

    fn default_outputs_per_cycle() -> u32 {
        defaults::OUTPUTS_PER_CYCLE
    }

    fn default_output_latency() -> u64 {
        defaults::OUTPUT_LATENCY
    }

    fn default_transmission_latency() -> f64 {
        defaults::OUTPUT_TRANSMISSION_LATENCY
    }

    fn default_output_delay() -> u64 {
        defaults::OUTPUT_DELAY
    }

    /// Output signal latency needed to transmit a thread with every attribute active.
    pub fn worst_output_cycles(&self) -> u64 {
        let trans = (MAX_ATTRIBUTES as f64 * self.output_transmission_latency).ceil() as u64;
        trans.saturating_add(self.output_delay).max(1)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            inputs_per_cycle: defaults::INPUTS_PER_CYCLE,
            outputs_per_cycle: defaults::OUTPUTS_PER_CYCLE,
            output_latency: defaults::OUTPUT_LATENCY,
            output_transmission_latency: defaults::OUTPUT_TRANSMISSION_LATENCY,
            output_delay: defaults::OUTPUT_DELAY,
        }
    }
}

/// Texture unit arbitration in the decode box.
#[derive(Debug, Clone, Deserialize)]
pub struct TextureConfig {
    /// Texture units attached to the core (0 disables texture requests)
    #[serde(default = "TextureConfig::default_units", alias = "TextureUnits")]
    pub units: u32,

    /// Texture requests dispatched per cycle
    #[serde(default = "TextureConfig::default_request_rate", alias = "TextureRequestRate")]
    pub request_rate: u32,

    /// Consecutive requests sent to one unit before moving to the next
    #[serde(default = "TextureConfig::default_requests_per_unit", alias = "TextureRequestGroup")]
    pub requests_per_unit: u32,
}

impl TextureConfig {
    fn default_units() -> u32 {
        defaults::TEXTURE_UNITS
    }

    fn default_request_rate() -> u32 {
        defaults::TEXTURE_REQUEST_RATE
    }

    fn default_requests_per_unit() -> u32 {
        defaults::TEXTURE_REQUEST_GROUP
    }
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            units: defaults::TEXTURE_UNITS,
            request_rate: defaults::TEXTURE_REQUEST_RATE,
            requests_per_unit: defaults::TEXTURE_REQUEST_GROUP,
        }
    }
}

impl ShaderConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read and `ConfigError::Parse`
    /// if its content is not a valid configuration.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Checks every parameter combination the shader boxes depend on.
    ///
    /// Batch scheduling with a zero fetch delay is legal but lets small batches drift
    /// apart on dependences; it only emits a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.threads;
        let f = &self.fetch;
        let o = &self.output;
        let x = &self.texture;

        let checks: [(bool, &str); 15] = [
            (t.thread_group == 0, "at least one thread required per thread group"),
            (t.num_threads < t.thread_group, "at least one group of threads required"),
            (t.input_buffers < t.thread_group, "at least one group of input buffers required"),
            (t.resources < t.num_threads, "at least one resource per thread required"),
            (
                t.thread_group != 0 && t.total_slots() % t.thread_group != 0,
                "threads plus input buffers must be a multiple of the thread group",
            ),
            (f.threads_per_cycle == 0, "at least one thread must be fetched per cycle"),
            (f.instr_per_cycle == 0, "at least one instruction per thread must be fetched per cycle"),
            (f.scalar_alu && f.instr_per_cycle != 2, "scalar ALU mode requires two instructions per cycle"),
            (o.inputs_per_cycle == 0, "at least one input must be received per cycle"),
            (o.outputs_per_cycle == 0, "at least one output must be sent per cycle"),
            (o.output_latency == 0, "output latency must be at least one cycle"),
            (
                !(o.output_transmission_latency.is_finite() && o.output_transmission_latency >= 0.0),
                "output transmission latency must be a non-negative number",
            ),
            (
                o.worst_output_cycles() > o.output_latency,
                "output latency must cover the transmission of every output attribute",
            ),
            (x.units > 0 && x.request_rate == 0, "texture request rate must be at least one"),
            (x.units > 0 && x.requests_per_unit == 0, "texture request group must be at least one"),
        ];

        if let Some((_, reason)) = checks.iter().find(|(failed, _)| *failed) {
            return Err(ConfigError::Invalid((*reason).to_string()));
        }

        if !f.thread_window && f.fetch_delay == 0 {
            warn!(
                "batch scheduling with zero fetch delay: small batches may desynchronize on dependences"
            );
        }

        Ok(())
    }
}

//! Signals connecting the shader boxes to each other and to their neighbours.
//!
//! Every port between two boxes is a `Signal` owned here, so neither box holds a
//! reference to the other. It provides:
//! 1. **Producer Side:** Work items and command processor commands into fetch.
//! 2. **Fetch to Decode:** Fetched instructions and the decode box command port.
//! 3. **Decode to Fetch:** Control commands and the decode state.
//! 4. **Consumer Side:** Outputs, the consumer state and the published shader state.
//! 5. **Texture Units:** Per-unit request, result and ticket ports.

use crate::common::constants::{MAX_EXEC_BW, STAMP_FRAGMENTS};
use crate::config::ShaderConfig;
use crate::core::protocol::{
    ConsumerState, ControlCommand, DecodeCommand, DecodeState, FetchedInstruction, ShaderCommand, ShaderOutput,
    ShaderState, ShaderWork, TextureAccess, TextureResult, TextureTickets,
};
use crate::core::signal::Signal;

/// Latency of every fixed-latency port.
pub const WIRE_LATENCY: u64 = 1;

/// Command processor ports: vertex (or primary) and fragment.
pub const COMMAND_PORTS: usize = 2;

/// Signals of one texture unit.
#[derive(Debug, Clone)]
pub struct TexturePorts {
    /// Requests from decode to the unit.
    pub requests: Signal<TextureAccess>,
    /// Completed accesses from the unit to decode.
    pub results: Signal<TextureResult>,
    /// Ticket grants from the unit to decode.
    pub tickets: Signal<TextureTickets>,
}

/// Every signal of a shader core.
#[derive(Debug, Clone)]
pub struct Wires {
    /// Work items from the producer.
    pub work: Signal<ShaderWork>,
    /// Command processor commands, one port per partition.
    pub commands: [Signal<ShaderCommand>; COMMAND_PORTS],
    /// Commands for the decode box.
    pub decode_commands: Signal<DecodeCommand>,
    /// Fetched instructions.
    pub instructions: Signal<FetchedInstruction>,
    /// Decode to fetch control commands.
    pub control: Signal<ControlCommand>,
    /// Decode state, read every cycle by fetch.
    pub decode_state: Signal<DecodeState>,
    /// Back-pressure state published to the producer.
    pub shader_state: Signal<ShaderState>,
    /// Consumer state, read every cycle by fetch.
    pub consumer_state: Signal<ConsumerState>,
    /// Shaded outputs to the consumer.
    pub output: Signal<ShaderOutput>,
    /// Texture unit ports.
    pub texture: Vec<TexturePorts>,
}

impl Wires {
    /// Builds every signal with the bandwidths the configuration implies.
    pub fn new(config: &ShaderConfig) -> Self {
        let lanes = (config.fetch.threads_per_cycle * config.fetch.instr_per_cycle) as usize;
        let units = config.texture.units as usize;
        let request_rate = config.texture.request_rate.max(1) as usize;
        // Completions may each send END and ZEXPORT, every decoded instruction one
        // more command, and every texture result an UNBLOCK and END per stamp thread.
        let control_bw = 2 * MAX_EXEC_BW as usize * lanes + lanes + units * request_rate * 2 * STAMP_FRAGMENTS;

        Self {
            work: Signal::new("shader input", config.output.inputs_per_cycle as usize, WIRE_LATENCY),
            commands: [
                Signal::new("vertex command", 1, WIRE_LATENCY),
                Signal::new("fragment command", 1, WIRE_LATENCY),
            ],
            decode_commands: Signal::new("decode command", 1, WIRE_LATENCY),
            instructions: Signal::new("instruction", lanes, WIRE_LATENCY),
            control: Signal::new("decode control", control_bw, WIRE_LATENCY),
            decode_state: Signal::new("decode state", 1, WIRE_LATENCY).with_default(DecodeState::Ready),
            shader_state: Signal::new("shader state", 1, WIRE_LATENCY),
            consumer_state: Signal::new("consumer state", 1, WIRE_LATENCY).with_default(ConsumerState::Ready),
            output: Signal::new("shader output", config.output.outputs_per_cycle as usize, WIRE_LATENCY)
                .with_max_latency(config.output.output_latency),
            texture: (0..units)
                .map(|_| TexturePorts {
                    requests: Signal::new("texture request", request_rate, WIRE_LATENCY),
                    results: Signal::new("texture result", request_rate, WIRE_LATENCY),
                    tickets: Signal::new("texture tickets", 1, WIRE_LATENCY),
                })
                .collect(),
        }
    }
}

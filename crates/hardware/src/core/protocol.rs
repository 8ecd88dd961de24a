//! Messages exchanged between the shader boxes and their neighbours.
//!
//! Every value here is owned and moved through a `Signal`; the receiver drops it
//! when consumed. It provides:
//! 1. **Partitions and Input Modes:** How work items map onto the shader partitions.
//! 2. **Work and Output:** Items entering the fetch box and results leaving it.
//! 3. **Commands:** Command processor commands, decode box commands and the
//!    decode→fetch control protocol.
//! 4. **State Signals:** Back-pressure states published by each box.
//! 5. **Texture Traffic:** Requests, results and unit state for the texture units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::SlotId;
use crate::common::constants::{MICRO_FRAGMENT_INPUT_ATTRIBUTES, STAMP_FRAGMENTS, STANDARD_INPUT_ATTRIBUTES};
use crate::isa::DecodedInstruction;

/// A four-component shader register value.
pub type Vec4 = [f32; 4];

/// Shader partition a thread belongs to.
///
/// In unified mode the thread table is shared by the vertex, fragment and
/// triangle setup partitions; otherwise every thread runs in `Primary`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    /// Vertex shading.
    Vertex,
    /// Fragment shading.
    Fragment,
    /// Triangle setup.
    Triangle,
    /// The single partition of a non-unified shader.
    Primary,
}

impl Partition {
    /// Partitions of a unified shader, in table order.
    pub const UNIFIED: [Self; 3] = [Self::Vertex, Self::Fragment, Self::Triangle];

    /// Number of partition table entries.
    pub const COUNT: usize = 3;

    /// Index into per-partition tables. `Primary` shares entry 0 with `Vertex`.
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Self::Vertex | Self::Primary => 0,
            Self::Fragment => 1,
            Self::Triangle => 2,
        }
    }

    /// Lower-case partition name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Triangle => "triangle",
            Self::Primary => "primary",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of input a work item carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    /// Vertex attributes.
    Vertex,
    /// Triangle setup input.
    Triangle,
    /// Fragment attributes.
    Fragment,
    /// Micro-triangle fragment with three vertex attribute sets.
    MicroFragment,
}

impl InputMode {
    /// Partition that shades this kind of input.
    pub const fn partition(self, unified: bool) -> Partition {
        if !unified {
            return Partition::Primary;
        }
        match self {
            Self::Vertex => Partition::Vertex,
            Self::Triangle => Partition::Triangle,
            Self::Fragment | Self::MicroFragment => Partition::Fragment,
        }
    }

    /// Input bank registers loaded when the item is admitted.
    pub const fn input_registers(self) -> usize {
        match self {
            Self::MicroFragment => MICRO_FRAGMENT_INPUT_ATTRIBUTES,
            Self::Vertex | Self::Triangle | Self::Fragment => STANDARD_INPUT_ATTRIBUTES,
        }
    }
}

/// A work item delivered by the producer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShaderWork {
    /// Producer-assigned identifier, returned with the output.
    pub id: u64,
    /// Input kind.
    pub mode: InputMode,
    /// Input attributes; missing registers load as zero.
    pub attributes: Vec<Vec4>,
    /// Last item of the current draw. Closes the open batch.
    pub last: bool,
}

impl ShaderWork {
    /// Creates a work item with no attributes.
    pub const fn new(id: u64, mode: InputMode) -> Self {
        Self { id, mode, attributes: Vec::new(), last: false }
    }

    /// Marks the item as the last of its draw.
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.last = true;
        self
    }

    /// Sets the input attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Vec4>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Shaded result delivered to the consumer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShaderOutput {
    /// Identifier of the work item.
    pub id: u64,
    /// Input kind of the work item.
    pub mode: InputMode,
    /// Output bank contents.
    pub attributes: Vec<Vec4>,
    /// The thread executed a kill that took effect.
    pub killed: bool,
    /// Slot that shaded the item.
    pub slot: SlotId,
}

/// Command processor commands.
///
/// Each command arrives on a partition port: the vertex and fragment ports in
/// unified mode, the primary port otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderCommand {
    /// Loads a program into instruction memory at `pc`.
    LoadProgram {
        /// Program instructions.
        code: Vec<DecodedInstruction>,
        /// Load address.
        pc: u32,
    },
    /// Writes consecutive constant (parameter) registers of the port's partition.
    ParamWrite {
        /// First register.
        first: u32,
        /// Values to write.
        values: Vec<Vec4>,
    },
    /// Sets the entry PC of a partition.
    SetInitPc {
        /// Partition to update.
        target: Partition,
        /// New entry PC.
        pc: u32,
    },
    /// Sets the per-thread resource cost of a partition.
    SetThreadResources {
        /// Partition to update.
        target: Partition,
        /// Resource units per thread.
        count: u32,
    },
    /// Enables or disables an input attribute of the port's partition.
    SetInputAttribute {
        /// Attribute index.
        attr: u32,
        /// New state.
        active: bool,
    },
    /// Enables or disables an output attribute of the port's partition.
    SetOutputAttribute {
        /// Attribute index.
        attr: u32,
        /// New state.
        active: bool,
    },
    /// Enables multisampling.
    SetMultisampling(bool),
    /// Sets the MSAA sample count.
    SetMsaaSamples(u32),
}

impl ShaderCommand {
    /// Command name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoadProgram { .. } => "LOAD_PROGRAM",
            Self::ParamWrite { .. } => "PARAM_WRITE",
            Self::SetInitPc { .. } => "SET_INIT_PC",
            Self::SetThreadResources { .. } => "SET_THREAD_RES",
            Self::SetInputAttribute { .. } => "SET_IN_ATTR",
            Self::SetOutputAttribute { .. } => "SET_OUT_ATTR",
            Self::SetMultisampling(_) => "SET_MULTISAMPLING",
            Self::SetMsaaSamples(_) => "SET_MSAA_SAMPLES",
        }
    }
}

/// Commands for the decode-execute box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeCommand {
    /// Clears all per-thread decode state on the next clock.
    Reset,
}

/// Decode→fetch control commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// The thread may be fetched again.
    Unblock {
        /// Target slot.
        slot: SlotId,
        /// PC carried with the command.
        pc: u32,
    },
    /// The thread must stop fetching; fetch resumes at `pc + 1`.
    Block {
        /// Target slot.
        slot: SlotId,
        /// PC of the blocking instruction.
        pc: u32,
    },
    /// The thread finished executing.
    End {
        /// Target slot.
        slot: SlotId,
        /// PC carried with the command.
        pc: u32,
    },
    /// Refetch the instruction at `pc`.
    RepeatLast {
        /// First slot to replay.
        slot: SlotId,
        /// PC of the replayed instruction.
        pc: u32,
    },
    /// Continue fetching at `pc`.
    NewPc {
        /// Target slot.
        slot: SlotId,
        /// New PC.
        pc: u32,
    },
    /// The thread exported its depth value.
    ZExport {
        /// Target slot.
        slot: SlotId,
        /// PC carried with the command.
        pc: u32,
    },
}

impl ControlCommand {
    /// Target slot.
    pub const fn slot(self) -> SlotId {
        match self {
            Self::Unblock { slot, .. }
            | Self::Block { slot, .. }
            | Self::End { slot, .. }
            | Self::RepeatLast { slot, .. }
            | Self::NewPc { slot, .. }
            | Self::ZExport { slot, .. } => slot,
        }
    }

    /// PC carried with the command.
    pub const fn pc(self) -> u32 {
        match self {
            Self::Unblock { pc, .. }
            | Self::Block { pc, .. }
            | Self::End { pc, .. }
            | Self::RepeatLast { pc, .. }
            | Self::NewPc { pc, .. }
            | Self::ZExport { pc, .. } => pc,
        }
    }

    /// Command name for logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unblock { .. } => "UNBLOCK",
            Self::Block { .. } => "BLOCK",
            Self::End { .. } => "END",
            Self::RepeatLast { .. } => "REPEAT_LAST",
            Self::NewPc { .. } => "NEW_PC",
            Self::ZExport { .. } => "ZEXPORT",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} pc={}", self.name(), self.slot(), self.pc())
    }
}

/// Back-pressure state the fetch box publishes to the producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShaderState {
    /// Every slot is free.
    Empty,
    /// New work may be sent.
    Ready,
    /// No new work may be sent.
    Busy,
}

/// State the decode box publishes to the fetch box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeState {
    /// At least two instruction buffer entries are free.
    Ready,
    /// Fetch must stall.
    Busy,
}

/// State the consumer publishes to the fetch box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    /// Outputs may be transmitted.
    Ready,
    /// Output transmission must wait.
    Busy,
}

/// An instruction sent from fetch to decode.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedInstruction {
    /// Executing slot.
    pub slot: SlotId,
    /// PC of the instruction.
    pub pc: u32,
    /// Partition of the thread.
    pub partition: Partition,
    /// Decoded instruction.
    pub instr: DecodedInstruction,
    /// First fetch after a `RepeatLast` replay.
    pub repeated: bool,
    /// Placeholder for an issue slot the scalar ALU mode could not fill.
    pub fake: bool,
}

/// A texture access formed by a full fragment stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureAccess {
    /// Emulator-assigned identifier.
    pub id: u64,
    /// Threads of the stamp, unblocked when the access completes.
    pub threads: [SlotId; STAMP_FRAGMENTS],
    /// Cycle the request left the decode box.
    pub cycle: u64,
}

/// Completion of a texture access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureResult {
    /// Identifier of the completed access.
    pub access_id: u64,
}

/// Ticket grant published by a texture unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureTickets;

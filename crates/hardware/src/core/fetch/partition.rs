//! Per-partition program state.
//!
//! The command processor configures each shader partition independently. This module
//! provides:
//! 1. **Entry Points:** Initial PC per partition.
//! 2. **Resource Cost:** Per-thread resource units, `max(inputs, resources, outputs)`.
//! 3. **Attribute Tables:** Active input and output attribute flags and counts.
//! 4. **Back-pressure Bound:** The maximum cost over all partitions.

use crate::common::constants::{INITIAL_MAX_THREAD_RESOURCES, MAX_ATTRIBUTES, TRIANGLE_SETUP_PROGRAM_PC};
use crate::common::{SimError, SimResult};
use crate::core::protocol::Partition;

/// Attribute flags for one partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct AttributeSet {
    active: [bool; MAX_ATTRIBUTES],
    count: u32,
}

impl AttributeSet {
    fn with_first(n: usize) -> Self {
        let mut set = Self::default();
        for flag in set.active.iter_mut().take(n) {
            *flag = true;
        }
        set.count = n as u32;
        set
    }

    /// Toggles an attribute; the count only moves on a state change.
    fn set(&mut self, attr: u32, active: bool) -> SimResult<()> {
        let flag = self
            .active
            .get_mut(attr as usize)
            .ok_or_else(|| SimError::InvalidShaderCommand(format!("attribute {attr} out of range")))?;
        if *flag != active {
            *flag = active;
            if active {
                self.count += 1;
            } else {
                self.count -= 1;
            }
        }
        Ok(())
    }
}

/// Program state of every partition.
#[derive(Clone, Debug)]
pub struct PartitionTable {
    unified: bool,
    init_pc: [u32; Partition::COUNT],
    thread_resources: [u32; Partition::COUNT],
    inputs: [AttributeSet; Partition::COUNT],
    outputs: [AttributeSet; Partition::COUNT],
    max_thread_resources: u32,
    multisampling: bool,
    msaa_samples: u32,
}

impl PartitionTable {
    /// Creates the power-on table.
    ///
    /// Fragment programs export one output and triangle setup four. In unified mode
    /// triangle setup also reads three fixed inputs, costs two resource units and
    /// starts at its fixed entry point.
    pub fn new(unified: bool) -> Self {
        let mut inputs = [AttributeSet::default(); Partition::COUNT];
        let mut outputs = [AttributeSet::default(); Partition::COUNT];
        outputs[Partition::Fragment.index()] = AttributeSet::with_first(1);
        outputs[Partition::Triangle.index()] = AttributeSet::with_first(4);

        let mut init_pc = [0; Partition::COUNT];
        let mut thread_resources = [1; Partition::COUNT];
        if unified {
            init_pc[Partition::Triangle.index()] = TRIANGLE_SETUP_PROGRAM_PC;
            thread_resources[Partition::Triangle.index()] = 2;
            inputs[Partition::Triangle.index()].count = 3;
        }

        Self {
            unified,
            init_pc,
            thread_resources,
            inputs,
            outputs,
            max_thread_resources: INITIAL_MAX_THREAD_RESOURCES,
            multisampling: false,
            msaa_samples: 4,
        }
    }

    /// Non-unified tables keep everything in the primary entry.
    const fn resolve(&self, target: Partition) -> Partition {
        if self.unified { target } else { Partition::Primary }
    }

    /// Entry PC of a partition.
    #[inline]
    pub const fn init_pc(&self, partition: Partition) -> u32 {
        self.init_pc[self.resolve(partition).index()]
    }

    /// Sets the entry PC of a partition.
    pub const fn set_init_pc(&mut self, target: Partition, pc: u32) {
        self.init_pc[self.resolve(target).index()] = pc;
    }

    /// Resource units per thread requested by the program.
    #[inline]
    pub const fn thread_resources(&self, partition: Partition) -> u32 {
        self.thread_resources[self.resolve(partition).index()]
    }

    /// Sets the per-thread resource request of a partition.
    pub fn set_thread_resources(&mut self, target: Partition, count: u32) {
        self.thread_resources[self.resolve(target).index()] = count;
        self.recompute();
    }

    /// Active input attributes of a partition.
    #[inline]
    pub const fn active_inputs(&self, partition: Partition) -> u32 {
        self.inputs[self.resolve(partition).index()].count
    }

    /// Active output attributes of a partition.
    #[inline]
    pub const fn active_outputs(&self, partition: Partition) -> u32 {
        self.outputs[self.resolve(partition).index()].count
    }

    /// Toggles an input attribute.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidShaderCommand` if `attr` is not below the attribute limit.
    pub fn set_input(&mut self, partition: Partition, attr: u32, active: bool) -> SimResult<()> {
        self.inputs[self.resolve(partition).index()].set(attr, active)?;
        self.recompute();
        Ok(())
    }

    /// Toggles an output attribute.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidShaderCommand` if `attr` is not below the attribute limit.
    pub fn set_output(&mut self, partition: Partition, attr: u32, active: bool) -> SimResult<()> {
        self.outputs[self.resolve(partition).index()].set(attr, active)?;
        self.recompute();
        Ok(())
    }

    /// Resource units a thread of `partition` holds while resident.
    #[inline]
    pub fn cost(&self, partition: Partition) -> u32 {
        self.active_inputs(partition)
            .max(self.thread_resources(partition))
            .max(self.active_outputs(partition))
    }

    /// Largest per-thread cost, used for the back-pressure threshold.
    #[inline]
    pub const fn max_thread_resources(&self) -> u32 {
        self.max_thread_resources
    }

    /// Output transmission cycles for a thread of `partition`.
    pub fn transmission_cycles(&self, partition: Partition, cycles_per_output: f64) -> u64 {
        (f64::from(self.active_outputs(partition)) * cycles_per_output).ceil() as u64
    }

    /// Multisampling enable.
    pub const fn multisampling(&self) -> bool {
        self.multisampling
    }

    /// Sets the multisampling enable.
    pub const fn set_multisampling(&mut self, enable: bool) {
        self.multisampling = enable;
    }

    /// MSAA sample count.
    pub const fn msaa_samples(&self) -> u32 {
        self.msaa_samples
    }

    /// Sets the MSAA sample count.
    pub const fn set_msaa_samples(&mut self, samples: u32) {
        self.msaa_samples = samples;
    }

    fn recompute(&mut self) {
        self.max_thread_resources = if self.unified {
            self.thread_resources
                .iter()
                .chain(self.inputs.iter().map(|s| &s.count))
                .chain(self.outputs.iter().map(|s| &s.count))
                .copied()
                .fold(1, u32::max)
        } else {
            let p = Partition::Primary;
            self.thread_resources(p).max(self.active_inputs(p)).max(self.active_outputs(p).max(1))
        };
    }
}

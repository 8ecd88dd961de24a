//! Finished-thread output drain.
//!
//! Finished threads wait in FIFO order until the consumer accepts them. A transmission
//! sends up to the output rate of threads at once and may occupy the output port for
//! several cycles, after which the transmitted slots are reloaded.

use std::collections::VecDeque;

use crate::common::SlotId;

/// Output drain state.
#[derive(Clone, Debug, Default)]
pub struct OutputDrain {
    finished: VecDeque<SlotId>,
    in_progress: bool,
    remaining: u64,
    current: usize,
}

impl OutputDrain {
    /// Creates an idle drain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends finished threads in order.
    pub fn push_finished(&mut self, slots: impl IntoIterator<Item = SlotId>) {
        self.finished.extend(slots);
    }

    /// Finished threads not yet reloaded, including those being transmitted.
    #[inline]
    pub fn finished(&self) -> u32 {
        self.finished.len() as u32
    }

    /// Returns true while a multi-cycle transmission occupies the port.
    #[inline]
    pub const fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Counts down an in-progress transmission.
    ///
    /// Returns the transmitted slots once the last cycle elapses, otherwise nothing.
    pub fn countdown(&mut self) -> Vec<SlotId> {
        if !self.in_progress {
            return Vec::new();
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return Vec::new();
        }
        self.in_progress = false;
        self.take_current()
    }

    /// Returns true if a transmission should start: a full output batch is waiting, or
    /// every thread that is not finished is free.
    pub fn should_transmit(&self, outputs_per_cycle: u32, free: u32, total: u32) -> bool {
        let finished = self.finished();
        finished >= outputs_per_cycle || (finished > 0 && free == total - finished)
    }

    /// Oldest finished threads to transmit this cycle.
    pub fn candidates(&self, outputs_per_cycle: u32) -> Vec<SlotId> {
        self.finished.iter().take(outputs_per_cycle as usize).copied().collect()
    }

    /// Records a transmission of `count` threads lasting `trans_cycles`.
    ///
    /// Returns the slots to reload at once for single-cycle transmissions.
    pub fn start(&mut self, count: usize, trans_cycles: u64) -> Vec<SlotId> {
        self.current = count;
        if trans_cycles > 1 {
            self.in_progress = true;
            self.remaining = trans_cycles - 1;
            Vec::new()
        } else {
            self.take_current()
        }
    }

    fn take_current(&mut self) -> Vec<SlotId> {
        let n = self.current.min(self.finished.len());
        self.current = 0;
        self.finished.drain(..n).collect()
    }
}

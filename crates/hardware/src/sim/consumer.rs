//! Output sink with back-pressure.

use crate::core::protocol::{ConsumerState, ShaderOutput};

/// Collects shaded outputs and decides when the core may transmit.
#[derive(Clone, Debug)]
pub struct OutputConsumer {
    accept_period: u64,
    received: Vec<ShaderOutput>,
}

impl OutputConsumer {
    /// Creates a consumer that is ready one cycle in every `accept_period` (at least one).
    pub fn new(accept_period: u64) -> Self {
        Self { accept_period: accept_period.max(1), received: Vec::new() }
    }

    /// State to publish at `cycle`.
    pub const fn state(&self, cycle: u64) -> ConsumerState {
        if cycle.is_multiple_of(self.accept_period) { ConsumerState::Ready } else { ConsumerState::Busy }
    }

    /// Stores delivered outputs.
    pub fn accept(&mut self, outputs: impl IntoIterator<Item = ShaderOutput>) {
        self.received.extend(outputs);
    }

    /// Outputs received so far, in delivery order.
    pub fn received(&self) -> &[ShaderOutput] {
        &self.received
    }

    /// Outputs of killed threads.
    pub fn killed(&self) -> usize {
        self.received.iter().filter(|o| o.killed).count()
    }
}

impl Default for OutputConsumer {
    fn default() -> Self {
        Self::new(1)
    }
}

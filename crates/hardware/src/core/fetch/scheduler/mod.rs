//! Thread group scheduling policies.
//!
//! The fetch box asks its scheduler which fully ready group to fetch next. This module
//! provides:
//! 1. **Policy Interface:** `SchedulingPolicy`, the hooks the fetch box calls as groups
//!    become ready, are fetched, and finish.
//! 2. **Batch Policy:** In-order, double-buffered batches per partition.
//! 3. **Window Policy:** Out-of-order circular queue of ready groups.
//! 4. **Dispatch:** `Scheduler`, an enum chosen once at construction.

/// In-order batch scheduling.
pub mod batch;

/// Out-of-order window scheduling.
pub mod window;

use std::collections::VecDeque;

pub use batch::BatchScheduler;
pub use window::{GroupPlace, WindowScheduler};

use super::pool::ThreadSlotPool;
use crate::common::{GroupId, SimError, SimResult, SlotId};
use crate::config::{SchedulerKind, ShaderConfig};

/// Hooks the fetch box calls on its group scheduler.
///
/// Implementations own only group order; slot state lives in the `ThreadSlotPool`
/// passed to each call.
pub trait SchedulingPolicy {
    /// A group became fully ready after admission.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the group cannot be queued.
    fn on_activated(&mut self, group: GroupId, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()>;

    /// A group became fully ready after an unblock.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the group cannot be queued.
    fn on_unblocked(&mut self, group: GroupId) -> SimResult<()>;

    /// Returns true if a selection may succeed this cycle.
    fn has_candidates(&self) -> bool;

    /// Picks the next group to fetch, or `None` to stop fetching this cycle.
    ///
    /// # Errors
    ///
    /// Returns `SimError::FetchDelay` or `SimError::BatchPcMismatch` on a broken
    /// scheduling invariant.
    fn select(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<Option<GroupId>>;

    /// Every member of the selected group was sent to decode.
    ///
    /// # Errors
    ///
    /// Returns `SimError::QueueOverflow` if the group cannot be tracked.
    fn group_sent(&mut self, group: GroupId) -> SimResult<()>;

    /// Moves groups whose fetch delay elapsed back into consideration.
    ///
    /// # Errors
    ///
    /// Returns `SimError::QueueOverflow` if the ready queue is full.
    fn process_fetched(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()>;

    /// A thread ended. Returns the slots that may now be drained.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    fn thread_finished(&mut self, slot: SlotId, pool: &ThreadSlotPool) -> SimResult<Vec<SlotId>>;

    /// The fetch box published BUSY to its producer.
    fn backpressure(&mut self);
}

/// Scheduler selected at construction.
#[derive(Clone, Debug)]
pub enum Scheduler {
    /// In-order batches.
    Batch(BatchScheduler),
    /// Out-of-order window.
    Window(WindowScheduler),
}

impl Scheduler {
    /// Builds the scheduler named by `config.fetch`.
    pub fn from_config(config: &ShaderConfig) -> Self {
        let groups = config.threads.num_groups();
        match config.fetch.scheduler() {
            SchedulerKind::Batch => Self::Batch(BatchScheduler::new(
                groups,
                config.threads.thread_group,
                config.fetch.batch_timeout,
            )),
            SchedulerKind::Window => Self::Window(WindowScheduler::new(
                groups,
                config.threads.thread_group,
                config.fetch.swap_on_block,
            )),
        }
    }

    /// Kind of the active policy.
    pub const fn kind(&self) -> SchedulerKind {
        match self {
            Self::Batch(_) => SchedulerKind::Batch,
            Self::Window(_) => SchedulerKind::Window,
        }
    }
}

impl SchedulingPolicy for Scheduler {
    fn on_activated(&mut self, group: GroupId, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()> {
        match self {
            Self::Batch(s) => s.on_activated(group, pool, cycle),
            Self::Window(s) => s.on_activated(group, pool, cycle),
        }
    }

    fn on_unblocked(&mut self, group: GroupId) -> SimResult<()> {
        match self {
            Self::Batch(s) => s.on_unblocked(group),
            Self::Window(s) => s.on_unblocked(group),
        }
    }

    fn has_candidates(&self) -> bool {
        match self {
            Self::Batch(s) => s.has_candidates(),
            Self::Window(s) => s.has_candidates(),
        }
    }

    fn select(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<Option<GroupId>> {
        match self {
            Self::Batch(s) => s.select(pool, cycle),
            Self::Window(s) => s.select(pool, cycle),
        }
    }

    fn group_sent(&mut self, group: GroupId) -> SimResult<()> {
        match self {
            Self::Batch(s) => s.group_sent(group),
            Self::Window(s) => s.group_sent(group),
        }
    }

    fn process_fetched(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()> {
        match self {
            Self::Batch(s) => s.process_fetched(pool, cycle),
            Self::Window(s) => s.process_fetched(pool, cycle),
        }
    }

    fn thread_finished(&mut self, slot: SlotId, pool: &ThreadSlotPool) -> SimResult<Vec<SlotId>> {
        match self {
            Self::Batch(s) => s.thread_finished(slot, pool),
            Self::Window(s) => s.thread_finished(slot, pool),
        }
    }

    fn backpressure(&mut self) {
        match self {
            Self::Batch(s) => s.backpressure(),
            Self::Window(s) => s.backpressure(),
        }
    }
}

/// Appends to a bounded group queue.
fn push_bounded(
    queue: &mut VecDeque<GroupId>,
    group: GroupId,
    capacity: usize,
    name: &'static str,
) -> SimResult<()> {
    if queue.len() >= capacity {
        return Err(SimError::QueueOverflow { queue: name, capacity });
    }
    queue.push_back(group);
    Ok(())
}

//! Out-of-order thread window.
//!
//! Fully ready groups wait in a circular ready queue shared by all partitions. Without
//! swap-on-block the head is popped on every selection; with swap-on-block the head keeps
//! being fetched until it is found not ready. Groups that were fetched rest in a second
//! queue until their fetch delay elapses.

use std::collections::VecDeque;

use tracing::trace;

use super::{SchedulingPolicy, push_bounded};
use crate::common::{GroupId, SimError, SimResult, SlotId};
use crate::core::fetch::pool::ThreadSlotPool;

/// Where a group currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupPlace {
    /// Outside every queue; waits for its members to become ready.
    Blocked,
    /// In the ready queue.
    Queued,
    /// Popped and being sent to decode.
    Active,
    /// In the fetched queue, waiting for its fetch delay.
    Fetched,
}

/// Window scheduler state.
#[derive(Clone, Debug)]
pub struct WindowScheduler {
    ready: VecDeque<GroupId>,
    fetched: VecDeque<GroupId>,
    place: Vec<GroupPlace>,
    finished: Vec<u32>,
    group_size: u32,
    swap_on_block: bool,
    last_selection_ready: bool,
}

impl WindowScheduler {
    /// Creates a window over `num_groups` groups, all starting outside the queues.
    pub fn new(num_groups: u32, group_size: u32, swap_on_block: bool) -> Self {
        let n = num_groups as usize;
        Self {
            ready: VecDeque::with_capacity(2 * n),
            fetched: VecDeque::with_capacity(n),
            place: vec![GroupPlace::Blocked; n],
            finished: vec![0; n],
            group_size: group_size.max(1),
            swap_on_block,
            last_selection_ready: false,
        }
    }

    /// Position of a group.
    pub fn place(&self, group: GroupId) -> Option<GroupPlace> {
        self.place.get(group.index()).copied()
    }

    /// Groups in the ready queue, head first.
    pub fn ready_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.ready.iter().copied()
    }

    /// Groups waiting for their fetch delay, oldest first.
    pub fn fetched_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.fetched.iter().copied()
    }

    fn ready_capacity(&self) -> usize {
        2 * self.place.len()
    }

    fn set_place(&mut self, group: GroupId, place: GroupPlace) {
        if let Some(p) = self.place.get_mut(group.index()) {
            *p = place;
        }
    }

    fn enqueue_ready(&mut self, group: GroupId) -> SimResult<()> {
        let capacity = self.ready_capacity();
        push_bounded(&mut self.ready, group, capacity, "ready group")?;
        self.set_place(group, GroupPlace::Queued);
        Ok(())
    }

    fn enqueue_fetched(&mut self, group: GroupId) -> SimResult<()> {
        push_bounded(&mut self.fetched, group, self.place.len(), "fetched group")?;
        self.set_place(group, GroupPlace::Fetched);
        Ok(())
    }

    fn requeue_if_blocked(&mut self, group: GroupId) -> SimResult<()> {
        if self.place(group) == Some(GroupPlace::Blocked) {
            trace!(%group, "group enters ready window");
            self.enqueue_ready(group)?;
        }
        Ok(())
    }
}

impl SchedulingPolicy for WindowScheduler {
    fn on_activated(&mut self, group: GroupId, _pool: &ThreadSlotPool, _cycle: u64) -> SimResult<()> {
        self.requeue_if_blocked(group)
    }

    fn on_unblocked(&mut self, group: GroupId) -> SimResult<()> {
        self.requeue_if_blocked(group)
    }

    fn has_candidates(&self) -> bool {
        !self.ready.is_empty()
    }

    fn select(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<Option<GroupId>> {
        // Only the first group visited can be the one fetched last time.
        let mut last_ready = self.last_selection_ready;
        let mut selected = None;

        while selected.is_none() {
            let Some(&group) = self.ready.front() else { break };
            let ready = pool.group_ready(group);
            let first = group.first_slot(self.group_size);
            let ready_at = pool.slot(first)?.next_fetch_cycle;

            if ready && ready_at > cycle {
                if self.swap_on_block {
                    // The head keeps its position until its delay elapses.
                    return Ok(None);
                }
                return Err(SimError::FetchDelay { slot: first, cycle, ready_at });
            }

            if !self.swap_on_block {
                let _ = self.ready.pop_front();
                self.set_place(group, if ready { GroupPlace::Active } else { GroupPlace::Blocked });
            } else if !ready {
                let _ = self.ready.pop_front();
                if last_ready {
                    self.enqueue_fetched(group)?;
                } else {
                    self.set_place(group, GroupPlace::Blocked);
                }
            }

            if ready {
                selected = Some(group);
            }
            last_ready = false;
        }

        self.last_selection_ready = selected.is_some();
        Ok(selected)
    }

    fn group_sent(&mut self, group: GroupId) -> SimResult<()> {
        if self.swap_on_block { Ok(()) } else { self.enqueue_fetched(group) }
    }

    fn process_fetched(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()> {
        while let Some(&group) = self.fetched.front() {
            let first = group.first_slot(self.group_size);
            if pool.slot(first)?.next_fetch_cycle > cycle {
                break;
            }
            let _ = self.fetched.pop_front();
            if pool.group_ready(group) {
                self.enqueue_ready(group)?;
            } else {
                self.set_place(group, GroupPlace::Blocked);
            }
        }
        Ok(())
    }

    fn thread_finished(&mut self, slot: SlotId, pool: &ThreadSlotPool) -> SimResult<Vec<SlotId>> {
        let total = pool.total();
        let group = slot.group(self.group_size);
        let count = self
            .finished
            .get_mut(group.index())
            .ok_or(SimError::IllegalSlot { slot, total })?;
        *count += 1;
        if *count < self.group_size {
            return Ok(Vec::new());
        }
        *count = 0;
        Ok(group.members(self.group_size).collect())
    }

    fn backpressure(&mut self) {}
}

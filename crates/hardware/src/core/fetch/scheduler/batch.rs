//! In-order batch scheduling.
//!
//! Each partition owns two group buffers: groups are loaded into one while the other is
//! fetched, in append order, round after round until its threads end. This module provides:
//! 1. **Loading:** Fully ready groups are appended to the load buffer, which closes when
//!    full, on a `last` work item, on timeout, or under back-pressure.
//! 2. **Fetching:** The fetch buffer is walked in order and wraps once closed; every
//!    group of a round must share one PC.
//! 3. **Ending:** The batch ends when its first thread finishes and reopens for loading
//!    when its last thread finishes.
//! 4. **Partition Priority:** Vertex, then triangle, then fragment batches.

use tracing::{debug, trace};

use super::SchedulingPolicy;
use crate::common::{GroupId, SimError, SimResult, SlotId};
use crate::core::fetch::pool::ThreadSlotPool;
use crate::core::protocol::Partition;

/// Selection passes before giving up for the cycle.
const SELECT_PASSES: usize = 4;

/// Partition table indices in fetch priority order.
const PRIORITY: [usize; 3] = [0, 2, 1];

/// Double-buffered batch queue of one partition.
#[derive(Clone, Debug, Default)]
struct BatchQueue {
    buffers: [Vec<GroupId>; 2],
    closed: [bool; 2],
    load: usize,
    fetch: usize,
    next: usize,
    ending: bool,
    pc: u32,
    last_load_cycle: u64,
}

impl BatchQueue {
    fn fetch_len(&self) -> usize {
        self.buffers[self.fetch].len()
    }

    /// Closes the load buffer and moves loading to the other buffer if it was also
    /// being fetched.
    fn close_load(&mut self) {
        self.closed[self.load] = true;
        if self.load == self.fetch {
            self.load ^= 1;
        }
    }

    /// Reopens the drained fetch buffer and starts the next round.
    fn finish_batch(&mut self) {
        if self.closed[self.fetch] {
            self.closed[self.fetch] = false;
            self.buffers[self.fetch].clear();
            self.fetch ^= 1;
            if self.closed[self.fetch] {
                self.load ^= 1;
            }
        }
        self.next = 0;
        self.ending = false;
    }
}

/// Batch scheduler state.
#[derive(Clone, Debug)]
pub struct BatchScheduler {
    queues: [BatchQueue; Partition::COUNT],
    current: usize,
    capacity: usize,
    group_size: u32,
    timeout: u64,
}

impl BatchScheduler {
    /// Creates empty batches holding up to `num_groups` groups each.
    pub fn new(num_groups: u32, group_size: u32, timeout: u64) -> Self {
        Self {
            queues: Default::default(),
            current: Partition::Vertex.index(),
            capacity: num_groups as usize,
            group_size: group_size.max(1),
            timeout,
        }
    }

    /// Partition currently fetched.
    pub const fn current_partition(&self) -> usize {
        self.current
    }

    /// Groups in the fetch buffer of a partition.
    pub fn fetch_batch(&self, partition: Partition) -> &[GroupId] {
        let q = &self.queues[partition.index()];
        &q.buffers[q.fetch]
    }

    /// Groups in the load buffer of a partition.
    pub fn load_batch(&self, partition: Partition) -> &[GroupId] {
        let q = &self.queues[partition.index()];
        &q.buffers[q.load]
    }

    /// Returns true if the load buffer of a partition is closed.
    pub fn load_closed(&self, partition: Partition) -> bool {
        let q = &self.queues[partition.index()];
        q.closed[q.load]
    }

    /// Returns true if the fetch buffer of a partition is ending.
    pub fn ending(&self, partition: Partition) -> bool {
        self.queues[partition.index()].ending
    }

    /// Moves to the highest priority partition with a non-empty fetch buffer.
    fn pick_partition(&mut self) {
        if let Some(&p) = PRIORITY.iter().find(|&&p| self.queues[p].fetch_len() != 0) {
            self.current = p;
        }
    }

    fn group_pc(&self, group: GroupId, pool: &ThreadSlotPool) -> SimResult<(u32, u64)> {
        let first = pool.slot(group.first_slot(self.group_size))?;
        Ok((first.pc, first.next_fetch_cycle))
    }
}

impl SchedulingPolicy for BatchScheduler {
    fn on_activated(&mut self, group: GroupId, pool: &ThreadSlotPool, cycle: u64) -> SimResult<()> {
        let mut last = false;
        for slot in group.members(self.group_size) {
            last |= pool.slot(slot)?.work.as_ref().is_some_and(|w| w.last);
        }
        let partition = pool.slot(group.first_slot(self.group_size))?.partition;
        let capacity = self.capacity;
        let q = &mut self.queues[partition.index()];

        if q.buffers[q.load].len() >= capacity {
            return Err(SimError::BatchAppend { group, reason: "batch full" });
        }
        if q.fetch == q.load && q.closed[q.load] {
            return Err(SimError::BatchAppend { group, reason: "load batch closed" });
        }

        q.buffers[q.load].push(group);
        q.last_load_cycle = cycle;
        trace!(%group, %partition, batch = q.load, "group loaded into batch");

        if last || q.buffers[q.load].len() == capacity {
            debug!(%partition, batch = q.load, groups = q.buffers[q.load].len(), last, "batch closed");
            q.close_load();
        }
        Ok(())
    }

    fn on_unblocked(&mut self, _group: GroupId) -> SimResult<()> {
        Ok(())
    }

    fn has_candidates(&self) -> bool {
        true
    }

    fn select(&mut self, pool: &ThreadSlotPool, cycle: u64) -> SimResult<Option<GroupId>> {
        for _ in 0..SELECT_PASSES {
            let timeout = self.timeout;
            let q = &mut self.queues[self.current];
            let len = q.fetch_len();

            if len == 0 {
                self.pick_partition();
                return Ok(None);
            }

            if q.next == len {
                if q.ending {
                    q.finish_batch();
                    continue;
                }
                if q.closed[q.fetch] {
                    q.next = 0;
                    continue;
                }
                if cycle >= q.last_load_cycle.saturating_add(timeout) && q.load == q.fetch {
                    debug!(partition = self.current, cycle, "batch closed on timeout");
                    q.close_load();
                }
                self.pick_partition();
                return Ok(None);
            }

            let group = q.buffers[q.fetch][q.next];
            let (pc, ready_at) = self.group_pc(group, pool)?;
            let ready = pool.group_ready(group) && ready_at <= cycle;

            let selected = if ready {
                let q = &mut self.queues[self.current];
                if q.next == 0 {
                    q.pc = pc;
                } else if q.pc != pc {
                    return Err(SimError::BatchPcMismatch { group, expected: q.pc, found: pc });
                }
                q.next += 1;
                if q.next == q.fetch_len() && q.closed[q.fetch] && !q.ending {
                    q.next = 0;
                    self.pick_partition();
                }
                Some(group)
            } else {
                self.pick_partition();
                None
            };

            let q = &mut self.queues[self.current];
            if q.next == q.fetch_len() && q.ending {
                q.finish_batch();
            }
            return Ok(selected);
        }
        Ok(None)
    }

    fn group_sent(&mut self, _group: GroupId) -> SimResult<()> {
        Ok(())
    }

    fn process_fetched(&mut self, _pool: &ThreadSlotPool, _cycle: u64) -> SimResult<()> {
        Ok(())
    }

    fn thread_finished(&mut self, slot: SlotId, pool: &ThreadSlotPool) -> SimResult<Vec<SlotId>> {
        let partition = pool.slot(slot)?.partition;
        let group_size = self.group_size;
        let q = &mut self.queues[partition.index()];
        let batch = &q.buffers[q.fetch];

        if !q.ending {
            let first = batch.first().map(|g| g.first_slot(group_size));
            q.ending = first == Some(slot) && !(q.load == q.fetch && batch.is_empty());
            if q.ending && !q.closed[q.fetch] {
                debug!(%partition, batch = q.fetch, "batch ending");
                q.closed[q.fetch] = true;
                if q.load == q.fetch {
                    q.load ^= 1;
                }
            }
        }

        let last = q.buffers[q.fetch].last().map(|g| g.last_slot(group_size));
        if last == Some(slot) && q.ending {
            debug!(%partition, batch = q.fetch, "batch drained");
            q.finish_batch();
        }
        Ok(vec![slot])
    }

    fn backpressure(&mut self) {
        let q = &mut self.queues[self.current];
        if q.load == q.fetch && !q.buffers[q.load].is_empty() {
            debug!(partition = self.current, "batch closed on back-pressure");
            q.close_load();
        }
    }
}

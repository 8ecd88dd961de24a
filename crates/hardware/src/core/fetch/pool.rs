//! Thread slot table and resource budget.
//!
//! Slots are pre-allocated at construction and recycled through a FIFO free list.
//! This module provides:
//! 1. **Slot Records:** Status, PC, owning work item and fetch bookkeeping per slot.
//! 2. **Resource Budget:** Free slots and free resource units; acquire and release
//!    always move both together.
//! 3. **Staging:** FIFO of filled slots waiting for a free executable slot.
//! 4. **Census:** Per-status counts and per-group ready counts kept in step with
//!    every status change.

use std::collections::VecDeque;

use crate::common::{GroupId, SimError, SimResult, SlotId};
use crate::core::protocol::{Partition, ShaderWork};

/// Lifecycle state of a thread slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotStatus {
    /// Unused; in the free list.
    Free,
    /// Filled with work but not yet eligible for fetch.
    Staged,
    /// Eligible for fetch.
    Ready,
    /// Waiting for an unblock from decode.
    Blocked,
    /// Finished; waiting for output transmission.
    Ending,
    /// Output transmission in progress.
    Draining,
}

impl SlotStatus {
    /// State name for logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Staged => "STAGED",
            Self::Ready => "READY",
            Self::Blocked => "BLOCKED",
            Self::Ending => "ENDING",
            Self::Draining => "DRAINING",
        }
    }

    const fn census_index(self) -> usize {
        match self {
            Self::Free => 0,
            Self::Ready => 1,
            Self::Staged | Self::Blocked => 2,
            Self::Ending | Self::Draining => 3,
        }
    }
}

/// One hardware thread slot.
#[derive(Clone, Debug)]
pub struct ThreadSlot {
    status: SlotStatus,
    /// Work item bound to the slot.
    pub work: Option<ShaderWork>,
    /// Partition of the bound work.
    pub partition: Partition,
    /// Resource units charged at acquire and returned at release.
    pub cost: u32,
    /// Next PC to fetch.
    pub pc: u32,
    /// Real instructions fetched since admission.
    pub instruction_count: u32,
    /// First cycle the slot may be fetched again.
    pub next_fetch_cycle: u64,
    /// The next fetch replays a `RepeatLast`.
    pub repeat: bool,
    /// The thread exported its depth value.
    pub zexported: bool,
}

impl ThreadSlot {
    const fn new() -> Self {
        Self {
            status: SlotStatus::Free,
            work: None,
            partition: Partition::Primary,
            cost: 0,
            pc: 0,
            instruction_count: 0,
            next_fetch_cycle: 0,
            repeat: false,
            zexported: false,
        }
    }

    /// Current status.
    #[inline]
    pub const fn status(&self) -> SlotStatus {
        self.status
    }
}

/// Slot counts by status.
///
/// Staged slots count as blocked and draining slots as ending, so the four
/// fields always sum to the table size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCensus {
    /// Free slots.
    pub free: u32,
    /// Ready slots.
    pub ready: u32,
    /// Blocked or staged slots.
    pub blocked: u32,
    /// Ending or draining slots.
    pub ending: u32,
}

impl SlotCensus {
    /// Sum of all counts.
    pub const fn total(&self) -> u32 {
        self.free + self.ready + self.blocked + self.ending
    }
}

/// The thread slot table and its resource budget.
#[derive(Clone, Debug)]
pub struct ThreadSlotPool {
    slots: Vec<ThreadSlot>,
    free_list: VecDeque<SlotId>,
    staged: VecDeque<SlotId>,
    total_resources: u32,
    free_resources: u32,
    group_size: u32,
    group_ready: Vec<u32>,
    counts: [u32; 4],
}

impl ThreadSlotPool {
    /// Creates a pool of `total` free slots sharing `resources` units.
    ///
    /// # Arguments
    ///
    /// * `total` - Slots in the table (executable threads plus input buffers).
    /// * `resources` - Resource units shared by all slots.
    /// * `group_size` - Slots per thread group; `total` must be a multiple of it.
    pub fn new(total: u32, resources: u32, group_size: u32) -> Self {
        let group_size = group_size.max(1);
        Self {
            slots: (0..total).map(|_| ThreadSlot::new()).collect(),
            free_list: (0..total).map(SlotId).collect(),
            staged: VecDeque::new(),
            total_resources: resources,
            free_resources: resources,
            group_size,
            group_ready: vec![0; (total / group_size) as usize],
            counts: [total, 0, 0, 0],
        }
    }

    /// Binds a free slot charged with `cost` resource units to `partition`.
    ///
    /// The slot leaves the free list as `Staged`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NoCapacity` if no slot is free or fewer than `cost` units remain.
    pub fn acquire(&mut self, partition: Partition, cost: u32) -> SimResult<SlotId> {
        if self.free_list.is_empty() || self.free_resources < cost {
            return Err(SimError::NoCapacity {
                free_slots: self.free_slots(),
                free_resources: self.free_resources,
                cost,
            });
        }
        let slot = self.free_list.pop_front().ok_or(SimError::NoCapacity {
            free_slots: 0,
            free_resources: self.free_resources,
            cost,
        })?;
        self.free_resources -= cost;
        self.set_status(slot, SlotStatus::Staged)?;
        let record = &mut self.slots[slot.index()];
        record.partition = partition;
        record.cost = cost;
        Ok(slot)
    }

    /// Returns a slot and its recorded cost to the budget.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot, `SimError::DoubleFree`
    /// if the slot is already free and `SimError::BudgetOverflow` if the release would
    /// exceed the configured totals.
    pub fn release(&mut self, slot: SlotId) -> SimResult<u32> {
        let status = self.status(slot)?;
        if status == SlotStatus::Free {
            return Err(SimError::DoubleFree(slot));
        }
        let cost = self.slots[slot.index()].cost;
        let free = self.free_resources + cost;
        if free > self.total_resources || self.free_list.len() >= self.slots.len() {
            return Err(SimError::BudgetOverflow { free, total: self.total_resources });
        }
        self.set_status(slot, SlotStatus::Free)?;
        self.free_resources = free;
        self.free_list.push_back(slot);
        let record = &mut self.slots[slot.index()];
        record.work = None;
        record.cost = 0;
        record.repeat = false;
        record.zexported = false;
        Ok(cost)
    }

    /// Borrows a slot record.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn slot(&self, slot: SlotId) -> SimResult<&ThreadSlot> {
        let total = self.total();
        self.slots.get(slot.index()).ok_or(SimError::IllegalSlot { slot, total })
    }

    /// Mutably borrows a slot record.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn slot_mut(&mut self, slot: SlotId) -> SimResult<&mut ThreadSlot> {
        let total = self.total();
        self.slots.get_mut(slot.index()).ok_or(SimError::IllegalSlot { slot, total })
    }

    /// Status of a slot.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn status(&self, slot: SlotId) -> SimResult<SlotStatus> {
        self.slot(slot).map(ThreadSlot::status)
    }

    /// Moves a slot to `status`, keeping the census and group ready counts in step.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalSlot` for an out-of-range slot.
    pub fn set_status(&mut self, slot: SlotId, status: SlotStatus) -> SimResult<()> {
        let old = self.status(slot)?;
        if old == status {
            return Ok(());
        }
        self.counts[old.census_index()] -= 1;
        self.counts[status.census_index()] += 1;
        let group = slot.group(self.group_size).index();
        if old == SlotStatus::Ready {
            self.group_ready[group] -= 1;
        } else if status == SlotStatus::Ready {
            self.group_ready[group] += 1;
        }
        self.slots[slot.index()].status = status;
        Ok(())
    }

    /// Slot counts by status.
    #[inline]
    pub const fn census(&self) -> SlotCensus {
        SlotCensus { free: self.counts[0], ready: self.counts[1], blocked: self.counts[2], ending: self.counts[3] }
    }

    /// Queues a filled slot to wait for activation.
    pub fn push_staged(&mut self, slot: SlotId) {
        self.staged.push_back(slot);
    }

    /// Takes the oldest staged slot.
    pub fn pop_staged(&mut self) -> Option<SlotId> {
        self.staged.pop_front()
    }

    /// Staged slots waiting for activation.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Returns true if the slot is in range and `Ready`.
    #[inline]
    pub fn is_ready(&self, slot: SlotId) -> bool {
        self.slots.get(slot.index()).is_some_and(|s| s.status == SlotStatus::Ready)
    }

    /// Returns true if every member of the group is `Ready`.
    #[inline]
    pub fn group_ready(&self, group: GroupId) -> bool {
        self.group_ready_count(group) == self.group_size
    }

    /// Ready members of a group.
    #[inline]
    pub fn group_ready_count(&self, group: GroupId) -> u32 {
        self.group_ready.get(group.index()).copied().unwrap_or(0)
    }

    /// Slots per thread group.
    #[inline]
    pub const fn group_size(&self) -> u32 {
        self.group_size
    }

    /// Number of thread groups.
    #[inline]
    pub fn num_groups(&self) -> u32 {
        self.group_ready.len() as u32
    }

    /// Free slots.
    #[inline]
    pub fn free_slots(&self) -> u32 {
        self.free_list.len() as u32
    }

    /// Free resource units.
    #[inline]
    pub const fn free_resources(&self) -> u32 {
        self.free_resources
    }

    /// Resource units currently charged to slots.
    #[inline]
    pub const fn used_resources(&self) -> u32 {
        self.total_resources - self.free_resources
    }

    /// Configured resource units.
    #[inline]
    pub const fn total_resources(&self) -> u32 {
        self.total_resources
    }

    /// Slots in the table.
    #[inline]
    pub fn total(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Returns true if every slot is free.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free_list.len() == self.slots.len()
    }
}

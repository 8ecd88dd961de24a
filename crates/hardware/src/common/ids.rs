//! Slot and group index types.
//!
//! This module defines strong index types for the thread slot table so that slot,
//! group and texture unit numbers cannot be mixed up. It provides the following:
//! 1. **Type Safety:** Distinguishes slot indices from group indices at compile time.
//! 2. **Group Arithmetic:** Converts between a slot and the group that contains it.
//! 3. **Wire Format:** Slots travel between boxes as plain `u32` values inside messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a hardware thread slot in the shader thread table.
///
/// Slots are pre-allocated at construction and live for the whole simulation;
/// the same index is recycled through the free list as work items come and go.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SlotId(pub u32);

/// Index of a lock-step thread group.
///
/// Group `g` covers the contiguous slots `g * group_size .. (g + 1) * group_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl SlotId {
    /// Creates a slot index from a raw table index.
    #[inline(always)]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot as a table index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the group containing this slot.
    ///
    /// # Arguments
    ///
    /// * `group_size` - Number of slots per thread group (non-zero).
    #[inline(always)]
    pub const fn group(self, group_size: u32) -> GroupId {
        GroupId(self.0 / group_size)
    }

    /// Returns the slot `offset` positions after this one, wrapping at `total`.
    #[inline]
    pub const fn wrapping_add(self, offset: u32, total: u32) -> Self {
        Self((self.0 + offset) % total)
    }
}

impl GroupId {
    /// Returns the group as a table index.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the first slot of the group.
    #[inline(always)]
    pub const fn first_slot(self, group_size: u32) -> SlotId {
        SlotId(self.0 * group_size)
    }

    /// Returns the last slot of the group.
    #[inline(always)]
    pub const fn last_slot(self, group_size: u32) -> SlotId {
        SlotId(self.0 * group_size + group_size - 1)
    }

    /// Iterates over the member slots of the group in order.
    pub fn members(self, group_size: u32) -> impl Iterator<Item = SlotId> {
        let first = self.0 * group_size;
        (first..first + group_size).map(SlotId)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group{}", self.0)
    }
}

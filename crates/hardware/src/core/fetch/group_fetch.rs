//! Lock-step group fetch buffer and issue-slot tracking.
//!
//! In lock-step mode all instructions of a group are fetched when the group is selected
//! and then sent member by member, up to the thread rate per cycle.

use crate::common::{GroupId, SlotId};
use crate::core::protocol::FetchedInstruction;

/// SIMD and scalar issue slots of one thread-cycle in scalar ALU mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IssueSlots {
    simd: bool,
    scalar: bool,
}

impl IssueSlots {
    /// Frees both slots for the next thread.
    #[inline]
    pub const fn reset(&mut self) {
        self.simd = false;
        self.scalar = false;
    }

    /// Returns true if the slot an instruction needs is already taken.
    #[inline]
    pub const fn taken(&self, scalar: bool) -> bool {
        if scalar { self.scalar } else { self.simd }
    }

    /// Claims the slot an instruction needs.
    ///
    /// Returns false if the slot was already taken this thread-cycle, in which case the
    /// fetch must be faked.
    #[inline]
    pub const fn claim(&mut self, scalar: bool) -> bool {
        let slot = if scalar { &mut self.scalar } else { &mut self.simd };
        if *slot {
            return false;
        }
        *slot = true;
        true
    }
}

/// Instructions fetched for the active group, one row per member.
#[derive(Clone, Debug)]
pub struct GroupFetchUnit {
    rows: Vec<Vec<FetchedInstruction>>,
    active: Option<GroupId>,
    next_in_group: u32,
    group_size: u32,
}

impl GroupFetchUnit {
    /// Creates an empty buffer for groups of `group_size` members.
    pub fn new(group_size: u32) -> Self {
        Self {
            rows: vec![Vec::new(); group_size as usize],
            active: None,
            next_in_group: 0,
            group_size: group_size.max(1),
        }
    }

    /// Group being sent, if any.
    #[inline]
    pub const fn active(&self) -> Option<GroupId> {
        self.active
    }

    /// Member to send next; zero when no group is partially sent.
    #[inline]
    pub const fn next_in_group(&self) -> u32 {
        self.next_in_group
    }

    /// Starts buffering a newly selected group.
    pub fn begin(&mut self, group: GroupId) {
        self.active = Some(group);
        self.next_in_group = 0;
        for row in &mut self.rows {
            row.clear();
        }
    }

    /// Stores a fetched instruction for a member.
    pub fn store(&mut self, member: u32, instr: FetchedInstruction) {
        if let Some(row) = self.rows.get_mut(member as usize) {
            row.push(instr);
        }
    }

    /// Takes the next member's instructions.
    ///
    /// Returns the member slot, its instructions, and the group if this member completed it.
    pub fn send_next(&mut self) -> Option<(SlotId, Vec<FetchedInstruction>, Option<GroupId>)> {
        let group = self.active?;
        let member = self.next_in_group;
        let slot = SlotId(group.first_slot(self.group_size).0 + member);
        let row = std::mem::take(self.rows.get_mut(member as usize)?);
        self.next_in_group = (member + 1) % self.group_size;
        let completed = if self.next_in_group == 0 {
            self.active = None;
            Some(group)
        } else {
            None
        };
        Some((slot, row, completed))
    }
}

//! Register write-port reservation table.
//!
//! A circular table of `MAX_EXEC_LAT` cycles counts the register writes already booked
//! for each future cycle. The head entry is retired at the start of every clock.

use crate::common::constants::MAX_EXEC_LAT;

/// Booked register writes per future cycle.
#[derive(Clone, Debug)]
pub struct WritePortTable {
    writes: [u32; MAX_EXEC_LAT],
    next: usize,
    capacity: u32,
}

impl WritePortTable {
    /// Creates an empty table allowing `capacity` writes per cycle.
    pub const fn new(capacity: u32) -> Self {
        Self { writes: [0; MAX_EXEC_LAT], next: 0, capacity }
    }

    /// Frees the entry of the cycle that just elapsed and moves to the next one.
    pub const fn retire(&mut self) {
        self.writes[self.next] = 0;
        self.next = (self.next + 1) % MAX_EXEC_LAT;
    }

    #[inline]
    const fn index(&self, latency: u32) -> usize {
        (self.next + latency as usize) % MAX_EXEC_LAT
    }

    /// Returns true if no write port is left `latency` cycles from now.
    #[inline]
    pub const fn is_full(&self, latency: u32) -> bool {
        self.writes[self.index(latency)] >= self.capacity
    }

    /// Books a write `latency` cycles from now.
    pub const fn reserve(&mut self, latency: u32) {
        let i = self.index(latency);
        self.writes[i] += 1;
    }

    /// Writes booked `latency` cycles from now.
    pub const fn booked(&self, latency: u32) -> u32 {
        self.writes[self.index(latency)]
    }

    /// Clears every entry.
    pub const fn reset(&mut self) {
        self.writes = [0; MAX_EXEC_LAT];
        self.next = 0;
    }
}

//! Fixed-latency texture unit model.
//!
//! Every request completes a fixed number of cycles after it arrives. The unit starts
//! with one ticket grant per queue entry and grants again each time a result leaves,
//! so the decode box never holds more tickets than the queue can absorb.

use std::collections::VecDeque;

use crate::common::SimResult;
use crate::common::constants::STAMP_FRAGMENTS;
use crate::core::protocol::{TextureResult, TextureTickets};
use crate::core::wires::TexturePorts;

/// Cycles from request arrival to result.
pub const DEFAULT_TEXTURE_LATENCY: u64 = 8;

/// A texture unit that answers every request after a fixed latency.
#[derive(Clone, Debug)]
pub struct FixedLatencyTextureUnit {
    latency: u64,
    queue: VecDeque<(u64, u64)>,
    pending_grants: u32,
    completed: u64,
}

impl FixedLatencyTextureUnit {
    /// Creates a unit with room for `capacity` stamp accesses.
    pub fn new(latency: u64, capacity: u32) -> Self {
        Self { latency, queue: VecDeque::new(), pending_grants: capacity, completed: 0 }
    }

    /// Creates a unit sized so that every slot of a table of `total_slots` can hold a ticket.
    pub fn for_slots(latency: u64, total_slots: u32) -> Self {
        Self::new(latency, total_slots.div_ceil(STAMP_FRAGMENTS as u32) + 1)
    }

    /// Requests waiting for their result.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Results returned since construction.
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    /// Accepts requests, returns due results and grants at most one batch of tickets.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if a port is over-driven.
    pub fn clock(&mut self, cycle: u64, ports: &mut TexturePorts) -> SimResult<()> {
        for request in ports.requests.read_all(cycle) {
            self.queue.push_back((cycle + self.latency, request.id));
        }

        let rate = ports.results.bandwidth();
        let mut sent = 0;
        while sent < rate {
            let Some(&(due, id)) = self.queue.front() else { break };
            if due > cycle {
                break;
            }
            let _ = self.queue.pop_front();
            ports.results.write(cycle, TextureResult { access_id: id })?;
            self.completed += 1;
            self.pending_grants += 1;
            sent += 1;
        }

        if self.pending_grants > 0 {
            ports.tickets.write(cycle, TextureTickets)?;
            self.pending_grants -= 1;
        }
        Ok(())
    }
}

//! Texture ticket accounting and request dispatch.
//!
//! A texture load may only issue while the texture unit currently selected for
//! requests has a ticket left. Units grant tickets through their state signal, and
//! accesses formed by the emulator are sent round robin across units.

use tracing::trace;

use crate::common::SimResult;
use crate::common::constants::TICKETS_PER_GRANT;
use crate::core::wires::TexturePorts;
use crate::emulator::ShaderEmulator;
use crate::stats::ShaderStats;

/// Ticket counters and the round-robin request pointer.
#[derive(Clone, Debug)]
pub struct TextureArbiter {
    tickets: Vec<u32>,
    next_unit: usize,
    unit_requests: u32,
    request_rate: u32,
    requests_per_unit: u32,
}

impl TextureArbiter {
    /// Creates an arbiter for `units` texture units with no tickets.
    pub fn new(units: u32, request_rate: u32, requests_per_unit: u32) -> Self {
        Self { tickets: vec![0; units as usize], next_unit: 0, unit_requests: 0, request_rate, requests_per_unit }
    }

    /// Unit requests are currently sent to.
    pub const fn next_unit(&self) -> usize {
        self.next_unit
    }

    /// Tickets held for a unit.
    pub fn tickets(&self, unit: usize) -> u32 {
        self.tickets.get(unit).copied().unwrap_or(0)
    }

    /// Adds one grant of tickets from `unit`.
    pub fn grant(&mut self, unit: usize) {
        if let Some(t) = self.tickets.get_mut(unit) {
            *t += TICKETS_PER_GRANT;
        }
    }

    /// Returns true if a texture load may issue this cycle.
    ///
    /// Without texture units no ticket is ever available.
    #[inline]
    pub fn has_ticket(&self) -> bool {
        self.tickets(self.next_unit) > 0
    }

    /// Spends a ticket of the current unit.
    pub fn consume(&mut self) {
        if let Some(t) = self.tickets.get_mut(self.next_unit) {
            *t = t.saturating_sub(1);
        }
    }

    /// Sends up to the request rate of pending accesses to the current unit.
    ///
    /// When the emulator has nothing to send and the current unit has received its
    /// share of requests, the pointer moves to the next unit.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if a request port is over-driven.
    pub fn dispatch<E: ShaderEmulator>(
        &mut self,
        cycle: u64,
        emu: &mut E,
        ports: &mut [TexturePorts],
        stats: &mut ShaderStats,
    ) -> SimResult<()> {
        if ports.is_empty() {
            return Ok(());
        }
        for _ in 0..self.request_rate {
            if let Some(mut access) = emu.next_texture_access() {
                access.cycle = cycle;
                trace!(id = access.id, unit = self.next_unit, "texture request");
                ports[self.next_unit].requests.write(cycle, access)?;
                self.unit_requests += 1;
                stats.texture_requests += 1;
            } else if self.unit_requests >= self.requests_per_unit {
                self.unit_requests = 0;
                self.next_unit = (self.next_unit + 1) % ports.len();
            }
        }
        Ok(())
    }

    /// Drops all tickets and restarts at the first unit.
    pub fn reset(&mut self) {
        self.tickets.fill(0);
        self.next_unit = 0;
        self.unit_requests = 0;
    }
}

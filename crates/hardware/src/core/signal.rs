//! Latched, latency-aware ports between boxes.
//!
//! A `Signal<T>` carries owned messages from one box to another. It provides:
//! 1. **Latency:** A value written at cycle `c` is readable at `c + latency`.
//! 2. **Variable Latency:** `write_delayed` picks the latency per value, bounded by the port maximum.
//! 3. **Bandwidth:** At most `bandwidth` values may be written in one cycle.
//! 4. **Defaults:** Optional values pre-filled for the first `latency` cycles so required
//!    per-cycle signals can be read from cycle 0.

use std::collections::{BTreeMap, VecDeque};

use crate::common::{SimError, SimResult};

/// A named, bandwidth-limited, latency-aware message port.
///
/// Values not read in the cycle they become visible are discarded by the next read.
#[derive(Debug, Clone)]
pub struct Signal<T> {
    name: &'static str,
    bandwidth: usize,
    latency: u64,
    max_latency: u64,
    pending: BTreeMap<u64, VecDeque<T>>,
    write_cycle: u64,
    writes_in_cycle: usize,
}

impl<T> Signal<T> {
    /// Creates a signal with a fixed latency.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in error messages.
    /// * `bandwidth` - Values that may be written per cycle.
    /// * `latency` - Cycles between write and read.
    pub fn new(name: &'static str, bandwidth: usize, latency: u64) -> Self {
        Self {
            name,
            bandwidth,
            latency,
            max_latency: latency,
            pending: BTreeMap::new(),
            write_cycle: 0,
            writes_in_cycle: 0,
        }
    }

    /// Allows `write_delayed` latencies up to `max_latency`.
    #[must_use]
    pub fn with_max_latency(mut self, max_latency: u64) -> Self {
        self.max_latency = max_latency.max(self.latency);
        self
    }

    /// Pre-fills cycles `0..latency` with one copy of `value` each.
    #[must_use]
    pub fn with_default(mut self, value: T) -> Self
    where
        T: Clone,
    {
        for cycle in 0..self.latency {
            self.pending.entry(cycle).or_default().push_back(value.clone());
        }
        self
    }

    /// Signal name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Values allowed per write cycle.
    #[inline]
    pub const fn bandwidth(&self) -> usize {
        self.bandwidth
    }

    /// Writes `value` at `cycle` with the default latency.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if the cycle's bandwidth is exhausted.
    pub fn write(&mut self, cycle: u64, value: T) -> SimResult<()> {
        self.write_delayed(cycle, value, self.latency)
    }

    /// Writes `value` at `cycle`, readable at `cycle + latency`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::SignalBandwidth` if the cycle's bandwidth is exhausted and
    /// `SimError::SignalLatency` if `latency` is zero or above the port maximum.
    pub fn write_delayed(&mut self, cycle: u64, value: T, latency: u64) -> SimResult<()> {
        if latency == 0 || latency > self.max_latency {
            return Err(SimError::SignalLatency { signal: self.name, latency, max: self.max_latency });
        }
        if cycle != self.write_cycle {
            self.write_cycle = cycle;
            self.writes_in_cycle = 0;
        }
        if self.writes_in_cycle >= self.bandwidth {
            return Err(SimError::SignalBandwidth { signal: self.name, bandwidth: self.bandwidth, cycle });
        }
        self.writes_in_cycle += 1;
        self.pending.entry(cycle + latency).or_default().push_back(value);
        Ok(())
    }

    /// Reads the oldest value visible at `cycle`.
    pub fn read(&mut self, cycle: u64) -> Option<T> {
        self.discard_before(cycle);
        let queue = self.pending.get_mut(&cycle)?;
        let value = queue.pop_front();
        if queue.is_empty() {
            let _ = self.pending.remove(&cycle);
        }
        value
    }

    /// Reads a value that must be present at `cycle`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingSignal` if nothing is visible at `cycle`.
    pub fn read_required(&mut self, cycle: u64) -> SimResult<T> {
        self.read(cycle).ok_or(SimError::MissingSignal { signal: self.name, cycle })
    }

    /// Reads every value visible at `cycle` in write order.
    pub fn read_all(&mut self, cycle: u64) -> Vec<T> {
        self.discard_before(cycle);
        self.pending.remove(&cycle).map(Vec::from).unwrap_or_default()
    }

    /// Returns true if no value is in flight.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of values in flight.
    pub fn in_flight(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    /// Drops every value in flight.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn discard_before(&mut self, cycle: u64) {
        if self.pending.first_key_value().is_some_and(|(&first, _)| first < cycle) {
            self.pending = self.pending.split_off(&cycle);
        }
    }
}

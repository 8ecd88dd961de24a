//! Simulation driver and external unit models.
//!
//! The shader core only models the fetch and decode-execute boxes. To run it end to end
//! this module supplies the neighbours it talks to. It provides:
//! 1. **Texture Unit:** A fixed-latency unit that grants tickets and returns results.
//! 2. **Consumer:** An output sink with an optional acceptance period.
//! 3. **Simulator:** Feeds commands and work items, honours back-pressure and clocks
//!    every component once per cycle.

/// Output sink with back-pressure.
pub mod consumer;

/// Cycle driver.
pub mod simulator;

/// Fixed-latency texture unit model.
pub mod texture_unit;

pub use self::consumer::OutputConsumer;
pub use self::simulator::Simulator;
pub use self::texture_unit::FixedLatencyTextureUnit;

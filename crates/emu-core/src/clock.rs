//! Input clock configuration.

use crate::Ticks;

/// Input clock configuration for a CPU or system.
///
/// All instruction and wait-state costs are counted in periods of this clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Clock frequency in Hz (e.g., `1_250_000` for a slow PACE part).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks elapsed in the given number of microseconds (integer division).
    #[must_use]
    pub const fn ticks_per_micros(&self, micros: u64) -> Ticks {
        Ticks::new(self.frequency_hz * micros / 1_000_000)
    }
}

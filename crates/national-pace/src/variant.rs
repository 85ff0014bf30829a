//! Hardware variants of the PACE execution shell.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Which part is being emulated.
///
/// Both parts execute identically; they differ in clocking and power supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// IPC-16A PACE (PMOS): two non-overlapping clock phases, 1.25 to 1.538 MHz.
    Pace,
    /// INS8900 (NMOS): single-phase clock, up to 2 MHz.
    #[default]
    Ins8900,
}

impl Variant {
    /// Number of clock phase inputs.
    #[must_use]
    pub const fn clock_phases(self) -> u8 {
        match self {
            Variant::Pace => 2,
            Variant::Ins8900 => 1,
        }
    }

    /// Legal input clock frequencies in Hz.
    #[must_use]
    pub const fn clock_range(self) -> RangeInclusive<u64> {
        match self {
            Variant::Pace => 1_250_000..=1_538_000,
            Variant::Ins8900 => 1..=2_000_000,
        }
    }

    /// Fastest legal clock, used when none is configured.
    #[must_use]
    pub const fn default_clock(self) -> u64 {
        *self.clock_range().end()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Variant::Pace => "PACE",
            Variant::Ins8900 => "INS8900",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

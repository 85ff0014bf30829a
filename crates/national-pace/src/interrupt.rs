//! Interrupt levels and request arbitration.
//!
//! Six levels. Level 0 is the non-maskable debug interrupt, latched on a
//! rising edge of its pin. Level 1 is raised only by the on-chip stack on
//! overflow or underflow. Levels 2..5 are level-sensitive request pins, which
//! devices on the bus may also drive.
//!
//! Lower level numbers win. Levels 1..5 are recognised only when both the
//! master enable (IEN) and the level's own enable bit are set in the flag
//! register.

use serde::{Deserialize, Serialize};

use crate::flags::{interrupt_enable, IEN};
use crate::state::InterruptState;

/// One of the six PACE interrupt levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum InterruptLevel {
    /// Level 0: non-maskable, intended for debugger entry.
    Debug = 0,
    /// Level 1: stack full/empty. Never driven from a pin.
    Stack = 1,
    Int2 = 2,
    Int3 = 3,
    Int4 = 4,
    Int5 = 5,
}

impl InterruptLevel {
    /// All levels in priority order, highest first.
    pub const ALL: [InterruptLevel; 6] = [
        InterruptLevel::Debug,
        InterruptLevel::Stack,
        InterruptLevel::Int2,
        InterruptLevel::Int3,
        InterruptLevel::Int4,
        InterruptLevel::Int5,
    ];

    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(InterruptLevel::Debug),
            1 => Some(InterruptLevel::Stack),
            2 => Some(InterruptLevel::Int2),
            3 => Some(InterruptLevel::Int3),
            4 => Some(InterruptLevel::Int4),
            5 => Some(InterruptLevel::Int5),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Levels whose pins are level-sensitive (2..5).
const LEVEL_SENSITIVE: u8 = 0b0011_1100;
/// Levels that are latched until acknowledged (0 and 1).
const LATCHED: u8 = 0b0000_0011;

/// Request latches and pin levels of the flag/interrupt unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct InterruptUnit {
    /// Pin levels for levels 0 and 2..5, one bit per level.
    pins: u8,
    /// Latched requests for levels 0 and 1.
    latched: u8,
}

impl InterruptUnit {
    /// Drive an external interrupt pin. Returns false for the internal level.
    pub(crate) fn set_pin(&mut self, level: InterruptLevel, state: bool) -> bool {
        if level == InterruptLevel::Stack {
            return false;
        }
        let bit = level.bit();
        let was = self.pins & bit != 0;
        if state {
            self.pins |= bit;
        } else {
            self.pins &= !bit;
        }
        // Debug level is edge-triggered.
        if level == InterruptLevel::Debug && state && !was {
            self.latched |= bit;
        }
        true
    }

    pub(crate) fn raise_stack(&mut self) {
        self.latched |= InterruptLevel::Stack.bit();
    }

    /// Requests currently presented, one bit per level.
    pub(crate) fn requests(&self, bus_lines: u8) -> u8 {
        (self.latched & LATCHED) | ((self.pins | bus_lines) & LEVEL_SENSITIVE)
    }

    /// Highest-priority request that the flag register allows.
    pub(crate) fn highest(&self, bus_lines: u8, fr: u16) -> Option<InterruptLevel> {
        let requests = self.requests(bus_lines);
        InterruptLevel::ALL.into_iter().find(|&level| {
            if requests & level.bit() == 0 {
                return false;
            }
            match level {
                InterruptLevel::Debug => true,
                _ => fr & IEN != 0 && fr & interrupt_enable(level.index()) != 0,
            }
        })
    }

    /// Clear the latch of an acknowledged level. Pin-driven levels stay up
    /// until the source drops them.
    pub(crate) fn acknowledge(&mut self, level: InterruptLevel) {
        self.latched &= !level.bit();
    }

    /// Discard every latched request. Pin levels are inputs and survive.
    pub(crate) fn reset(&mut self) {
        self.latched = 0;
    }

    pub(crate) fn save(&self) -> InterruptState {
        InterruptState {
            pins: self.pins,
            latched: self.latched,
        }
    }

    pub(crate) fn restore(&mut self, state: &InterruptState) {
        self.pins = state.pins & (LEVEL_SENSITIVE | 1);
        self.latched = state.latched & LATCHED;
    }
}

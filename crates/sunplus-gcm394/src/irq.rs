//! Interrupt aggregator.
//!
//! Folds the peripheral sources into the single request the SoC drives on
//! CPU level 2. Video and audio are level inputs from their blocks; DMA
//! completion and internal faults are latched until software clears them
//! through the status register (write one to clear).
//!
//! Vector priority, highest first: internal, DMA, video, audio.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::trace;

bitflags! {
    /// Peripheral interrupt sources, as laid out in the status and enable
    /// registers.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct IrqSources: u16 {
        const VIDEO = 1 << 0;
        const AUDIO = 1 << 1;
        const DMA = 1 << 2;
        const INTERNAL = 1 << 3;
    }
}

/// Sources that latch until cleared.
const LATCHING: IrqSources = IrqSources::DMA.union(IrqSources::INTERNAL);

/// Vector returned when the line is sampled with nothing pending.
pub const SPURIOUS_VECTOR: u16 = 7;

/// Priority order and vector number of each source.
const PRIORITY: [(IrqSources, u16); 4] = [
    (IrqSources::INTERNAL, 3),
    (IrqSources::DMA, 2),
    (IrqSources::VIDEO, 0),
    (IrqSources::AUDIO, 1),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorState {
    pub lines: IrqSources,
    pub latched: IrqSources,
    pub enabled: IrqSources,
}

#[derive(Debug, Default)]
pub struct InterruptAggregator {
    state: AggregatorState,
}

impl InterruptAggregator {
    /// Drive a level-sensitive source.
    pub fn set_line(&mut self, source: IrqSources, level: bool) {
        self.state.lines.set(source & !LATCHING, level);
    }

    /// Latch a DMA completion or internal fault.
    pub fn raise(&mut self, source: IrqSources) {
        self.state.latched |= source & LATCHING;
    }

    /// Clear latched sources whose bits are set in `value`.
    pub fn clear(&mut self, value: u16) {
        self.state.latched -= IrqSources::from_bits_truncate(value);
    }

    pub fn set_enabled(&mut self, value: u16) {
        self.state.enabled = IrqSources::from_bits_truncate(value);
    }

    #[must_use]
    pub fn pending(&self) -> IrqSources {
        self.state.lines | self.state.latched
    }

    #[must_use]
    pub fn masked(&self) -> IrqSources {
        self.pending() & self.state.enabled
    }

    #[must_use]
    pub fn enabled(&self) -> IrqSources {
        self.state.enabled
    }

    /// Request line towards the CPU.
    #[must_use]
    pub fn line(&self) -> bool {
        !self.masked().is_empty()
    }

    /// Vector of the highest-priority pending and enabled source.
    #[must_use]
    pub fn vector(&self) -> u16 {
        let masked = self.masked();
        let vector = PRIORITY
            .iter()
            .find(|(source, _)| masked.contains(*source))
            .map_or(SPURIOUS_VECTOR, |&(_, vector)| vector);
        trace!(pending = masked.bits(), vector, "irq vector fetch");
        vector
    }

    /// Reset clears latches and enables. Level inputs are left to their
    /// sources.
    pub fn reset(&mut self) {
        self.state.latched = IrqSources::empty();
        self.state.enabled = IrqSources::empty();
    }

    #[must_use]
    pub fn save(&self) -> AggregatorState {
        self.state
    }

    pub fn restore(&mut self, state: &AggregatorState) {
        self.state = *state;
    }
}

//! Serializable CPU state for save/restore at instruction boundaries.

use emu_core::Ticks;
use serde::{Deserialize, Serialize};

use crate::registers::Registers;

/// Pin levels and latched requests of the interrupt unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptState {
    /// Pin levels, one bit per level (bit 1 is never set).
    pub pins: u8,
    /// Latched requests for levels 0 and 1.
    pub latched: u8,
}

/// Complete CPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub regs: Registers,
    /// Words held on the hardware stack (0..=10).
    pub stack_depth: u8,
    pub interrupts: InterruptState,
    pub extend: bool,
    pub halted: bool,
    pub ticks: Ticks,
}

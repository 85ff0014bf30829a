//! Chip variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registers::{Action, Behavior, Probe, Readback, Register};
use crate::registers::{NAND_ADDRESS_HIGH, NAND_ADDRESS_LOW, NAND_COMMAND, NAND_READY, NAND_STATUS};

/// SoC variant. Both share the base register table; GPAC800 adds a NAND
/// controller block and moves chip-select space up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Gcm394,
    Gpac800,
}

const GPAC800_REGISTERS: &[(u16, Register)] = &[
    (NAND_STATUS, Register::new("nand status", Behavior::Status(Probe::NandStatus))),
    (
        NAND_COMMAND,
        Register::new(
            "nand command",
            Behavior::Trigger { action: Action::NandCommand, readback: Readback::Latch },
        ),
    ),
    (
        NAND_ADDRESS_LOW,
        Register::new(
            "flash address low",
            Behavior::Trigger { action: Action::NandAddressLow, readback: Readback::Latch },
        ),
    ),
    (
        NAND_ADDRESS_HIGH,
        Register::new(
            "flash address high",
            Behavior::Trigger { action: Action::NandAddressHigh, readback: Readback::Latch },
        ),
    ),
    (NAND_READY, Register::new("nand ready", Behavior::Status(Probe::NandReady))),
];

impl Variant {
    /// Word address where chip-select space starts in the linear bank space.
    #[must_use]
    pub const fn chip_select_base(self) -> u32 {
        match self {
            Variant::Gcm394 => 0x2_0000,
            Variant::Gpac800 => 0x3_0000,
        }
    }

    /// Registers this variant adds to (or overrides in) the base table.
    #[must_use]
    pub const fn extra_registers(self) -> &'static [(u16, Register)] {
        match self {
            Variant::Gcm394 => &[],
            Variant::Gpac800 => GPAC800_REGISTERS,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Variant::Gcm394 => "GCM394",
            Variant::Gpac800 => "GPAC800",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Peripheral register descriptors and the per-variant dispatch table.
//!
//! Every mapped offset carries one descriptor. The bank in [`crate::Gcm394`]
//! looks the offset up and acts on the descriptor's [`Behavior`]; there is no
//! per-register handler code.

use std::collections::BTreeMap;

use crate::dma::{DMA_CHANNELS, DMA_PARAMS};
use crate::variant::Variant;

/// First word of the peripheral window.
pub const WINDOW_START: u16 = 0x7000;
/// Words in the peripheral window.
pub const WINDOW_WORDS: usize = 0x1000;

/// Value read from an unmapped offset inside the window.
pub const UNMAPPED: u16 = 0x0000;

pub const WAIT_MODE: u16 = 0x780C;
pub const BOOT_MODE: u16 = 0x780F;
pub const BANK_SWITCH: u16 = 0x7810;
/// CS0 control; CS1..CS4 follow.
pub const CHIP_SELECT_CONTROL: u16 = 0x7820;
pub const PORT_A_DATA: u16 = 0x7860;
pub const PORT_A_BUFFER: u16 = 0x7861;
pub const PORT_C_DATA: u16 = 0x7868;
pub const PORT_B_DATA: u16 = 0x7870;
pub const PORT_B_BUFFER: u16 = 0x7871;
pub const NAND_STATUS: u16 = 0x7850;
pub const NAND_COMMAND: u16 = 0x7851;
pub const NAND_ADDRESS_LOW: u16 = 0x7852;
pub const NAND_ADDRESS_HIGH: u16 = 0x7853;
pub const NAND_READY: u16 = 0x7854;
pub const IRQ_STATUS: u16 = 0x78A0;
pub const IRQ_MASKED: u16 = 0x78A1;
pub const IRQ_ENABLE: u16 = 0x78A4;
pub const TOGGLE_STATUS: u16 = 0x78FB;
pub const DMA_STATUS: u16 = 0x7A35;
pub const BUS_NOISE: u16 = 0x7A3A;
pub const DMA_TRIGGER: u16 = 0x7ABE;

/// True if `address` falls inside the peripheral window.
#[must_use]
pub const fn in_window(address: u16) -> bool {
    address >= WINDOW_START && (address - WINDOW_START) < WINDOW_WORDS as u16
}

/// Side effect of writing a trigger register. The written value is always
/// latched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Latch only.
    None,
    /// Ask the CPU to enter wait mode.
    WaitMode,
    /// Select the bank shown at CPU 0x8000..0xFFFF.
    BankSwitch,
    /// Recompute chip-select regions after CS`n` control changed.
    ChipSelect(u8),
    /// Drive port A outputs.
    PortAOutput,
    /// Write-one-to-clear latched interrupt sources.
    IrqClear,
    /// Replace the interrupt enable mask.
    IrqEnable,
    DmaParam { channel: u8, slot: u8 },
    DmaTrigger,
    NandCommand,
    NandAddressLow,
    /// Commits the 32-bit flash address.
    NandAddressHigh,
}

/// Where the value of a read comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    BootMode,
    /// Bit 8 flips on every read.
    Toggle,
    /// Busy and rejected bits, cleared by the read.
    DmaStatus,
    /// Undriven data bus.
    BusNoise,
    PortAInput,
    PortBInput,
    /// Reads another offset's latch.
    Mirror(u16),
    /// Constant value.
    Fixed(u16),
    IrqPending,
    IrqMasked,
    DmaParam { channel: u8, slot: u8 },
    NandStatus,
    /// Ready line; bit 0 flips on every poll.
    NandReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readback {
    /// Last value written.
    Latch,
    Probe(Probe),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Reads return the last value written.
    Storage,
    /// Writes have a side effect.
    Trigger { action: Action, readback: Readback },
    /// Reads are computed; writes are ignored.
    Status(Probe),
}

/// Descriptor of one peripheral register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub behavior: Behavior,
}

impl Register {
    #[must_use]
    pub const fn new(name: &'static str, behavior: Behavior) -> Self {
        Self { name, behavior }
    }

    const fn storage(name: &'static str) -> Self {
        Self::new(name, Behavior::Storage)
    }

    const fn trigger(name: &'static str, action: Action) -> Self {
        Self::new(name, Behavior::Trigger { action, readback: Readback::Latch })
    }

    const fn input(name: &'static str, action: Action, probe: Probe) -> Self {
        Self::new(name, Behavior::Trigger { action, readback: Readback::Probe(probe) })
    }

    const fn status(name: &'static str, probe: Probe) -> Self {
        Self::new(name, Behavior::Status(probe))
    }
}

const BASE_REGISTERS: &[(u16, Register)] = &[
    (0x7803, Register::storage("control 7803")),
    (0x7807, Register::storage("control 7807")),
    (WAIT_MODE, Register::trigger("wait mode entry", Action::WaitMode)),
    (BOOT_MODE, Register::status("boot mode", Probe::BootMode)),
    (BANK_SWITCH, Register::trigger("bank switch", Action::BankSwitch)),
    (0x7816, Register::storage("control 7816")),
    (0x7817, Register::storage("control 7817")),
    (0x7819, Register::storage("control 7819")),
    (CHIP_SELECT_CONTROL, Register::trigger("cs0 control", Action::ChipSelect(0))),
    (CHIP_SELECT_CONTROL + 1, Register::trigger("cs1 control", Action::ChipSelect(1))),
    (CHIP_SELECT_CONTROL + 2, Register::trigger("cs2 control", Action::ChipSelect(2))),
    (CHIP_SELECT_CONTROL + 3, Register::trigger("cs3 control", Action::ChipSelect(3))),
    (CHIP_SELECT_CONTROL + 4, Register::trigger("cs4 control", Action::ChipSelect(4))),
    (0x782D, Register::storage("control 782d")),
    (0x7835, Register::storage("control 7835")),
    (PORT_A_DATA, Register::input("port a data", Action::PortAOutput, Probe::PortAInput)),
    (PORT_A_BUFFER, Register::status("port a buffer", Probe::Mirror(PORT_A_DATA))),
    (0x7862, Register::storage("port a direction")),
    (0x7863, Register::storage("port a attribute")),
    (PORT_C_DATA, Register::status("port c data", Probe::Fixed(0))),
    (PORT_B_DATA, Register::input("port b data", Action::None, Probe::PortBInput)),
    (PORT_B_BUFFER, Register::status("port b buffer", Probe::Mirror(PORT_B_DATA))),
    (0x7872, Register::storage("port b direction")),
    (0x7873, Register::storage("port b attribute")),
    (0x7882, Register::storage("control 7882")),
    (0x7883, Register::storage("control 7883")),
    (IRQ_STATUS, Register::input("irq status", Action::IrqClear, Probe::IrqPending)),
    (IRQ_MASKED, Register::status("irq pending and enabled", Probe::IrqMasked)),
    (IRQ_ENABLE, Register::trigger("irq enable", Action::IrqEnable)),
    (0x78A5, Register::storage("control 78a5")),
    (0x78A6, Register::storage("control 78a6")),
    (0x78A8, Register::storage("control 78a8")),
    (0x78B0, Register::storage("timer control 78b0")),
    (0x78B1, Register::storage("timer control 78b1")),
    (0x78B2, Register::storage("timer control 78b2")),
    (0x78B8, Register::storage("timer control 78b8")),
    (0x78F0, Register::storage("control 78f0")),
    (TOGGLE_STATUS, Register::status("toggling status", Probe::Toggle)),
    (0x7934, Register::storage("control 7934")),
    (0x7935, Register::storage("control 7935")),
    (0x7936, Register::storage("control 7936")),
    (0x7960, Register::storage("control 7960")),
    (0x7961, Register::storage("control 7961")),
    (DMA_STATUS, Register::status("dma status", Probe::DmaStatus)),
    (BUS_NOISE, Register::status("undriven status", Probe::BusNoise)),
    (DMA_TRIGGER, Register::trigger("dma trigger", Action::DmaTrigger)),
];

/// Offset → descriptor map for one variant.
#[derive(Debug, Clone)]
pub struct RegisterTable {
    registers: BTreeMap<u16, Register>,
}

impl RegisterTable {
    /// Base table with the variant's table merged over it.
    #[must_use]
    pub fn for_variant(variant: Variant) -> Self {
        let mut registers: BTreeMap<u16, Register> = BASE_REGISTERS.iter().copied().collect();
        for channel in 0..DMA_CHANNELS as u8 {
            for slot in 0..2 {
                let offset = DMA_PARAMS + u16::from(channel) * 2 + u16::from(slot);
                let name = if slot == 0 { "dma address" } else { "dma length" };
                registers.insert(
                    offset,
                    Register::input(
                        name,
                        Action::DmaParam { channel, slot },
                        Probe::DmaParam { channel, slot },
                    ),
                );
            }
        }
        registers.extend(variant.extra_registers().iter().copied());
        Self { registers }
    }

    #[must_use]
    pub fn get(&self, offset: u16) -> Option<&Register> {
        self.registers.get(&offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Register)> {
        self.registers.iter().map(|(&offset, register)| (offset, register))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

//! SunPlus GCM394 / GeneralPlus GPAC800 peripheral fabric.
//!
//! The SoC decodes a 4K-word register window into storage, trigger and
//! status registers. Trigger writes drive the chip-select router, the
//! seven-channel system DMA, wait mode and the port pins; peripheral
//! interrupts are folded into one request line for the CPU.
//!
//! # Registers (0x7000..0x7FFF)
//!
//! | Offset          | Name               | Notes                                   |
//! |-----------------|--------------------|-----------------------------------------|
//! | 0x780C          | wait mode          | write halts the CPU                     |
//! | 0x780F          | boot mode          | strap pins latched at reset             |
//! | 0x7810          | bank switch        | bits 0..5 select the 0x8000-word bank   |
//! | 0x7820..0x7824  | CS0..CS4 control   | bits 8..15: size in 64K words, minus 1  |
//! | 0x7850..0x7854  | NAND (GPAC800)     | status, command, address low/high, ready|
//! | 0x7860 / 0x7870 | port A / port B    | read pins, write latch                  |
//! | 0x78A0          | irq status         | read pending, write 1 to clear          |
//! | 0x78A1          | irq masked         | pending and enabled                     |
//! | 0x78A4          | irq enable         |                                         |
//! | 0x78FB          | status             | bit 8 toggles per read                  |
//! | 0x7A35          | DMA status         | busy 0..6, rejected 8..14, read clears  |
//! | 0x7A3A          | undriven status    | see [`BusNoise`]                        |
//! | 0x7A80..0x7A8D  | DMA parameters     | channel c word s at 0x7A80 + 2c + s     |
//! | 0x7ABE          | DMA trigger        | bits 0..2 channel, bit 8 to flash       |
//!
//! Other mapped offsets are plain storage. Unmapped offsets read 0.

mod chip_select;
mod dma;
mod error;
mod irq;
mod nand;
mod noise;
pub mod registers;
mod soc;
mod state;
mod variant;

pub use chip_select::{ChipSelectRegion, ChipSelectRouter, RemapCallback, CHIP_SELECTS};
pub use dma::{
    Direction, DmaChannel, DmaController, DmaState, Memory, TriggerOutcome, DMA_CHANNELS,
    DMA_PARAMS, TO_FLASH,
};
pub use error::ConfigError;
pub use irq::{AggregatorState, InterruptAggregator, IrqSources, SPURIOUS_VECTOR};
pub use nand::{FlashImage, FlashInterface, NandController, NandState, ERASED};
pub use noise::BusNoise;
pub use soc::{Gcm394, Gcm394Builder, MappingWrite, PortInput, PortOutput};
pub use state::SocState;
pub use variant::Variant;

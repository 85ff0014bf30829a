//! Serializable SoC state.

use serde::{Deserialize, Serialize};

use crate::chip_select::CHIP_SELECTS;
use crate::dma::DmaState;
use crate::irq::AggregatorState;
use crate::nand::NandState;
use crate::variant::Variant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocState {
    pub variant: Variant,
    /// Latched register values for the whole window, indexed from 0x7000.
    pub latches: Vec<u16>,
    pub dma: DmaState,
    pub chip_select_base: u32,
    pub chip_select: [u16; CHIP_SELECTS],
    pub bank: u16,
    pub nand: NandState,
    pub irq: AggregatorState,
    pub boot_mode: u8,
    pub wait_request: bool,
    pub toggle: u16,
    /// Bus noise values drawn so far, to resume a seeded sequence.
    pub noise_draws: u64,
}

//! External flash access and the GPAC800 NAND controller registers.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Word-addressed external flash, supplied by the owning system.
pub trait FlashInterface {
    fn read_word(&mut self, address: u32) -> u16;
    fn write_word(&mut self, address: u32, value: u16);
}

/// Erased flash reads as all ones.
pub const ERASED: u16 = 0xFFFF;

/// Flash backed by an in-memory image. Reads past the end return [`ERASED`];
/// writes past the end are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashImage {
    words: Vec<u16>,
}

impl FlashImage {
    #[must_use]
    pub fn new(words: Vec<u16>) -> Self {
        Self { words }
    }

    /// Image from little-endian bytes. A trailing odd byte is padded with 0xFF.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0xFF)]))
            .collect();
        Self { words }
    }

    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }
}

impl FlashInterface for FlashImage {
    fn read_word(&mut self, address: u32) -> u16 {
        self.words.get(address as usize).copied().unwrap_or(ERASED)
    }

    fn write_word(&mut self, address: u32, value: u16) {
        if let Some(word) = self.words.get_mut(address as usize) {
            *word = value;
        }
    }
}

/// NAND status bit 0: controller ready.
const READY: u16 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NandState {
    pub command: u16,
    pub address_low: u16,
    pub address_high: u16,
    /// Committed flash address, advanced by DMA.
    pub address: u32,
    pub ready_line: bool,
}

/// Flash address and command latches.
///
/// Present on every variant so DMA always has a flash address; only GPAC800
/// maps the registers that change it.
#[derive(Debug, Default)]
pub struct NandController {
    state: NandState,
}

impl NandController {
    pub fn command(&mut self, value: u16) {
        trace!(command = format_args!("{value:#06x}"), "nand command");
        self.state.command = value;
    }

    pub fn address_low(&mut self, value: u16) {
        self.state.address_low = value;
    }

    /// The high half commits both halves.
    pub fn address_high(&mut self, value: u16) {
        self.state.address_high = value;
        self.state.address = u32::from(value) << 16 | u32::from(self.state.address_low);
        trace!(address = format_args!("{:#x}", self.state.address), "flash address set");
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        (self.state.command & 0xFF) << 8 | READY
    }

    /// Poll the ready line, which alternates on every read.
    pub fn poll_ready(&mut self) -> u16 {
        self.state.ready_line = !self.state.ready_line;
        u16::from(self.state.ready_line)
    }

    #[must_use]
    pub fn address(&self) -> u32 {
        self.state.address
    }

    pub fn address_mut(&mut self) -> &mut u32 {
        &mut self.state.address
    }

    pub fn reset(&mut self) {
        self.state = NandState::default();
    }

    #[must_use]
    pub fn save(&self) -> NandState {
        self.state
    }

    pub fn restore(&mut self, state: &NandState) {
        self.state = *state;
    }
}

//! System DMA controller.
//!
//! Seven channels move blocks between the CPU address space and external
//! flash. A channel's two parameter words are the memory word address and
//! the length in words. Writing the trigger register names the channel in
//! bits 0..2 and the direction in bit 8.
//!
//! Transfers complete synchronously inside the trigger write. The channel
//! then stays busy until software reads the status register; a trigger
//! aimed at a busy channel is rejected and recorded in the status register.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::nand::FlashInterface;

pub const DMA_CHANNELS: usize = 7;

/// Channel 0 word 0; channel `c` word `s` is at `DMA_PARAMS + 2c + s`.
pub const DMA_PARAMS: u16 = 0x7A80;

/// Trigger bit 8: copy memory to flash instead of flash to memory.
pub const TO_FLASH: u16 = 1 << 8;

/// Status register: rejected bits sit above the busy bits.
const REJECTED_SHIFT: u16 = 8;

/// The CPU address space as seen by the DMA engine.
pub trait Memory {
    fn read_word(&mut self, address: u16) -> u16;
    fn write_word(&mut self, address: u16, value: u16);
}

impl Memory for emu_core::SimpleBus {
    fn read_word(&mut self, address: u16) -> u16 {
        emu_core::Bus::read(self, address)
    }

    fn write_word(&mut self, address: u16, value: u16) {
        emu_core::Bus::write(self, address, value);
    }
}

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    FlashToMemory,
    MemoryToFlash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaChannel {
    /// Word 0: memory address. Word 1: length in words.
    pub params: [u16; 2],
    pub busy: bool,
}

/// Result of a trigger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed { channel: u8, words: u16 },
    Rejected { channel: u8 },
    NoSuchChannel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaState {
    pub channels: [DmaChannel; DMA_CHANNELS],
    /// One bit per channel whose last trigger was rejected.
    pub rejected: u8,
}

#[derive(Debug, Default)]
pub struct DmaController {
    channels: [DmaChannel; DMA_CHANNELS],
    rejected: u8,
}

impl DmaController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store parameter word `slot` of `channel`. Out-of-range indices are
    /// ignored.
    pub fn write_param(&mut self, channel: usize, slot: usize, value: u16) {
        if let Some(word) = self.channels.get_mut(channel).and_then(|c| c.params.get_mut(slot)) {
            *word = value;
        }
    }

    #[must_use]
    pub fn read_param(&self, channel: usize, slot: usize) -> u16 {
        self.channels
            .get(channel)
            .and_then(|c| c.params.get(slot))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn channel(&self, channel: usize) -> Option<&DmaChannel> {
        self.channels.get(channel)
    }

    /// Status word without the read side effect: busy in bits 0..6,
    /// rejected in bits 8..14.
    #[must_use]
    pub fn status(&self) -> u16 {
        let busy = self
            .channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.busy)
            .fold(0u16, |bits, (i, _)| bits | 1 << i);
        busy | u16::from(self.rejected) << REJECTED_SHIFT
    }

    /// Read the status register, clearing busy and rejected bits.
    pub fn take_status(&mut self) -> u16 {
        let status = self.status();
        for channel in &mut self.channels {
            channel.busy = false;
        }
        self.rejected = 0;
        status
    }

    /// Handle a write to the trigger register.
    ///
    /// `flash_address` is where the transfer starts in flash; it advances by
    /// the number of words moved.
    pub fn trigger(
        &mut self,
        value: u16,
        memory: &mut dyn Memory,
        flash: &mut dyn FlashInterface,
        flash_address: &mut u32,
    ) -> TriggerOutcome {
        let index = usize::from(value & 7);
        let Some(channel) = self.channels.get_mut(index) else {
            warn!(value = format_args!("{value:#06x}"), "dma trigger names no channel");
            return TriggerOutcome::NoSuchChannel;
        };
        let id = index as u8;
        if channel.busy {
            warn!(channel = id, "dma trigger on busy channel rejected");
            self.rejected |= 1 << id;
            return TriggerOutcome::Rejected { channel: id };
        }

        let direction = if value & TO_FLASH != 0 {
            Direction::MemoryToFlash
        } else {
            Direction::FlashToMemory
        };
        let [address, length] = channel.params;
        for i in 0..length {
            let memory_address = address.wrapping_add(i);
            let flash_word = flash_address.wrapping_add(u32::from(i));
            match direction {
                Direction::FlashToMemory => {
                    let word = flash.read_word(flash_word);
                    memory.write_word(memory_address, word);
                }
                Direction::MemoryToFlash => {
                    let word = memory.read_word(memory_address);
                    flash.write_word(flash_word, word);
                }
            }
        }
        debug!(
            channel = id,
            ?direction,
            address = format_args!("{address:#06x}"),
            flash = format_args!("{:#x}", *flash_address),
            length,
            "dma complete"
        );
        *flash_address = flash_address.wrapping_add(u32::from(length));
        channel.busy = true;
        TriggerOutcome::Completed { channel: id, words: length }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn save(&self) -> DmaState {
        DmaState {
            channels: self.channels,
            rejected: self.rejected,
        }
    }

    pub fn restore(&mut self, state: &DmaState) {
        self.channels = state.channels;
        self.rejected = state.rejected & 0x7F;
    }
}

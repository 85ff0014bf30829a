//! CPU address space.
//!
//! | CPU range       | Contents                                        |
//! |-----------------|-------------------------------------------------|
//! | 0x0000..0x6FFF  | internal RAM                                    |
//! | 0x7000..0x7FFF  | SoC peripheral window                           |
//! | 0x8000..0xFFFF  | banked: linear = bank * 0x8000 + (addr - 0x8000)|
//!
//! Linear addresses below the chip-select base come from the internal ROM;
//! from the base up they are chip-select space.

use tracing::{debug, trace};

use emu_core::Bus;
use sunplus_gcm394::registers::in_window;
use sunplus_gcm394::{Gcm394, Memory, SocState};

pub const RAM_WORDS: usize = 0x7000;
pub const BANK_START: u16 = 0x8000;
pub const BANK_WORDS: u32 = 0x8000;

/// Read from linear space that nothing backs.
pub const OPEN_BUS: u16 = 0x0000;

/// Handler table for CPU levels 0..5.
pub const LEVEL_VECTORS: u16 = 0xFFF0;
/// Handler table indexed by aggregator vector, used for level 2.
pub const SOC_VECTORS: u16 = 0xFFF8;

const SOC_LEVEL: u8 = 2;

const CACHE_LINES: usize = 1024;

/// Direct-mapped instruction fetch cache.
///
/// Tags combine the CPU address with the bank it was fetched through, so a
/// bank switch cannot serve stale words.
#[derive(Debug)]
struct FetchCache {
    lines: Box<[Option<(u32, u16)>]>,
    hits: u64,
    misses: u64,
}

impl FetchCache {
    fn new() -> Self {
        Self {
            lines: vec![None; CACHE_LINES].into_boxed_slice(),
            hits: 0,
            misses: 0,
        }
    }

    fn index(address: u16) -> usize {
        usize::from(address) % CACHE_LINES
    }

    fn tag(address: u16, bank: u16) -> u32 {
        u32::from(bank) << 16 | u32::from(address)
    }

    fn lookup(&mut self, address: u16, bank: u16) -> Option<u16> {
        let tag = Self::tag(address, bank);
        match self.lines[Self::index(address)] {
            Some((line_tag, word)) if line_tag == tag => {
                self.hits += 1;
                Some(word)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    fn fill(&mut self, address: u16, bank: u16, word: u16) {
        self.lines[Self::index(address)] = Some((Self::tag(address, bank), word));
    }

    fn invalidate(&mut self, address: u16) {
        self.lines[Self::index(address)] = None;
    }

    fn flush(&mut self) {
        self.lines.fill(None);
    }
}

/// Linear bank space: internal ROM below the chip-select base, chip-select
/// space above it.
#[derive(Debug)]
pub(crate) struct LinearSpace {
    pub(crate) rom: Vec<u16>,
    pub(crate) external: Vec<u16>,
    pub(crate) base: u32,
}

impl LinearSpace {
    fn read(&self, linear: u32) -> u16 {
        if linear < self.base {
            self.rom.get(linear as usize).copied().unwrap_or(OPEN_BUS)
        } else {
            self.external.get((linear - self.base) as usize).copied().unwrap_or(OPEN_BUS)
        }
    }

    fn write(&mut self, linear: u32, value: u16) {
        if linear < self.base {
            debug!(linear = format_args!("{linear:#x}"), "write to internal rom ignored");
            return;
        }
        match self.external.get_mut((linear - self.base) as usize) {
            Some(word) => *word = value,
            None => debug!(linear = format_args!("{linear:#x}"), "write past chip-select space"),
        }
    }
}

fn linear(bank: u16, address: u16) -> u32 {
    u32::from(bank) * BANK_WORDS + u32::from(address - BANK_START)
}

/// RAM and banked space as seen by SoC DMA, which cannot reach the
/// peripheral window.
struct DmaView<'a> {
    ram: &'a mut [u16],
    linear: &'a mut LinearSpace,
    bank: u16,
}

impl Memory for DmaView<'_> {
    fn read_word(&mut self, address: u16) -> u16 {
        match address {
            a if in_window(a) => OPEN_BUS,
            a if a >= BANK_START => self.linear.read(linear(self.bank, a)),
            a => self.ram[usize::from(a)],
        }
    }

    fn write_word(&mut self, address: u16, value: u16) {
        match address {
            a if in_window(a) => {
                debug!(address = format_args!("{a:#06x}"), "dma into peripheral window dropped");
            }
            a if a >= BANK_START => self.linear.write(linear(self.bank, a), value),
            a => self.ram[usize::from(a)] = value,
        }
    }
}

/// The system bus: owns RAM, the linear space and the SoC.
pub struct SystemBus {
    ram: Box<[u16]>,
    linear: LinearSpace,
    soc: Gcm394,
    cache: FetchCache,
}

impl SystemBus {
    pub(crate) fn new(soc: Gcm394, rom: Vec<u16>, external_words: usize) -> Self {
        let base = soc.chip_select_base();
        Self {
            ram: vec![0; RAM_WORDS].into_boxed_slice(),
            linear: LinearSpace {
                rom,
                external: vec![0; external_words],
                base,
            },
            soc,
            cache: FetchCache::new(),
        }
    }

    #[must_use]
    pub fn soc(&self) -> &Gcm394 {
        &self.soc
    }

    /// Direct SoC access. Flushes the fetch cache, since register writes
    /// may remap memory.
    pub fn soc_mut(&mut self) -> &mut Gcm394 {
        self.cache.flush();
        &mut self.soc
    }

    /// Drive the aggregator's video line. Leaves the fetch cache alone.
    pub fn set_video_irq(&mut self, level: bool) {
        self.soc.set_video_irq(level);
    }

    pub fn set_audio_irq(&mut self, level: bool) {
        self.soc.set_audio_irq(level);
    }

    /// Read without side effects. Window offsets return their latch.
    #[must_use]
    pub fn peek(&self, address: u16) -> u16 {
        match address {
            a if in_window(a) => self.soc.latch(a),
            a if a >= BANK_START => self.linear.read(linear(self.soc.bank(), a)),
            a => self.ram[usize::from(a)],
        }
    }

    /// Copy words into RAM and banked space through the current bank.
    /// Window addresses are skipped.
    pub fn load(&mut self, address: u16, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            let a = address.wrapping_add(i as u16);
            if !in_window(a) {
                self.store(a, word);
            }
        }
        self.cache.flush();
    }

    /// Copy words into chip-select space at `offset` words past the base.
    pub fn load_external(&mut self, offset: usize, words: &[u16]) {
        for (slot, &word) in self.linear.external.iter_mut().skip(offset).zip(words) {
            *slot = word;
        }
        self.cache.flush();
    }

    #[must_use]
    pub fn ram(&self) -> &[u16] {
        &self.ram
    }

    #[must_use]
    pub fn external(&self) -> &[u16] {
        &self.linear.external
    }

    /// Fetch cache hit and miss counts.
    #[must_use]
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits, self.cache.misses)
    }

    fn store(&mut self, address: u16, value: u16) {
        if address >= BANK_START {
            self.linear.write(linear(self.soc.bank(), address), value);
        } else {
            self.ram[usize::from(address)] = value;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.soc.reset();
        self.cache.flush();
    }

    pub(crate) fn save_soc(&self) -> SocState {
        self.soc.save_state()
    }

    pub(crate) fn restore(&mut self, soc: &SocState, ram: &[u16], external: &[u16]) {
        self.soc.restore_state(soc);
        self.ram.copy_from_slice(ram);
        self.linear.external.copy_from_slice(external);
        self.cache.flush();
    }
}

impl Bus for SystemBus {
    fn read(&mut self, address: u16) -> u16 {
        match address {
            a if in_window(a) => self.soc.read(a),
            a if a >= BANK_START => self.linear.read(linear(self.soc.bank(), a)),
            a => self.ram[usize::from(a)],
        }
    }

    fn write(&mut self, address: u16, value: u16) {
        if in_window(address) {
            let mut view = DmaView {
                ram: &mut self.ram,
                linear: &mut self.linear,
                bank: self.soc.bank(),
            };
            self.soc.write(address, value, &mut view);
            self.cache.flush();
        } else {
            self.store(address, value);
            self.cache.invalidate(address);
        }
    }

    fn fetch(&mut self, address: u16) -> u16 {
        if in_window(address) {
            return self.read(address);
        }
        let bank = if address >= BANK_START { self.soc.bank() } else { 0 };
        if let Some(word) = self.cache.lookup(address, bank) {
            return word;
        }
        let word = self.read(address);
        self.cache.fill(address, bank, word);
        word
    }

    fn acknowledge(&mut self, level: u8) -> u16 {
        let table = if level == SOC_LEVEL && self.soc.irq_line() {
            SOC_VECTORS + self.soc.irq_vector()
        } else {
            LEVEL_VECTORS + u16::from(level)
        };
        let handler = self.read(table);
        trace!(
            level,
            table = format_args!("{table:#06x}"),
            handler = format_args!("{handler:#06x}"),
            "interrupt acknowledge"
        );
        handler
    }

    fn irq_lines(&mut self) -> u8 {
        u8::from(self.soc.irq_line()) << SOC_LEVEL
    }

    fn take_wait_request(&mut self) -> bool {
        self.soc.take_wait_request()
    }

    fn stack_fault(&mut self) {
        self.soc.raise_internal();
    }
}

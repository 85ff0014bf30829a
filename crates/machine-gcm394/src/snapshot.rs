//! Save states.
//!
//! Binary layout, all little-endian, in order:
//!
//! - magic `G394`, version u16
//! - variants: SoC u8, CPU u8
//! - PC, FR, AC0..AC3 as u16; SP u8; STK0..STK9 as u16
//! - register latches: 4096 u16 words for 0x7000..0x7FFF
//! - DMA channels 0..6: address u16, length u16, busy u8; then rejected u8
//! - chip select: base u32, CS0..CS4 control u16
//! - CPU extension: depth u8, pins u8, latched u8, halted u8, extend u8,
//!   ticks u64
//! - SoC extension: bank u16; NAND command, address low and high u16,
//!   address u32, ready u8; aggregator lines, latched and enabled u16;
//!   boot u8, wait u8, toggle u16, noise draws u64
//! - RAM: u32 count, then words
//! - chip-select space: u32 count, then words

use serde::{Deserialize, Serialize};

use emu_core::Ticks;
use national_pace::{CpuState, InterruptState, Registers, STACK_DEPTH};
use sunplus_gcm394::registers::WINDOW_WORDS;
use sunplus_gcm394::{
    AggregatorState, DmaChannel, DmaState, IrqSources, NandState, SocState, CHIP_SELECTS,
    DMA_CHANNELS,
};

use crate::error::SnapshotError;

const MAGIC: &[u8; 4] = b"G394";
const VERSION: u16 = 1;

/// Everything needed to resume a system at an instruction boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub cpu_variant: national_pace::Variant,
    pub cpu: CpuState,
    pub soc: SocState,
    pub ram: Vec<u16>,
    pub external: Vec<u16>,
}

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn bool(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn words(&mut self, words: &[u16]) {
        for &word in words {
            self.u16(word);
        }
    }

    fn counted(&mut self, words: &[u16]) {
        self.u32(words.len() as u32);
        self.words(words);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SnapshotError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(SnapshotError::Truncated(self.pos))?;
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.array::<1>()?[0])
    }

    fn bool(&mut self) -> Result<bool, SnapshotError> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> Result<u16, SnapshotError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, SnapshotError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, SnapshotError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn words(&mut self, count: usize) -> Result<Vec<u16>, SnapshotError> {
        (0..count).map(|_| self.u16()).collect()
    }

    fn counted(&mut self) -> Result<Vec<u16>, SnapshotError> {
        let count = self.u32()? as usize;
        if self.data.len().saturating_sub(self.pos) < count * 2 {
            return Err(SnapshotError::Truncated(self.pos));
        }
        self.words(count)
    }
}

fn soc_tag(variant: sunplus_gcm394::Variant) -> u8 {
    match variant {
        sunplus_gcm394::Variant::Gcm394 => 0,
        sunplus_gcm394::Variant::Gpac800 => 1,
    }
}

fn cpu_tag(variant: national_pace::Variant) -> u8 {
    match variant {
        national_pace::Variant::Pace => 0,
        national_pace::Variant::Ins8900 => 1,
    }
}

/// Encode a state in the binary snapshot layout.
#[must_use]
pub fn encode(state: &SystemState) -> Vec<u8> {
    let mut w = Writer { bytes: Vec::new() };
    w.bytes.extend_from_slice(MAGIC);
    w.u16(VERSION);
    w.u8(soc_tag(state.soc.variant));
    w.u8(cpu_tag(state.cpu_variant));

    let regs = &state.cpu.regs;
    w.u16(regs.pc);
    w.u16(regs.fr);
    w.words(&regs.ac);
    w.u8(regs.sp);
    w.words(&regs.stk);

    let soc = &state.soc;
    let mut latches = soc.latches.clone();
    latches.resize(WINDOW_WORDS, 0);
    w.words(&latches);

    for channel in &soc.dma.channels {
        w.words(&channel.params);
        w.bool(channel.busy);
    }
    w.u8(soc.dma.rejected);

    w.u32(soc.chip_select_base);
    w.words(&soc.chip_select);

    let cpu = &state.cpu;
    w.u8(cpu.stack_depth);
    w.u8(cpu.interrupts.pins);
    w.u8(cpu.interrupts.latched);
    w.bool(cpu.halted);
    w.bool(cpu.extend);
    w.u64(cpu.ticks.get());

    w.u16(soc.bank);
    w.u16(soc.nand.command);
    w.u16(soc.nand.address_low);
    w.u16(soc.nand.address_high);
    w.u32(soc.nand.address);
    w.bool(soc.nand.ready_line);
    w.u16(soc.irq.lines.bits());
    w.u16(soc.irq.latched.bits());
    w.u16(soc.irq.enabled.bits());
    w.u8(soc.boot_mode);
    w.bool(soc.wait_request);
    w.u16(soc.toggle);
    w.u64(soc.noise_draws);

    w.counted(&state.ram);
    w.counted(&state.external);
    w.bytes
}

/// Decode a binary snapshot.
///
/// # Errors
///
/// Fails on a wrong magic or version, unknown variant tags, truncation or
/// trailing data.
pub fn decode(data: &[u8]) -> Result<SystemState, SnapshotError> {
    let mut r = Reader { data, pos: 0 };
    if r.take(MAGIC.len())? != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let soc_variant = match r.u8()? {
        0 => sunplus_gcm394::Variant::Gcm394,
        1 => sunplus_gcm394::Variant::Gpac800,
        tag => return Err(SnapshotError::UnknownTag { what: "soc variant", tag }),
    };
    let cpu_variant = match r.u8()? {
        0 => national_pace::Variant::Pace,
        1 => national_pace::Variant::Ins8900,
        tag => return Err(SnapshotError::UnknownTag { what: "cpu variant", tag }),
    };

    let pc = r.u16()?;
    let fr = r.u16()?;
    let mut ac = [0; 4];
    for slot in &mut ac {
        *slot = r.u16()?;
    }
    let sp = r.u8()?;
    let mut stk = [0; STACK_DEPTH];
    for slot in &mut stk {
        *slot = r.u16()?;
    }
    let regs = Registers { pc, fr, ac, sp, stk };

    let latches = r.words(WINDOW_WORDS)?;

    let mut channels = [DmaChannel::default(); DMA_CHANNELS];
    for channel in &mut channels {
        channel.params = [r.u16()?, r.u16()?];
        channel.busy = r.bool()?;
    }
    let dma = DmaState { channels, rejected: r.u8()? };

    let chip_select_base = r.u32()?;
    let mut chip_select = [0; CHIP_SELECTS];
    for control in &mut chip_select {
        *control = r.u16()?;
    }

    let cpu = CpuState {
        regs,
        stack_depth: r.u8()?,
        interrupts: InterruptState { pins: r.u8()?, latched: r.u8()? },
        halted: r.bool()?,
        extend: r.bool()?,
        ticks: Ticks::new(r.u64()?),
    };

    let bank = r.u16()?;
    let nand = NandState {
        command: r.u16()?,
        address_low: r.u16()?,
        address_high: r.u16()?,
        address: r.u32()?,
        ready_line: r.bool()?,
    };
    let irq = AggregatorState {
        lines: IrqSources::from_bits_truncate(r.u16()?),
        latched: IrqSources::from_bits_truncate(r.u16()?),
        enabled: IrqSources::from_bits_truncate(r.u16()?),
    };
    let soc = SocState {
        variant: soc_variant,
        latches,
        dma,
        chip_select_base,
        chip_select,
        bank,
        nand,
        irq,
        boot_mode: r.u8()?,
        wait_request: r.bool()?,
        toggle: r.u16()?,
        noise_draws: r.u64()?,
    };

    let ram = r.counted()?;
    let external = r.counted()?;
    let trailing = data.len() - r.pos;
    if trailing != 0 {
        return Err(SnapshotError::TrailingBytes(trailing));
    }

    Ok(SystemState { cpu_variant, cpu, soc, ram, external })
}

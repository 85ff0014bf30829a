//! The SoC peripheral bank and its builder.

use tracing::{debug, trace};

use emu_core::{Observable, Value};

use crate::chip_select::{ChipSelectRegion, ChipSelectRouter, RemapCallback, CHIP_SELECTS};
use crate::dma::{DmaController, Memory, TriggerOutcome};
use crate::error::ConfigError;
use crate::irq::{InterruptAggregator, IrqSources};
use crate::nand::{FlashInterface, NandController};
use crate::noise::{BusNoise, NoiseSource};
use crate::registers::{
    Action, Behavior, Probe, Readback, RegisterTable, UNMAPPED, WINDOW_START, WINDOW_WORDS,
};
use crate::state::SocState;
use crate::variant::Variant;

/// Port input pins.
pub type PortInput = Box<dyn FnMut() -> u16>;
/// Port output pins, called with the latched value.
pub type PortOutput = Box<dyn FnMut(u16)>;
/// Called with every value written to the bank-switch register.
pub type MappingWrite = Box<dyn FnMut(u16)>;

/// Bank-switch register: low six bits select the bank.
const BANK_MASK: u16 = 0x3F;

/// Collects collaborators for a [`Gcm394`].
pub struct Gcm394Builder {
    variant: Variant,
    port_a_input: Option<PortInput>,
    port_b_input: Option<PortInput>,
    port_a_output: Option<PortOutput>,
    chip_select: Option<RemapCallback>,
    mapping_write: Option<MappingWrite>,
    flash: Option<Box<dyn FlashInterface>>,
    boot_mode: u8,
    bus_noise: BusNoise,
}

impl Gcm394Builder {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            port_a_input: None,
            port_b_input: None,
            port_a_output: None,
            chip_select: None,
            mapping_write: None,
            flash: None,
            boot_mode: 0,
            bus_noise: BusNoise::default(),
        }
    }

    #[must_use]
    pub fn port_a_input(mut self, input: impl FnMut() -> u16 + 'static) -> Self {
        self.port_a_input = Some(Box::new(input));
        self
    }

    #[must_use]
    pub fn port_b_input(mut self, input: impl FnMut() -> u16 + 'static) -> Self {
        self.port_b_input = Some(Box::new(input));
        self
    }

    #[must_use]
    pub fn port_a_output(mut self, output: impl FnMut(u16) + 'static) -> Self {
        self.port_a_output = Some(Box::new(output));
        self
    }

    /// Chip-select remap notification.
    #[must_use]
    pub fn chip_select(
        mut self,
        remap: impl FnMut(&[ChipSelectRegion; CHIP_SELECTS]) + 'static,
    ) -> Self {
        self.chip_select = Some(Box::new(remap));
        self
    }

    /// Optional bank-switch notification.
    #[must_use]
    pub fn mapping_write(mut self, callback: impl FnMut(u16) + 'static) -> Self {
        self.mapping_write = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn flash(mut self, flash: impl FlashInterface + 'static) -> Self {
        self.flash = Some(Box::new(flash));
        self
    }

    /// Boot strap pins, sampled at reset.
    #[must_use]
    pub fn boot_mode(mut self, pins: u8) -> Self {
        self.boot_mode = pins;
        self
    }

    #[must_use]
    pub fn bus_noise(mut self, noise: BusNoise) -> Self {
        self.bus_noise = noise;
        self
    }

    /// Check the configuration and create the SoC.
    ///
    /// Call [`Gcm394::reset`] before use.
    pub fn build(self) -> Result<Gcm394, ConfigError> {
        if self.boot_mode > 3 {
            return Err(ConfigError::BootModeOutOfRange(self.boot_mode));
        }
        let port_a_input =
            self.port_a_input.ok_or(ConfigError::MissingCollaborator("port a input"))?;
        let port_b_input =
            self.port_b_input.ok_or(ConfigError::MissingCollaborator("port b input"))?;
        let port_a_output =
            self.port_a_output.ok_or(ConfigError::MissingCollaborator("port a output"))?;
        let remap = self.chip_select.ok_or(ConfigError::MissingCollaborator("chip select"))?;
        let flash = self.flash.ok_or(ConfigError::MissingCollaborator("flash"))?;

        Ok(Gcm394 {
            variant: self.variant,
            table: RegisterTable::for_variant(self.variant),
            latches: vec![0; WINDOW_WORDS].into_boxed_slice(),
            dma: DmaController::new(),
            chip_select: ChipSelectRouter::new(self.variant.chip_select_base(), remap),
            irq: InterruptAggregator::default(),
            nand: NandController::default(),
            noise: NoiseSource::new(self.bus_noise),
            flash,
            port_a_input,
            port_b_input,
            port_a_output,
            mapping_write: self.mapping_write,
            bank: 0,
            boot_pins: self.boot_mode,
            boot_mode: 0,
            wait_request: false,
            toggle: 0,
        })
    }
}

/// SunPlus GCM394 / GeneralPlus GPAC800 peripheral fabric.
///
/// Owns the register window at 0x7000..0x7FFF. All side effects happen
/// synchronously inside [`Gcm394::read`] and [`Gcm394::write`].
pub struct Gcm394 {
    variant: Variant,
    table: RegisterTable,
    latches: Box<[u16]>,
    dma: DmaController,
    chip_select: ChipSelectRouter,
    irq: InterruptAggregator,
    nand: NandController,
    noise: NoiseSource,
    flash: Box<dyn FlashInterface>,
    port_a_input: PortInput,
    port_b_input: PortInput,
    port_a_output: PortOutput,
    mapping_write: Option<MappingWrite>,
    bank: u16,
    /// Strap pin levels.
    boot_pins: u8,
    /// Strap value latched at the last reset.
    boot_mode: u8,
    wait_request: bool,
    toggle: u16,
}

impl Gcm394 {
    #[must_use]
    pub fn builder(variant: Variant) -> Gcm394Builder {
        Gcm394Builder::new(variant)
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterTable {
        &self.table
    }

    /// Window index of `offset`, if it is inside the window.
    fn slot(offset: u16) -> Option<usize> {
        let index = usize::from(offset.wrapping_sub(WINDOW_START));
        (index < WINDOW_WORDS).then_some(index)
    }

    /// Last value written to `offset`, without side effects.
    #[must_use]
    pub fn latch(&self, offset: u16) -> u16 {
        Self::slot(offset).map_or(UNMAPPED, |i| self.latches[i])
    }

    /// Read a peripheral register.
    pub fn read(&mut self, offset: u16) -> u16 {
        let Some(register) = self.table.get(offset).copied() else {
            debug!(offset = format_args!("{offset:#06x}"), "read of unmapped register");
            return UNMAPPED;
        };
        let value = match register.behavior {
            Behavior::Storage | Behavior::Trigger { readback: Readback::Latch, .. } => {
                self.latch(offset)
            }
            Behavior::Trigger {
                readback: Readback::Probe(probe),
                ..
            }
            | Behavior::Status(probe) => self.probe(probe),
        };
        trace!(
            offset = format_args!("{offset:#06x}"),
            name = register.name,
            value = format_args!("{value:#06x}"),
            "register read"
        );
        value
    }

    fn probe(&mut self, probe: Probe) -> u16 {
        match probe {
            Probe::BootMode => u16::from(self.boot_mode),
            Probe::Toggle => {
                self.toggle ^= 0x0100;
                self.toggle
            }
            Probe::DmaStatus => self.dma.take_status(),
            Probe::BusNoise => self.noise.next(),
            Probe::PortAInput => (self.port_a_input)(),
            Probe::PortBInput => (self.port_b_input)(),
            Probe::Mirror(offset) => self.latch(offset),
            Probe::Fixed(value) => value,
            Probe::IrqPending => self.irq.pending().bits(),
            Probe::IrqMasked => self.irq.masked().bits(),
            Probe::DmaParam { channel, slot } => {
                self.dma.read_param(usize::from(channel), usize::from(slot))
            }
            Probe::NandStatus => self.nand.status(),
            Probe::NandReady => self.nand.poll_ready(),
        }
    }

    /// Write a peripheral register.
    ///
    /// `memory` is the CPU address space, used only when the write starts a
    /// DMA transfer.
    pub fn write(&mut self, offset: u16, value: u16, memory: &mut dyn Memory) {
        let Some(register) = self.table.get(offset).copied() else {
            debug!(
                offset = format_args!("{offset:#06x}"),
                value = format_args!("{value:#06x}"),
                "write to unmapped register"
            );
            return;
        };
        trace!(
            offset = format_args!("{offset:#06x}"),
            name = register.name,
            value = format_args!("{value:#06x}"),
            "register write"
        );
        let action = match register.behavior {
            Behavior::Status(_) => {
                debug!(name = register.name, "write to read-only register ignored");
                return;
            }
            Behavior::Storage => None,
            Behavior::Trigger { action, .. } => Some(action),
        };
        if let Some(i) = Self::slot(offset) {
            self.latches[i] = value;
        }
        if let Some(action) = action {
            self.act(action, value, memory);
        }
    }

    fn act(&mut self, action: Action, value: u16, memory: &mut dyn Memory) {
        match action {
            Action::None => {}
            Action::WaitMode => self.wait_request = true,
            Action::BankSwitch => {
                self.bank = value & BANK_MASK;
                debug!(bank = self.bank, "bank switch");
                if let Some(callback) = self.mapping_write.as_mut() {
                    callback(value);
                }
            }
            Action::ChipSelect(index) => self.chip_select.write_control(usize::from(index), value),
            Action::PortAOutput => (self.port_a_output)(value),
            Action::IrqClear => self.irq.clear(value),
            Action::IrqEnable => self.irq.set_enabled(value),
            Action::DmaParam { channel, slot } => {
                self.dma.write_param(usize::from(channel), usize::from(slot), value);
            }
            Action::DmaTrigger => {
                let outcome =
                    self.dma.trigger(value, memory, self.flash.as_mut(), self.nand.address_mut());
                if let TriggerOutcome::Completed { .. } = outcome {
                    self.irq.raise(IrqSources::DMA);
                }
            }
            Action::NandCommand => self.nand.command(value),
            Action::NandAddressLow => self.nand.address_low(value),
            Action::NandAddressHigh => self.nand.address_high(value),
        }
    }

    /// Reset every block. Boot strap pins are sampled here and the default
    /// chip-select layout is announced.
    pub fn reset(&mut self) {
        self.latches.fill(0);
        self.dma.reset();
        self.irq.reset();
        self.nand.reset();
        self.bank = 0;
        self.boot_mode = self.boot_pins;
        self.wait_request = false;
        self.toggle = 0;
        self.chip_select.reset();
    }

    /// Change the boot strap pins. Takes effect at the next reset.
    pub fn set_boot_pins(&mut self, pins: u8) {
        self.boot_pins = pins & 3;
    }

    #[must_use]
    pub fn boot_mode(&self) -> u8 {
        self.boot_mode
    }

    pub fn write_dma_param(&mut self, channel: usize, slot: usize, value: u16) {
        self.dma.write_param(channel, slot, value);
    }

    #[must_use]
    pub fn read_dma_param(&self, channel: usize, slot: usize) -> u16 {
        self.dma.read_param(channel, slot)
    }

    #[must_use]
    pub fn dma(&self) -> &DmaController {
        &self.dma
    }

    pub fn set_video_irq(&mut self, level: bool) {
        self.irq.set_line(IrqSources::VIDEO, level);
    }

    pub fn set_audio_irq(&mut self, level: bool) {
        self.irq.set_line(IrqSources::AUDIO, level);
    }

    /// Latch the internal fault source.
    pub fn raise_internal(&mut self) {
        self.irq.raise(IrqSources::INTERNAL);
    }

    /// Request line towards the CPU.
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.irq.line()
    }

    /// Vector fetch at interrupt acknowledge.
    #[must_use]
    pub fn irq_vector(&self) -> u16 {
        self.irq.vector()
    }

    #[must_use]
    pub fn interrupts(&self) -> &InterruptAggregator {
        &self.irq
    }

    /// Returns true once after the wait-mode register is written.
    pub fn take_wait_request(&mut self) -> bool {
        std::mem::take(&mut self.wait_request)
    }

    /// Bank shown at CPU 0x8000..0xFFFF.
    #[must_use]
    pub fn bank(&self) -> u16 {
        self.bank
    }

    #[must_use]
    pub fn chip_select_base(&self) -> u32 {
        self.chip_select.base()
    }

    #[must_use]
    pub fn chip_select_regions(&self) -> &[ChipSelectRegion; CHIP_SELECTS] {
        self.chip_select.regions()
    }

    #[must_use]
    pub fn flash_address(&self) -> u32 {
        self.nand.address()
    }

    pub fn flash_mut(&mut self) -> &mut dyn FlashInterface {
        self.flash.as_mut()
    }

    #[must_use]
    pub fn bus_noise(&self) -> BusNoise {
        self.noise.mode()
    }

    #[must_use]
    pub fn save_state(&self) -> SocState {
        SocState {
            variant: self.variant,
            latches: self.latches.to_vec(),
            dma: self.dma.save(),
            chip_select_base: self.chip_select.base(),
            chip_select: self.chip_select.controls(),
            bank: self.bank,
            nand: self.nand.save(),
            irq: self.irq.save(),
            boot_mode: self.boot_mode,
            wait_request: self.wait_request,
            toggle: self.toggle,
            noise_draws: self.noise.draws(),
        }
    }

    /// Restore captured state. Only the chip-select remap callback fires,
    /// with the restored layout. The variant and
    /// chip-select base are construction constants and are not taken from
    /// `state`; callers check them first.
    pub fn restore_state(&mut self, state: &SocState) {
        self.latches.fill(0);
        for (latch, &value) in self.latches.iter_mut().zip(&state.latches) {
            *latch = value;
        }
        self.dma.restore(&state.dma);
        self.chip_select.restore(state.chip_select);
        self.bank = state.bank & BANK_MASK;
        self.nand.restore(&state.nand);
        self.irq.restore(&state.irq);
        self.boot_mode = state.boot_mode & 3;
        self.wait_request = state.wait_request;
        self.toggle = state.toggle & 0x0100;
        self.noise.seek(state.noise_draws);
    }
}

/// All query paths supported by the SoC, besides `reg.<hex offset>`.
const SOC_QUERY_PATHS: &[&str] = &[
    "variant",
    "bank",
    "boot_mode",
    "wait_request",
    "chip_select.base",
    "chip_select.cs0",
    "chip_select.cs1",
    "chip_select.cs2",
    "chip_select.cs3",
    "chip_select.cs4",
    "dma.status",
    "irq.pending",
    "irq.enabled",
    "irq.line",
    "irq.vector",
    "nand.address",
];

impl Observable for Gcm394 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(hex) = path.strip_prefix("reg.") {
            let offset = u16::from_str_radix(hex.trim_start_matches("0x"), 16).ok()?;
            return self.table.get(offset).is_some().then(|| self.latch(offset).into());
        }
        if let Some(cs) = path.strip_prefix("chip_select.cs") {
            let index: usize = cs.parse().ok()?;
            return self.chip_select.regions().get(index).map(|r| r.start.into());
        }
        match path {
            "variant" => Some(self.variant.name().into()),
            "bank" => Some(self.bank.into()),
            "boot_mode" => Some(self.boot_mode.into()),
            "wait_request" => Some(self.wait_request.into()),
            "chip_select.base" => Some(self.chip_select.base().into()),
            "dma.status" => Some(self.dma.status().into()),
            "irq.pending" => Some(self.irq.pending().bits().into()),
            "irq.enabled" => Some(self.irq.enabled().bits().into()),
            "irq.line" => Some(self.irq.line().into()),
            "irq.vector" => Some(self.irq.vector().into()),
            "nand.address" => Some(self.nand.address().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        SOC_QUERY_PATHS
    }
}

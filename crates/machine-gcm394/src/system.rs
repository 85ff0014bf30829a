//! The owning system object.

use tracing::debug;

use emu_core::{Bus, Cpu, Observable, Ticks, Value};
use national_pace::{InstructionSet, InterruptLevel, Pace, PaceBuilder, RunSummary};
use sunplus_gcm394::{
    ChipSelectRegion, FlashInterface, Gcm394, Gcm394Builder, CHIP_SELECTS,
};

use crate::config::{SystemConfig, MAX_EXTERNAL_WORDS};
use crate::error::{ConfigError, SnapshotError};
use crate::memory::SystemBus;
use crate::snapshot::{self, SystemState};

/// Wires collaborators into a [`System`].
///
/// CPU pins and SoC collaborators are all required; `build` reports the
/// first one missing.
pub struct SystemBuilder {
    config: SystemConfig,
    cpu: PaceBuilder,
    soc: Gcm394Builder,
    internal_rom: Vec<u16>,
}

impl SystemBuilder {
    #[must_use]
    pub fn new(config: SystemConfig) -> Self {
        let mut cpu = PaceBuilder::new(config.cpu).extend_stretch(config.extend_stretch);
        if let Some(hz) = config.clock_hz {
            cpu = cpu.clock(hz);
        }
        let soc = Gcm394Builder::new(config.soc)
            .boot_mode(config.boot_mode)
            .bus_noise(config.bus_noise);
        Self {
            config,
            cpu,
            soc,
            internal_rom: Vec::new(),
        }
    }

    /// Connect CPU flag output F11 + `index`.
    #[must_use]
    pub fn flag_output(mut self, index: usize, output: impl FnMut(bool) + 'static) -> Self {
        self.cpu = self.cpu.flag_output(index, output);
        self
    }

    /// Connect CPU jump condition input JC13 + `index`.
    #[must_use]
    pub fn jump_condition(mut self, index: usize, input: impl FnMut() -> bool + 'static) -> Self {
        self.cpu = self.cpu.jump_condition(index, input);
        self
    }

    #[must_use]
    pub fn debug_hook(mut self, hook: impl FnMut(u16) + 'static) -> Self {
        self.cpu = self.cpu.debug_hook(hook);
        self
    }

    /// Per-machine-cycle EXTEND source, for wait states shorter than an
    /// instruction.
    #[must_use]
    pub fn extend_input(mut self, input: impl FnMut() -> bool + 'static) -> Self {
        self.cpu = self.cpu.extend_input(input);
        self
    }

    #[must_use]
    pub fn port_a_input(mut self, input: impl FnMut() -> u16 + 'static) -> Self {
        self.soc = self.soc.port_a_input(input);
        self
    }

    #[must_use]
    pub fn port_b_input(mut self, input: impl FnMut() -> u16 + 'static) -> Self {
        self.soc = self.soc.port_b_input(input);
        self
    }

    #[must_use]
    pub fn port_a_output(mut self, output: impl FnMut(u16) + 'static) -> Self {
        self.soc = self.soc.port_a_output(output);
        self
    }

    #[must_use]
    pub fn chip_select(
        mut self,
        remap: impl FnMut(&[ChipSelectRegion; CHIP_SELECTS]) + 'static,
    ) -> Self {
        self.soc = self.soc.chip_select(remap);
        self
    }

    #[must_use]
    pub fn mapping_write(mut self, callback: impl FnMut(u16) + 'static) -> Self {
        self.soc = self.soc.mapping_write(callback);
        self
    }

    #[must_use]
    pub fn flash(mut self, flash: impl FlashInterface + 'static) -> Self {
        self.soc = self.soc.flash(flash);
        self
    }

    /// Internal ROM, shown through banks below the chip-select base. The
    /// interrupt vector tables sit at its words 0x7FF0..0x7FFF.
    #[must_use]
    pub fn internal_rom(mut self, words: Vec<u16>) -> Self {
        self.internal_rom = words;
        self
    }

    /// Build and reset the system.
    ///
    /// # Errors
    ///
    /// Returns the first CPU or SoC misconfiguration found, or
    /// [`ConfigError::ExternalSpaceTooLarge`] before anything is allocated.
    pub fn build<I: InstructionSet>(self, isa: I) -> Result<System<I>, ConfigError> {
        if self.config.external_words > MAX_EXTERNAL_WORDS {
            return Err(ConfigError::ExternalSpaceTooLarge {
                words: self.config.external_words,
                max: MAX_EXTERNAL_WORDS,
            });
        }
        let cpu = self.cpu.build(isa)?;
        let soc = self.soc.build()?;
        let mut system = System {
            cpu,
            bus: SystemBus::new(soc, self.internal_rom, self.config.external_words),
            config: self.config,
        };
        system.reset();
        Ok(system)
    }
}

/// A GCM394-family system: CPU, SoC and address space under one owner.
pub struct System<I> {
    cpu: Pace<I>,
    bus: SystemBus,
    config: SystemConfig,
}

impl<I: InstructionSet> System<I> {
    #[must_use]
    pub fn builder(config: SystemConfig) -> SystemBuilder {
        SystemBuilder::new(config)
    }

    /// Run the CPU for `budget` clock ticks or until an interrupt is entered.
    pub fn run(&mut self, budget: Ticks) -> RunSummary {
        self.cpu.run_for(&mut self.bus, budget)
    }

    /// Reset CPU and SoC. RAM and chip-select space keep their contents.
    pub fn reset(&mut self) {
        debug!(soc = %self.config.soc, cpu = %self.config.cpu, "system reset");
        self.bus.reset();
        self.cpu.reset();
    }

    /// Drive a CPU interrupt pin. See [`Pace::signal_interrupt`].
    pub fn signal_interrupt(&mut self, level: InterruptLevel, state: bool) -> bool {
        self.cpu.signal_interrupt(level, state)
    }

    pub fn set_extend(&mut self, state: bool) {
        self.cpu.set_extend(state);
    }

    pub fn set_video_irq(&mut self, level: bool) {
        self.bus.set_video_irq(level);
    }

    pub fn set_audio_irq(&mut self, level: bool) {
        self.bus.set_audio_irq(level);
    }

    #[must_use]
    pub fn cpu(&self) -> &Pace<I> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Pace<I> {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    #[must_use]
    pub fn soc(&self) -> &Gcm394 {
        self.bus.soc()
    }

    #[must_use]
    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Word at `address` through the bus, with side effects.
    pub fn read(&mut self, address: u16) -> u16 {
        self.bus.read(address)
    }

    pub fn write(&mut self, address: u16, value: u16) {
        self.bus.write(address, value);
    }

    #[must_use]
    pub fn save_state(&self) -> SystemState {
        SystemState {
            cpu_variant: self.cpu.variant(),
            cpu: self.cpu.save_state(),
            soc: self.bus.save_soc(),
            ram: self.bus.ram().to_vec(),
            external: self.bus.external().to_vec(),
        }
    }

    /// Restore a captured state.
    ///
    /// # Errors
    ///
    /// The state must come from a system with the same variants and memory
    /// sizes; nothing is changed otherwise.
    pub fn restore_state(&mut self, state: &SystemState) -> Result<(), SnapshotError> {
        if state.soc.variant != self.config.soc || state.cpu_variant != self.config.cpu {
            return Err(SnapshotError::VariantMismatch {
                expected: format!("{}/{}", self.config.soc, self.config.cpu),
                found: format!("{}/{}", state.soc.variant, state.cpu_variant),
            });
        }
        if state.soc.chip_select_base != self.soc().chip_select_base() {
            return Err(SnapshotError::VariantMismatch {
                expected: format!("chip-select base {:#x}", self.soc().chip_select_base()),
                found: format!("chip-select base {:#x}", state.soc.chip_select_base),
            });
        }
        check_size("ram", self.bus.ram().len(), state.ram.len())?;
        check_size("chip-select space", self.bus.external().len(), state.external.len())?;

        self.cpu.restore_state(&state.cpu);
        self.bus.restore(&state.soc, &state.ram, &state.external);
        Ok(())
    }

    /// Binary snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        snapshot::encode(&self.save_state())
    }

    /// Restore a binary snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot is damaged or was taken on a different system.
    pub fn restore_snapshot(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let state = snapshot::decode(data)?;
        self.restore_state(&state)
    }

    /// State as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.save_state())?)
    }

    /// Restore state from JSON.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or a state from a different system.
    pub fn restore_json(&mut self, text: &str) -> Result<(), SnapshotError> {
        let state: SystemState = serde_json::from_str(text)?;
        self.restore_state(&state)
    }
}

fn check_size(what: &'static str, expected: usize, found: usize) -> Result<(), SnapshotError> {
    if expected == found {
        Ok(())
    } else {
        Err(SnapshotError::SizeMismatch { what, expected, found })
    }
}

/// Query paths owned by the system itself. CPU and SoC paths are reached
/// with `cpu.` and `soc.` prefixes.
const SYSTEM_QUERY_PATHS: &[&str] = &["bus.fetch_hits", "bus.fetch_misses", "bus.bank"];

impl<I: InstructionSet> Observable for System<I> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            return self.cpu.query(rest);
        }
        if let Some(rest) = path.strip_prefix("soc.") {
            return self.soc().query(rest);
        }
        let (hits, misses) = self.bus.cache_stats();
        match path {
            "bus.fetch_hits" => Some(hits.into()),
            "bus.fetch_misses" => Some(misses.into()),
            "bus.bank" => Some(self.soc().bank().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        SYSTEM_QUERY_PATHS
    }
}

//! Whole-system behaviour: CPU, SoC and address space together.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::{Cpu, Observable, Ticks, Value};
use proptest::prelude::*;
use machine_gcm394::{
    ConfigError, SnapshotError, System, SystemBuilder, SystemConfig, MAX_EXTERNAL_WORDS,
};
use national_pace::testing::{cfr, inc, jmp, li, load_word, pull, st, TinyIsa, NOP};
use national_pace::{flags, Exit, InterruptLevel};
use sunplus_gcm394::registers::{
    BANK_SWITCH, BUS_NOISE, DMA_STATUS, DMA_TRIGGER, IRQ_ENABLE, IRQ_STATUS, TOGGLE_STATUS,
    WAIT_MODE,
};
use sunplus_gcm394::{
    BusNoise, ChipSelectRegion, FlashImage, FlashInterface, IrqSources, Variant, DMA_PARAMS,
    TO_FLASH,
};

const ROM_WORDS: usize = 0x8000;
const VIDEO_HANDLER: u16 = 0x0100;
const LEVEL2_HANDLER: u16 = 0x0200;

/// Flash the test can inspect after handing it to the system.
#[derive(Clone, Default)]
struct SharedFlash(Rc<RefCell<Vec<u16>>>);

impl FlashInterface for SharedFlash {
    fn read_word(&mut self, address: u32) -> u16 {
        self.0.borrow().get(address as usize).copied().unwrap_or(0xFFFF)
    }

    fn write_word(&mut self, address: u32, value: u16) {
        if let Some(word) = self.0.borrow_mut().get_mut(address as usize) {
            *word = value;
        }
    }
}

/// Erased flash that drops writes, so replays see the same contents.
struct BlankFlash;

impl FlashInterface for BlankFlash {
    fn read_word(&mut self, _address: u32) -> u16 {
        0xFFFF
    }

    fn write_word(&mut self, _address: u32, _value: u16) {}
}

/// Internal ROM with word `n` = `n`, plus the two vector tables.
fn rom() -> Vec<u16> {
    let mut rom: Vec<u16> = (0..ROM_WORDS).map(|n| n as u16).collect();
    rom[0x7FF2] = LEVEL2_HANDLER;
    rom[0x7FF8] = VIDEO_HANDLER;
    rom
}

fn wired(config: SystemConfig) -> SystemBuilder {
    let mut builder = System::<TinyIsa>::builder(config)
        .port_a_input(|| 0)
        .port_b_input(|| 0)
        .port_a_output(|_| {})
        .chip_select(|_| {})
        .internal_rom(rom());
    for index in 0..4 {
        builder = builder.flag_output(index, |_| {});
    }
    for index in 0..3 {
        builder = builder.jump_condition(index, || false);
    }
    builder
}

fn system_with_flash(config: SystemConfig, flash: &SharedFlash) -> System<TinyIsa> {
    wired(config).flash(flash.clone()).build(TinyIsa).expect("fully wired")
}

fn system() -> System<TinyIsa> {
    system_with_flash(SystemConfig::default(), &SharedFlash::default())
}

/// Program fragment: `mem[address] = value`, using AC0 and AC1.
fn store(address: u16, value: u16) -> Vec<u16> {
    let mut words = load_word(0, address).to_vec();
    words.extend(load_word(1, value));
    words.push(st(1, 0));
    words
}

/// Program fragment: enable interrupt level 2.
fn enable_level2() -> Vec<u16> {
    let mut words = load_word(2, flags::IEN | flags::IE2).to_vec();
    words.push(cfr(2));
    words
}

#[test]
fn wait_mode_register_halts_cpu() {
    let mut system = system();
    let mut program = store(WAIT_MODE, 1);
    program.extend([NOP, NOP]);
    system.bus_mut().load(0, &program);

    // Half a millisecond at the default 2 MHz.
    let budget = system.cpu().clock().ticks_per_micros(500);
    assert_eq!(budget, Ticks::new(1000));
    let summary = system.run(budget);
    assert_eq!(summary.instructions, 5);
    assert_eq!(summary.ticks, Ticks::new(1000));
    assert!(system.cpu().is_halted());
    assert_eq!(system.cpu().pc(), 5);
}

#[test]
fn video_interrupt_vectors_through_aggregator_table() {
    let mut system = system();
    let mut program = store(IRQ_ENABLE, IrqSources::VIDEO.bits());
    program.extend(enable_level2());
    let idle = program.len() as u16;
    program.push(jmp(idle));
    system.bus_mut().load(0, &program);

    let summary = system.run(Ticks::new(200));
    assert_eq!(summary.exit, Exit::BudgetExhausted);

    system.set_video_irq(true);
    let summary = system.run(Ticks::new(200));
    assert_eq!(summary.exit, Exit::Interrupt(InterruptLevel::Int2));
    assert_eq!(system.cpu().pc(), VIDEO_HANDLER);
    assert_eq!(system.query("cpu.stack_depth"), Some(Value::U8(1)));
    assert_eq!(system.query("soc.irq.vector"), Some(Value::U16(0)));
}

#[test]
fn level2_pin_without_soc_request_uses_level_table() {
    let mut system = system();
    let mut program = enable_level2();
    let idle = program.len() as u16;
    program.push(jmp(idle));
    system.bus_mut().load(0, &program);
    system.run(Ticks::new(40));

    assert!(system.signal_interrupt(InterruptLevel::Int2, true));
    let summary = system.run(Ticks::new(40));
    assert_eq!(summary.exit, Exit::Interrupt(InterruptLevel::Int2));
    assert_eq!(system.cpu().pc(), LEVEL2_HANDLER);
}

#[test]
fn interrupt_wakes_cpu_from_wait_mode() {
    let mut system = system();
    let mut program = store(IRQ_ENABLE, IrqSources::VIDEO.bits());
    program.extend(enable_level2());
    program.extend(store(WAIT_MODE, 1));
    system.bus_mut().load(0, &program);

    system.run(Ticks::new(500));
    assert!(system.cpu().is_halted());

    system.set_video_irq(true);
    let summary = system.run(Ticks::new(500));
    assert_eq!(summary.exit, Exit::Interrupt(InterruptLevel::Int2));
    assert!(!system.cpu().is_halted());
    assert_eq!(system.cpu().pc(), VIDEO_HANDLER);
}

#[test]
fn stack_fault_latches_internal_source() {
    let mut system = system();
    system.bus_mut().load(0, &[pull(0)]);

    system.run(Ticks::new(4));
    assert!(system.soc().interrupts().pending().contains(IrqSources::INTERNAL));
}

#[test]
fn dma_from_flash_into_ram_and_banked_space() {
    let flash = SharedFlash(Rc::new(RefCell::new(vec![0x1111, 0x2222, 0x3333, 0x4444])));
    let mut system = system_with_flash(SystemConfig::default(), &flash);

    system.write(DMA_PARAMS, 0x1000);
    system.write(DMA_PARAMS + 1, 2);
    system.write(DMA_TRIGGER, 0);
    assert_eq!(&system.bus().ram()[0x1000..0x1002], &[0x1111, 0x2222]);
    assert!(system.soc().interrupts().pending().contains(IrqSources::DMA));
    assert_eq!(system.read(DMA_STATUS), 0x0001);

    // Bank 4 is the first bank of chip-select space. Flash address carried on.
    system.write(BANK_SWITCH, 4);
    system.write(DMA_PARAMS, 0x8000);
    system.write(DMA_TRIGGER, 0);
    assert_eq!(&system.bus().external()[..2], &[0x3333, 0x4444]);
}

#[test]
fn dma_from_ram_into_flash() {
    let flash = SharedFlash(Rc::new(RefCell::new(vec![0; 4])));
    let mut system = system_with_flash(SystemConfig::default(), &flash);
    system.bus_mut().load(0x2000, &[0xAAAA, 0xBBBB, 0xCCCC]);

    system.write(DMA_PARAMS + 2, 0x2000);
    system.write(DMA_PARAMS + 3, 3);
    system.write(DMA_TRIGGER, TO_FLASH | 1);
    assert_eq!(*flash.0.borrow(), vec![0xAAAA, 0xBBBB, 0xCCCC, 0]);
}

#[test]
fn program_drives_dma_through_the_window() {
    let flash = SharedFlash(Rc::new(RefCell::new(vec![0x5A5A])));
    let mut system = system_with_flash(SystemConfig::default(), &flash);
    let mut program = store(DMA_PARAMS, 0x3000);
    program.extend(store(DMA_PARAMS + 1, 1));
    program.extend(store(DMA_TRIGGER, 0));
    system.bus_mut().load(0, &program);

    let summary = system.run(Ticks::new(72));
    assert_eq!(summary.instructions, 15);
    assert_eq!(system.bus().peek(0x3000), 0x5A5A);
}

#[test]
fn banks_select_rom_or_chip_select_space() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let banks = Rc::clone(&log);
    let mut system = wired(SystemConfig::default())
        .flash(FlashImage::new(Vec::new()))
        .mapping_write(move |bank| banks.borrow_mut().push(bank))
        .build(TinyIsa)
        .expect("fully wired");
    system.bus_mut().load_external(0, &[0xBEEF]);

    assert_eq!(system.read(0x8000), 0x0000);
    assert_eq!(system.read(0x8123), 0x0123);

    system.write(BANK_SWITCH, 4);
    assert_eq!(system.read(0x8000), 0xBEEF);
    assert_eq!(system.query("bus.bank"), Some(Value::U16(4)));

    // Linear 0x18000 is below the base and past the end of the ROM.
    system.write(BANK_SWITCH, 3);
    assert_eq!(system.read(0x8000), 0x0000);

    assert_eq!(*log.borrow(), vec![4, 3]);
}

#[test]
fn gpac800_chip_select_space_starts_higher() {
    let config = SystemConfig {
        soc: Variant::Gpac800,
        ..SystemConfig::default()
    };
    let mut system = system_with_flash(config, &SharedFlash::default());
    system.bus_mut().load_external(0, &[0xCAFE]);

    system.write(BANK_SWITCH, 4);
    assert_eq!(system.read(0x8000), 0x0000);
    system.write(BANK_SWITCH, 6);
    assert_eq!(system.read(0x8000), 0xCAFE);
}

#[test]
fn chip_select_layout_announced_at_build() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::clone(&seen);
    let _system = wired(SystemConfig::default())
        .chip_select(move |regions: &[ChipSelectRegion; 5]| {
            record.borrow_mut().push(regions[0].start);
        })
        .flash(FlashImage::new(Vec::new()))
        .build(TinyIsa)
        .expect("fully wired");
    assert_eq!(*seen.borrow(), vec![0x20000]);
}

#[test]
fn fetch_cache_serves_loops_and_sees_writes() {
    let mut system = system();
    system.bus_mut().load(0, &[inc(0), jmp(0)]);

    system.run(Ticks::new(8));
    assert_eq!(system.bus().cache_stats(), (0, 2));
    system.run(Ticks::new(8));
    assert_eq!(system.bus().cache_stats(), (2, 2));
    assert_eq!(system.cpu().core().ac(0), 2);

    system.write(0, li(0, 0x42));
    system.run(Ticks::new(4));
    assert_eq!(system.cpu().core().ac(0), 0x42);
    assert_eq!(system.query("bus.fetch_misses"), Some(Value::U64(3)));
}

#[test]
fn interrupt_inputs_leave_fetch_cache_warm() {
    let mut system = system();
    system.bus_mut().load(0, &[inc(0), jmp(0)]);
    system.run(Ticks::new(8));
    assert_eq!(system.bus().cache_stats(), (0, 2));

    system.set_video_irq(true);
    system.set_audio_irq(true);
    system.run(Ticks::new(8));
    system.set_video_irq(false);
    system.set_audio_irq(false);
    system.run(Ticks::new(8));
    assert_eq!(system.bus().cache_stats(), (4, 2));
    assert!(system.soc().save_state().irq.lines.is_empty());
}

#[test]
fn cpu_store_invalidates_cached_instruction() {
    let mut system = system();
    // Stores li(3, 7) over the NOP at 6, then falls into the 6..7 loop.
    let mut program = load_word(0, 6).to_vec();
    program.extend(load_word(1, li(3, 7)));
    program.extend([st(1, 0), NOP, NOP, jmp(6)]);
    system.bus_mut().load(0, &program);

    system.cpu_mut().core_mut().set_pc(6);
    system.run(Ticks::new(16));
    assert_eq!(system.bus().cache_stats(), (2, 2));

    system.cpu_mut().core_mut().set_pc(0);
    system.run(Ticks::new(4 * 4 + 8 + 4 + 4));
    assert_eq!(system.cpu().core().ac(3), 7);
}

#[test]
fn snapshot_restores_byte_identical_state() {
    let flash = SharedFlash(Rc::new(RefCell::new(vec![1, 2, 3])));
    let mut system = system_with_flash(SystemConfig::default(), &flash);
    system.bus_mut().load(0, &[inc(0), inc(1), jmp(0)]);
    system.run(Ticks::new(100));
    system.write(BANK_SWITCH, 5);
    system.write(DMA_PARAMS, 0x0400);
    system.write(DMA_PARAMS + 1, 3);
    system.write(DMA_TRIGGER, 0);
    let saved = system.snapshot();

    system.run(Ticks::new(100));
    system.write(BANK_SWITCH, 1);
    system.read(DMA_STATUS);
    system.bus_mut().load(0x0400, &[9, 9, 9]);
    system.bus_mut().load_external(0, &[7]);
    assert_ne!(system.snapshot(), saved);

    system.restore_snapshot(&saved).expect("same system");
    assert_eq!(system.snapshot(), saved);
    assert_eq!(system.soc().bank(), 5);
    assert_eq!(&system.bus().ram()[0x400..0x403], &[1, 2, 3]);
}

#[test]
fn json_state_round_trip() {
    let config = SystemConfig {
        external_words: 0x100,
        ..SystemConfig::default()
    };
    let mut system = system_with_flash(config, &SharedFlash::default());
    system.bus_mut().load(0, &[inc(2), jmp(0)]);
    system.run(Ticks::new(40));
    let text = system.to_json().expect("serializable");

    system.run(Ticks::new(40));
    system.restore_json(&text).expect("same system");
    assert_eq!(system.to_json().expect("serializable"), text);
}

#[test]
fn undriven_noise_position_survives_restore() {
    let mut system = system();
    system.read(BUS_NOISE);
    system.read(BUS_NOISE);
    let saved = system.snapshot();

    system.read(BUS_NOISE);
    system.restore_snapshot(&saved).expect("same system");
    assert_eq!(system.snapshot(), saved);
    assert_eq!(system.soc().save_state().noise_draws, 2);
}

#[test]
fn seeded_noise_resumes_after_restore() {
    let config = SystemConfig {
        bus_noise: BusNoise::Seeded(0x5EED),
        external_words: 0x100,
        ..SystemConfig::default()
    };
    let mut system = system_with_flash(config, &SharedFlash::default());
    system.read(BUS_NOISE);
    let saved = system.snapshot();
    let expected: Vec<u16> = (0..4).map(|_| system.read(BUS_NOISE)).collect();

    system.restore_snapshot(&saved).expect("same system");
    let replayed: Vec<u16> = (0..4).map(|_| system.read(BUS_NOISE)).collect();
    assert_eq!(replayed, expected);

    let mut far = system.save_state();
    far.soc.noise_draws = u64::MAX;
    system.restore_state(&far).expect("same system");
    assert_eq!(system.soc().save_state().noise_draws, u64::MAX);
}

#[test]
fn snapshot_from_other_variant_is_refused() {
    let gpac = SystemConfig {
        soc: Variant::Gpac800,
        ..SystemConfig::default()
    };
    let other = system_with_flash(gpac, &SharedFlash::default());
    let mut system = system();
    system.bus_mut().load(0, &[0x1234]);
    let before = system.snapshot();

    let err = system.restore_snapshot(&other.snapshot()).unwrap_err();
    assert!(matches!(err, SnapshotError::VariantMismatch { .. }));
    assert_eq!(system.snapshot(), before);
}

#[test]
fn snapshot_with_other_memory_size_is_refused() {
    let small = SystemConfig {
        external_words: 0x1000,
        ..SystemConfig::default()
    };
    let other = system_with_flash(small, &SharedFlash::default());
    let mut system = system();

    let err = system.restore_snapshot(&other.snapshot()).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::SizeMismatch {
            what: "chip-select space",
            expected: 0x40_0000,
            found: 0x1000,
        }
    ));
}

#[test]
fn damaged_snapshot_is_refused() {
    let mut system = system();
    let mut bytes = system.snapshot();
    bytes.truncate(bytes.len() / 2);
    assert!(matches!(system.restore_snapshot(&bytes), Err(SnapshotError::Truncated(_))));
    assert!(matches!(system.restore_snapshot(b"nope"), Err(SnapshotError::BadMagic)));
}

#[test]
fn configuration_from_json() {
    let config = SystemConfig::from_json(
        r#"{ "soc": "gpac800", "cpu": "pace", "boot_mode": 3, "bus_noise": { "fixed": 4660 } }"#,
    )
    .expect("valid");
    let mut system = system_with_flash(config, &SharedFlash::default());

    assert_eq!(system.query("soc.variant"), Some(Value::String("GPAC800".into())));
    assert_eq!(system.query("cpu.variant"), Some(Value::String("PACE".into())));
    assert_eq!(system.soc().boot_mode(), 3);
    assert_eq!(system.read(sunplus_gcm394::registers::BUS_NOISE), 0x1234);
}

#[test]
fn oversized_chip_select_space_is_refused() {
    let config = SystemConfig::from_json(r#"{ "external_words": 18446744073709551615 }"#)
        .expect("valid json");
    let err = wired(config).flash(BlankFlash).build(TinyIsa).err().expect("too large");
    assert!(matches!(
        err,
        ConfigError::ExternalSpaceTooLarge { words: usize::MAX, max: MAX_EXTERNAL_WORDS }
    ));
}

#[test]
fn unknown_configuration_field_is_rejected() {
    let err = SystemConfig::from_json(r#"{ "turbo": true }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn missing_collaborators_are_reported() {
    let err = wired(SystemConfig::default()).build(TinyIsa).err().expect("no flash");
    assert!(matches!(
        err,
        ConfigError::Soc(sunplus_gcm394::ConfigError::MissingCollaborator("flash"))
    ));

    let err = System::<TinyIsa>::builder(SystemConfig::default())
        .flash(FlashImage::new(Vec::new()))
        .build(TinyIsa)
        .err()
        .expect("no pins");
    assert!(matches!(
        err,
        ConfigError::Cpu(national_pace::ConfigError::MissingFlagOutput(0))
    ));
}

#[test]
fn observable_paths_reach_every_part() {
    let mut system = system();
    system.bus_mut().load(0, &[inc(1)]);
    system.run(Ticks::new(4));

    assert_eq!(system.query("cpu.pc"), Some(Value::U16(1)));
    assert_eq!(system.query("cpu.ac1"), Some(Value::U16(1)));
    assert_eq!(system.query("soc.bank"), Some(Value::U16(0)));
    assert_eq!(system.query("soc.chip_select.base"), Some(Value::U32(0x20000)));
    assert_eq!(system.query("bus.fetch_misses"), Some(Value::U64(1)));
    assert_eq!(system.query("nothing"), None);
    assert_eq!(system.query("cpu.nothing"), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn banked_reads_follow_linear_decode(bank in 0u16..64, offset in 0u16..0x8000) {
        let mut system = system();
        system.bus_mut().load_external(0x8000, &[0x0F0F]);
        system.write(BANK_SWITCH, bank);

        let linear = u32::from(bank) * 0x8000 + u32::from(offset);
        let expected = match linear {
            l if l < 0x8000 => l as u16,
            l if l < 0x20000 => 0,
            0x28000 => 0x0F0F,
            _ => 0,
        };
        prop_assert_eq!(system.bus().peek(0x8000 + offset), expected);
        prop_assert_eq!(system.read(0x8000 + offset), expected);
    }
}

#[derive(Debug, Clone)]
enum Step {
    Write(u16, u16),
    Read(u16),
    Dma { channel: u16, address: u16, length: u16 },
    Run(u64),
    Video(bool),
    Audio(bool),
    Interrupt(InterruptLevel, bool),
}

const STATE_REGISTERS: [u16; 7] =
    [BUS_NOISE, DMA_STATUS, IRQ_ENABLE, IRQ_STATUS, BANK_SWITCH, WAIT_MODE, TOGGLE_STATUS];

fn step() -> impl Strategy<Value = Step> {
    let register = prop::sample::select(STATE_REGISTERS.to_vec());
    let level = prop::sample::select(vec![
        InterruptLevel::Debug,
        InterruptLevel::Int2,
        InterruptLevel::Int3,
        InterruptLevel::Int5,
    ]);
    prop_oneof![
        (register.clone(), any::<u16>()).prop_map(|(r, v)| Step::Write(r, v)),
        register.prop_map(Step::Read),
        (0u16..7, 0u16..0x6000, 0u16..64)
            .prop_map(|(channel, address, length)| Step::Dma { channel, address, length }),
        (1u64..64).prop_map(Step::Run),
        any::<bool>().prop_map(Step::Video),
        any::<bool>().prop_map(Step::Audio),
        (level, any::<bool>()).prop_map(|(l, s)| Step::Interrupt(l, s)),
    ]
}

fn apply(system: &mut System<TinyIsa>, step: &Step) {
    match *step {
        Step::Write(register, value) => system.write(register, value),
        Step::Read(register) => {
            system.read(register);
        }
        Step::Dma { channel, address, length } => {
            system.write(DMA_PARAMS + 2 * channel, address);
            system.write(DMA_PARAMS + 2 * channel + 1, length);
            system.write(DMA_TRIGGER, channel);
        }
        Step::Run(ticks) => {
            system.run(Ticks::new(ticks));
        }
        Step::Video(level) => system.set_video_irq(level),
        Step::Audio(level) => system.set_audio_irq(level),
        Step::Interrupt(level, state) => {
            system.signal_interrupt(level, state);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn restore_reproduces_any_reachable_state(
        before in prop::collection::vec(step(), 0..24),
        after in prop::collection::vec(step(), 1..24),
    ) {
        let config = SystemConfig {
            bus_noise: BusNoise::Seeded(0x5EED),
            external_words: 0x1000,
            ..SystemConfig::default()
        };
        let mut system = wired(config).flash(BlankFlash).build(TinyIsa).expect("fully wired");
        for step in &before {
            apply(&mut system, step);
        }
        let saved = system.snapshot();
        for step in &after {
            apply(&mut system, step);
        }
        let ended = system.snapshot();

        system.restore_snapshot(&saved).expect("same system");
        prop_assert_eq!(&system.snapshot(), &saved);
        for step in &after {
            apply(&mut system, step);
        }
        prop_assert_eq!(system.snapshot(), ended);
    }
}

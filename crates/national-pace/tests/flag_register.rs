//! Flag register writes and the output pins they drive.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::{Cpu, Observable, SimpleBus, Ticks, Value};
use national_pace::testing::{self, PinLog, TinyIsa};
use national_pace::{Pace, RegisterId, Variant};
use proptest::prelude::*;

fn wired() -> (Pace<TinyIsa>, PinLog) {
    let log = PinLog::default();
    let conditions = Rc::new(RefCell::new([false; 3]));
    let mut cpu = testing::wired_builder(Variant::Ins8900, &log, &conditions)
        .build(TinyIsa)
        .expect("all pins wired");
    cpu.reset();
    log.borrow_mut().clear();
    (cpu, log)
}

fn changed_outputs(old: u16, new: u16) -> Vec<(usize, bool)> {
    (0..4)
        .filter(|i| (old ^ new) >> (11 + i) & 1 != 0)
        .map(|i| (i, new >> (11 + i) & 1 != 0))
        .collect()
}

#[test]
fn reset_state() {
    let mut cpu = testing::quiet_pace();
    cpu.write_register(RegisterId::Pc, 0x1234);
    cpu.set_flags(0x7FFE);
    cpu.set_stack_pointer(7);
    cpu.reset();
    assert_eq!(cpu.pc(), 0);
    assert_eq!(cpu.core().fr(), 0x8001);
    assert_eq!(cpu.core().sp(), 0);
    assert_eq!(cpu.core().stack_depth(), 0);
}

#[test]
fn power_on_flags_are_all_ones() {
    let log = PinLog::default();
    let conditions = Rc::new(RefCell::new([false; 3]));
    let mut cpu = testing::wired_builder(Variant::Pace, &log, &conditions)
        .build(TinyIsa)
        .expect("all pins wired");
    assert_eq!(cpu.core().fr(), 0xFFFF);

    // Reset drives every flag output low from the power-on state.
    cpu.reset();
    assert_eq!(*log.borrow(), vec![(0, false), (1, false), (2, false), (3, false)]);
}

#[test]
fn bit_11_write_drives_first_output() {
    let (mut cpu, log) = wired();
    cpu.set_flags(0x0800);
    assert_eq!(*log.borrow(), vec![(0, true)]);
    assert_eq!(cpu.core().fr(), 0x8801);
}

#[test]
fn rewriting_same_value_is_silent() {
    let (mut cpu, log) = wired();
    cpu.set_flags(0x5800);
    log.borrow_mut().clear();
    cpu.set_flags(0x5800);
    assert!(log.borrow().is_empty());
}

#[test]
fn outputs_fire_in_bit_order() {
    let (mut cpu, log) = wired();
    cpu.set_flags(0x7800);
    assert_eq!(*log.borrow(), vec![(0, true), (1, true), (2, true), (3, true)]);
    log.borrow_mut().clear();
    cpu.set_flags(0x2800);
    assert_eq!(*log.borrow(), vec![(1, false), (3, false)]);
}

#[test]
fn cfr_instruction_uses_flag_write_path() {
    let (mut cpu, log) = wired();
    let mut bus = SimpleBus::new();
    let [lo, hi] = testing::load_word(2, 0x1000);
    bus.load(0, &[lo, hi, testing::cfr(2), testing::crf(3)]);
    cpu.run_for(&mut bus, Ticks::new(16));
    assert_eq!(*log.borrow(), vec![(1, true)]);
    assert_eq!(cpu.core().ac(3), 0x9001);
    assert_eq!(cpu.query("flags.f12"), Some(Value::Bool(true)));
}

#[test]
fn register_write_of_fr_drives_outputs() {
    let (mut cpu, log) = wired();
    cpu.write_register(RegisterId::Fr, 0x4000);
    assert_eq!(*log.borrow(), vec![(3, true)]);
    assert_eq!(cpu.read_register(RegisterId::Fr), 0xC001);
}

proptest! {
    #[test]
    fn fixed_bits_always_read_high(value in any::<u16>()) {
        let (mut cpu, _log) = wired();
        cpu.set_flags(value);
        prop_assert_eq!(cpu.core().fr() & 0x8001, 0x8001);
        prop_assert_eq!(cpu.core().fr(), value | 0x8001);
    }

    #[test]
    fn outputs_fire_once_per_changed_bit(first in any::<u16>(), second in any::<u16>()) {
        let (mut cpu, log) = wired();
        cpu.set_flags(first);
        let before = cpu.core().fr();
        log.borrow_mut().clear();
        cpu.set_flags(second);
        prop_assert_eq!(log.borrow().clone(), changed_outputs(before, second));
    }
}

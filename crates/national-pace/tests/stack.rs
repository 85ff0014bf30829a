//! On-chip stack: pointer clamp, wrap and full/empty detection.

use emu_core::{Cpu, SimpleBus, Ticks};
use national_pace::flags::{IE1, IEN};
use national_pace::testing::{self, TinyIsa};
use national_pace::{clamp_stack_pointer, Exit, InterruptLevel, Pace, RegisterId, STACK_DEPTH};
use proptest::prelude::*;

fn pace() -> Pace<TinyIsa> {
    testing::quiet_pace()
}

#[test]
fn clamp_examples() {
    assert_eq!(clamp_stack_pointer(12), 0);
    assert_eq!(clamp_stack_pointer(11), 9);
    assert_eq!(clamp_stack_pointer(9), 9);
    assert_eq!(clamp_stack_pointer(10), 0);
    assert_eq!(clamp_stack_pointer(15), 9);
}

#[test]
fn pointer_writes_go_through_clamp() {
    let mut cpu = pace();
    cpu.write_register(RegisterId::Sp, 13);
    assert_eq!(cpu.core().sp(), 9);
    cpu.write_register(RegisterId::Sp, 14);
    assert_eq!(cpu.core().sp(), 0);
    cpu.write_register(RegisterId::Sp, 0x0105);
    assert_eq!(cpu.core().sp(), 5);
    assert_eq!(cpu.core().stack_depth(), 5);
}

#[test]
fn push_pull_is_lifo() {
    let mut cpu = pace();
    let core = cpu.core_mut();
    core.push(0x1111);
    core.push(0x2222);
    core.push(0x3333);
    assert_eq!(core.sp(), 3);
    assert_eq!(core.pull(), 0x3333);
    assert_eq!(core.pull(), 0x2222);
    assert_eq!(core.pull(), 0x1111);
    assert_eq!(core.sp(), 0);
}

#[test]
fn pointer_wraps_modulo_ten() {
    let mut cpu = pace();
    let core = cpu.core_mut();
    for i in 0..9 {
        core.push(i);
    }
    assert_eq!(core.sp(), 9);
    core.push(9);
    assert_eq!(core.sp(), 0);
    assert_eq!(core.stack_depth(), STACK_DEPTH as u8);
    assert_eq!(core.pull(), 9);
    assert_eq!(core.sp(), 9);
}

#[test]
fn overflow_raises_level_one() {
    let mut cpu = pace();
    let mut bus = SimpleBus::new();
    bus.vectors[1] = 0x0200;
    cpu.set_flags(IEN | IE1);
    for i in 0..=STACK_DEPTH as u16 {
        cpu.core_mut().push(i);
    }
    // The eleventh push overwrote the oldest word.
    assert_eq!(cpu.read_register(RegisterId::Stk(0)), 10);
    assert_eq!(cpu.core().stack_depth(), STACK_DEPTH as u8);

    let summary = cpu.run_for(&mut bus, Ticks::new(100));
    assert_eq!(summary.exit, Exit::Interrupt(InterruptLevel::Stack));
    assert_eq!(cpu.pc(), 0x0200);
}

#[test]
fn underflow_raises_level_one() {
    let mut cpu = pace();
    let mut bus = SimpleBus::new();
    bus.vectors[1] = 0x0300;
    bus.load(0, &[testing::pull(0)]);
    cpu.set_flags(IEN | IE1);

    let first = cpu.run_for(&mut bus, Ticks::new(4));
    assert_eq!(first.exit, Exit::BudgetExhausted);
    assert_eq!(cpu.core().stack_depth(), 0);
    assert_eq!(bus.stack_faults, 1);

    let second = cpu.run_for(&mut bus, Ticks::new(100));
    assert_eq!(second.exit, Exit::Interrupt(InterruptLevel::Stack));
    assert_eq!(cpu.pc(), 0x0300);
}

#[test]
fn stack_fault_is_masked_without_ie1() {
    let mut cpu = pace();
    let mut bus = SimpleBus::new();
    cpu.set_flags(IEN);
    cpu.core_mut().pull();
    let summary = cpu.run_for(&mut bus, Ticks::new(8));
    assert_eq!(summary.exit, Exit::BudgetExhausted);
}

#[test]
fn csp_instruction_sets_depth() {
    let mut cpu = pace();
    let mut bus = SimpleBus::new();
    bus.load(0, &[testing::li(1, 11), testing::csp(1), testing::push(1)]);
    cpu.run_for(&mut bus, Ticks::new(12));
    assert_eq!(cpu.core().sp(), 0);
    assert_eq!(cpu.read_register(RegisterId::Stk(9)), 11);
    assert_eq!(cpu.core().stack_depth(), 10);
}

proptest! {
    #[test]
    fn clamp_law(d in 0u8..16) {
        let expected = if d < 10 { d } else if d & 1 != 0 { 9 } else { 0 };
        prop_assert_eq!(clamp_stack_pointer(d), expected);
    }

    #[test]
    fn pointer_always_in_range(ops in proptest::collection::vec(any::<Option<u16>>(), 0..64)) {
        let mut cpu = pace();
        let core = cpu.core_mut();
        for op in ops {
            match op {
                Some(value) => core.push(value),
                None => { core.pull(); }
            }
            prop_assert!(core.sp() < 10);
            prop_assert!(core.stack_depth() <= 10);
        }
    }
}

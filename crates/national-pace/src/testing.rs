//! Scripted instruction set for exercising the execution shell in tests.
//!
//! This is not the PACE repertoire. Every instruction is one word:
//! bits 15..12 select the operation, bits 9..8 register `r`, bits 5..4
//! register `s`, bits 7..0 an immediate.
//!
//! | Opcode   | Mnemonic | Effect                               | Clocks |
//! |----------|----------|--------------------------------------|--------|
//! | `0x0000` | NOP      |                                      | 4      |
//! | `0x1r##` | LI       | `AC[r] = imm`                        | 4      |
//! | `0x2r##` | LHI      | `AC[r] = imm << 8 | AC[r] & 0xFF`    | 4      |
//! | `0x3rs0` | ST       | `mem[AC[s]] = AC[r]`                 | 8      |
//! | `0x4rs0` | LD       | `AC[r] = mem[AC[s]]`                 | 8      |
//! | `0x5r00` | PUSH     | push `AC[r]`                         | 4      |
//! | `0x6r00` | PULL     | `AC[r] = pull`                       | 4      |
//! | `0x7r00` | CFR      | `FR = AC[r]` (flag-write path)       | 4      |
//! | `0x8r00` | CRF      | `AC[r] = FR`                         | 4      |
//! | `0x9###` | JMP      | `PC = imm12`                         | 4      |
//! | `0xA000` | RTI      | `PC = pull`, set IEN                 | 8      |
//! | `0xBc##` | JC       | if `JC[13 + c]`, `PC = imm`          | 4      |
//! | `0xCr00` | CSP      | `SP = AC[r]` (clamp rule)            | 4      |
//! | `0xDr00` | INC      | `AC[r] += 1`                         | 4      |
//!
//! Anything else is illegal.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::Bus;

use crate::cpu::{Pace, PaceBuilder};
use crate::flags::IEN;
use crate::isa::{InstructionSet, Outcome};
use crate::processor::Core;
use crate::variant::Variant;

#[derive(Debug, Default, Clone, Copy)]
pub struct TinyIsa;

pub const NOP: u16 = 0x0000;

#[must_use]
pub const fn li(r: u16, imm: u8) -> u16 {
    0x1000 | (r & 3) << 8 | imm as u16
}

#[must_use]
pub const fn lhi(r: u16, imm: u8) -> u16 {
    0x2000 | (r & 3) << 8 | imm as u16
}

#[must_use]
pub const fn st(r: u16, s: u16) -> u16 {
    0x3000 | (r & 3) << 8 | (s & 3) << 4
}

#[must_use]
pub const fn ld(r: u16, s: u16) -> u16 {
    0x4000 | (r & 3) << 8 | (s & 3) << 4
}

#[must_use]
pub const fn push(r: u16) -> u16 {
    0x5000 | (r & 3) << 8
}

#[must_use]
pub const fn pull(r: u16) -> u16 {
    0x6000 | (r & 3) << 8
}

#[must_use]
pub const fn cfr(r: u16) -> u16 {
    0x7000 | (r & 3) << 8
}

#[must_use]
pub const fn crf(r: u16) -> u16 {
    0x8000 | (r & 3) << 8
}

#[must_use]
pub const fn jmp(target: u16) -> u16 {
    0x9000 | (target & 0x0FFF)
}

pub const RTI: u16 = 0xA000;

#[must_use]
pub const fn jc(condition: u16, target: u8) -> u16 {
    0xB000 | (condition & 3) << 8 | target as u16
}

#[must_use]
pub const fn csp(r: u16) -> u16 {
    0xC000 | (r & 3) << 8
}

#[must_use]
pub const fn inc(r: u16) -> u16 {
    0xD000 | (r & 3) << 8
}

/// Instruction sequence loading a full 16-bit constant into `AC[r]`.
#[must_use]
pub const fn load_word(r: u16, value: u16) -> [u16; 2] {
    [li(r, value as u8), lhi(r, (value >> 8) as u8)]
}

impl InstructionSet for TinyIsa {
    fn execute<B: Bus>(&mut self, core: &mut Core, bus: &mut B, opcode: u16) -> Outcome {
        let r = ((opcode >> 8) & 3) as usize;
        let s = ((opcode >> 4) & 3) as usize;
        let imm = opcode & 0x00FF;
        let cycles = match opcode >> 12 {
            0x0 if opcode == NOP => 4,
            0x1 => {
                core.set_ac(r, imm);
                4
            }
            0x2 => {
                core.set_ac(r, imm << 8 | (core.ac(r) & 0x00FF));
                4
            }
            0x3 => {
                bus.write(core.ac(s), core.ac(r));
                8
            }
            0x4 => {
                let value = bus.read(core.ac(s));
                core.set_ac(r, value);
                8
            }
            0x5 => {
                core.push(core.ac(r));
                4
            }
            0x6 => {
                let value = core.pull();
                core.set_ac(r, value);
                4
            }
            0x7 => {
                core.set_flags(core.ac(r));
                4
            }
            0x8 => {
                core.set_ac(r, core.fr());
                4
            }
            0x9 => {
                core.set_pc(opcode & 0x0FFF);
                4
            }
            0xA if opcode == RTI => {
                let target = core.pull();
                core.set_pc(target);
                core.set_flags(core.fr() | IEN);
                8
            }
            0xB => {
                if core.jump_condition(r) {
                    core.set_pc(imm);
                }
                4
            }
            0xC => {
                core.set_stack_pointer(core.ac(r) as u8);
                4
            }
            0xD => {
                core.set_ac(r, core.ac(r).wrapping_add(1));
                4
            }
            _ => return Outcome::Illegal,
        };
        Outcome::Executed { cycles }
    }
}

/// Flag output transitions recorded as `(pin index, new level)`.
pub type PinLog = Rc<RefCell<Vec<(usize, bool)>>>;

/// Builder with every pin connected: flag outputs append to `log`, jump
/// conditions read `conditions`.
#[must_use]
pub fn wired_builder(
    variant: Variant,
    log: &PinLog,
    conditions: &Rc<RefCell<[bool; 3]>>,
) -> PaceBuilder {
    let mut builder = PaceBuilder::new(variant);
    for index in 0..4 {
        let log = Rc::clone(log);
        builder = builder.flag_output(index, move |level| log.borrow_mut().push((index, level)));
    }
    for index in 0..3 {
        let conditions = Rc::clone(conditions);
        builder = builder.jump_condition(index, move || conditions.borrow()[index]);
    }
    builder
}

/// A reset INS8900 running [`TinyIsa`] with pins that do nothing.
#[must_use]
pub fn quiet_pace() -> Pace<TinyIsa> {
    let log = PinLog::default();
    let conditions = Rc::new(RefCell::new([false; 3]));
    let mut cpu = match wired_builder(Variant::Ins8900, &log, &conditions).build(TinyIsa) {
        Ok(cpu) => cpu,
        Err(err) => panic!("fully wired builder rejected: {err}"),
    };
    emu_core::Cpu::reset(&mut cpu);
    cpu
}

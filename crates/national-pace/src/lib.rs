//! National Semiconductor PACE / INS8900 execution shell.
//!
//! PACE was a single-chip four-accumulator 16-bit microprocessor with a
//! 10-word on-chip LIFO stack, six interrupt levels and four flag bits that
//! drive output pins. INS8900 is the NMOS reimplementation: single-phase clock,
//! up to 2 MHz, otherwise functionally identical.
//!
//! This crate models the register file, the flag/interrupt unit and the
//! cycle-budgeted run loop. Instruction semantics are supplied by an
//! [`InstructionSet`] implementation; every instruction is a single word and a
//! machine cycle is 4 clock periods.

mod cpu;
mod error;
pub mod flags;
mod interrupt;
mod isa;
mod processor;
mod registers;
mod state;
mod variant;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use cpu::{Exit, Pace, PaceBuilder, RunSummary};
pub use error::ConfigError;
pub use interrupt::InterruptLevel;
pub use isa::{InstructionSet, Outcome, CLOCKS_PER_MACHINE_CYCLE, INTERRUPT_ENTRY_CYCLES};
pub use processor::{Core, DebugHook, ExtendInput, FlagOutput, JumpCondition};
pub use registers::{clamp_stack_pointer, RegisterId, Registers, STACK_DEPTH};
pub use state::{CpuState, InterruptState};
pub use variant::Variant;

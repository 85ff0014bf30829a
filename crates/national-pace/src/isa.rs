//! Seam between the execution shell and an instruction repertoire.

use emu_core::Bus;

use crate::processor::Core;

/// Clock periods in one machine cycle. The shortest instructions take one.
pub const CLOCKS_PER_MACHINE_CYCLE: u32 = 4;

/// Cost of interrupt entry: stack push plus acknowledge cycle.
pub const INTERRUPT_ENTRY_CYCLES: u32 = 2 * CLOCKS_PER_MACHINE_CYCLE;

/// Result of executing one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Executed in the given number of clock periods (before EXTEND stretch).
    Executed { cycles: u32 },
    /// Not a valid instruction. Runs as a one-machine-cycle no-op.
    Illegal,
}

/// Instruction decode and semantics.
///
/// Called once per instruction with PC already advanced past the opcode.
/// All register and stack effects go through [`Core`] so flag output pins and
/// stack interrupts behave the same for every repertoire.
pub trait InstructionSet {
    fn execute<B: Bus>(&mut self, core: &mut Core, bus: &mut B, opcode: u16) -> Outcome;
}

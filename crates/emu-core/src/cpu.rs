//! CPU core trait.

use crate::{Bus, Ticks};

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed in, not owned, so the owning system can keep peripherals on it and
/// still reach them between runs.
///
/// CPUs expose their internal state for observation and debugging.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute instructions until `budget` clock ticks are spent.
    ///
    /// Returns the ticks actually consumed, which may overshoot the budget
    /// by part of the last instruction.
    fn run<B: Bus>(&mut self, bus: &mut B, budget: Ticks) -> Ticks;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted waiting for an interrupt.
    fn is_halted(&self) -> bool;

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}

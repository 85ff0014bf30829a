//! Core traits and types for cycle-driven emulation.
//!
//! Everything is clocked by the CPU's input clock. Instruction cost, wait
//! states and peripheral timing are all expressed in those clock periods.

mod bus;
mod clock;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;

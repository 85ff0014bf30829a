//! GCM394-family system.
//!
//! Ties a PACE-family CPU to the SunPlus GCM394 (or GeneralPlus GPAC800)
//! peripheral fabric through a single owning [`System`]. The CPU runs
//! against [`SystemBus`], which decodes internal RAM, the peripheral window
//! and the banked chip-select space, and routes the SoC's interrupt line,
//! vector fetch and wait-mode request back to the CPU.
//!
//! Instruction semantics are supplied by the caller as a
//! [`national_pace::InstructionSet`].

mod config;
mod error;
pub mod memory;
pub mod snapshot;
mod system;

pub use config::{SystemConfig, DEFAULT_EXTERNAL_WORDS, MAX_EXTERNAL_WORDS};
pub use error::{ConfigError, SnapshotError};
pub use memory::SystemBus;
pub use snapshot::SystemState;
pub use system::{System, SystemBuilder};

//! Construction-time configuration errors.

use thiserror::Error;

use crate::variant::Variant;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("flag output F{} is not connected", .0 + 11)]
    MissingFlagOutput(usize),

    #[error("jump condition input JC{} is not connected", .0 + 13)]
    MissingJumpCondition(usize),

    #[error("no {pin} pin with index {index}")]
    NoSuchPin { pin: &'static str, index: usize },

    #[error("{variant} clock of {hz} Hz is outside {min}..={max} Hz")]
    ClockOutOfRange {
        variant: Variant,
        hz: u64,
        min: u64,
        max: u64,
    },
}

use thiserror::Error;

/// SoC misconfiguration, reported when the SoC is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required collaborator `{0}` was not connected")]
    MissingCollaborator(&'static str),

    #[error("boot strap {0:#x} does not fit in two pins")]
    BootModeOutOfRange(u8),
}

use thiserror::Error;

/// System construction failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cpu: {0}")]
    Cpu(#[from] national_pace::ConfigError),

    #[error("soc: {0}")]
    Soc(#[from] sunplus_gcm394::ConfigError),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chip-select space of {words:#x} words exceeds the {max:#x} word limit")]
    ExternalSpaceTooLarge { words: usize, max: usize },
}

/// Snapshot decoding failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("not a GCM394 snapshot")]
    BadMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("snapshot truncated at byte {0}")]
    Truncated(usize),

    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),

    #[error("snapshot is for {found}, system is {expected}")]
    VariantMismatch { expected: String, found: String },

    #[error("unknown {what} tag {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    #[error("{what} holds {found} words, system has {expected}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

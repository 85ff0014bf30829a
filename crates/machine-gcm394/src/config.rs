//! System configuration.

use serde::{Deserialize, Serialize};

use sunplus_gcm394::BusNoise;

use crate::error::ConfigError;

/// Default chip-select space: 4M words.
pub const DEFAULT_EXTERNAL_WORDS: usize = 0x40_0000;

/// Largest chip-select space a system will allocate: 16M words.
pub const MAX_EXTERNAL_WORDS: usize = 0x100_0000;

/// Configuration for creating a [`crate::System`].
///
/// Every field has a default, so a JSON document only names what it changes:
///
/// ```
/// # use machine_gcm394::SystemConfig;
/// let config = SystemConfig::from_json(r#"{ "soc": "gpac800", "boot_mode": 2 }"#).unwrap();
/// assert_eq!(config.boot_mode, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    pub soc: sunplus_gcm394::Variant,
    pub cpu: national_pace::Variant,
    /// CPU input clock. Defaults to the CPU variant's fastest legal clock.
    pub clock_hz: Option<u64>,
    /// Boot strap pins (two bits).
    pub boot_mode: u8,
    pub bus_noise: BusNoise,
    /// Clocks added per machine cycle while EXTEND is asserted.
    pub extend_stretch: u32,
    /// Size of chip-select space in words, at most [`MAX_EXTERNAL_WORDS`].
    pub external_words: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            soc: sunplus_gcm394::Variant::default(),
            cpu: national_pace::Variant::default(),
            clock_hz: None,
            boot_mode: 0,
            bus_noise: BusNoise::default(),
            extend_stretch: 1,
            external_words: DEFAULT_EXTERNAL_WORDS,
        }
    }
}

impl SystemConfig {
    /// Parse a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the text is not valid JSON or names
    /// an unknown field or variant.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

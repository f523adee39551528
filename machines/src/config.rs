//! Validated machine configuration.
//!
//! This is not CLI-specific: it is the configuration a host front end
//! hands to the emulation core after parsing whatever flags or files it
//! supports. The struct deserializes from TOML so hosts can persist it.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug)]
pub enum ConfigError {
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// CPU clock in Hz.
    pub cpu_hz: u32,
    /// Serial baud for the bit-level UART.
    pub baud: u32,
    /// Panel key hold time in milliseconds (momentary keys auto-release).
    pub hold_ms: u32,

    /// 64 KiB ROM image.
    pub rom: Option<PathBuf>,
    /// Tape image to attach at startup.
    pub cassette: Option<PathBuf>,
    /// Default path for full-state save/load.
    pub state_file: Option<PathBuf>,
    /// Default path for RAM-only save/load.
    pub ram_file: Option<PathBuf>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            cpu_hz: 2_000_000,
            baud: 9600,
            hold_ms: 50,
            rom: None,
            cassette: None,
            state_file: None,
            ram_file: None,
        }
    }
}

impl MachineConfig {
    /// Parse a TOML document, applying defaults for omitted fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_hz == 0 {
            return Err(ConfigError::Invalid("cpu_hz must be nonzero".into()));
        }
        if self.baud == 0 {
            return Err(ConfigError::Invalid("baud must be nonzero".into()));
        }
        if self.baud > self.cpu_hz {
            return Err(ConfigError::Invalid(
                "baud cannot exceed the CPU clock".into(),
            ));
        }
        Ok(())
    }

    /// Key hold time converted to CPU ticks (minimum 1).
    pub fn hold_cycles(&self) -> u64 {
        (u64::from(self.cpu_hz) / 1000 * u64::from(self.hold_ms)).max(1)
    }
}

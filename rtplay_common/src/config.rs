//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the player's TOML
//! configuration file. Every field has a default, so an absent file or an
//! empty table yields the stock hardware profile.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rtplay_common::config::{ConfigError, PlayerConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = PlayerConfig::load_validated(Path::new("rtplay.toml"))?;
//!     println!("Profile: {}", config.player.profile);
//!     Ok(())
//! }
//! ```
//!
//! # TOML Example
//!
//! ```toml
//! [player]
//! log_level = "debug"
//! profile = "hardware"
//! pwm_chip = "/sys/class/pwm/pwmchip0"
//!
//! [rt]
//! priority = 80
//! stack_size = 65536
//! cpu_core = 1
//! lock_memory = true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    DEFAULT_PWM_CHIP, DEFAULT_RT_PRIORITY, DEFAULT_RT_STACK_SIZE, DIAGNOSTIC_PLAYBACK_PERIOD_US,
    HARDWARE_PLAYBACK_PERIOD_US,
};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Deployment profile of the player.
///
/// Selects the playback period and whether duty values reach the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Slower period, sysfs PWM channels are initialized and written.
    #[default]
    Hardware,
    /// Faster period, angles are printed but no hardware is touched.
    Diagnostic,
}

impl Profile {
    /// Fixed step period between two waypoints.
    pub const fn playback_period(self) -> Duration {
        match self {
            Self::Hardware => Duration::from_micros(HARDWARE_PLAYBACK_PERIOD_US),
            Self::Diagnostic => Duration::from_micros(DIAGNOSTIC_PLAYBACK_PERIOD_US),
        }
    }

    /// Whether this profile drives the PWM hardware.
    pub const fn writes_hardware(self) -> bool {
        matches!(self, Self::Hardware)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => f.write_str("hardware"),
            Self::Diagnostic => f.write_str("diagnostic"),
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardware" => Ok(Self::Hardware),
            "diagnostic" => Ok(Self::Diagnostic),
            other => Err(ConfigError::ValidationError(format!(
                "unknown profile '{other}' (expected 'hardware' or 'diagnostic')"
            ))),
        }
    }
}

/// `[player]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerSection {
    /// Logging verbosity level.
    pub log_level: LogLevel,
    /// Deployment profile.
    pub profile: Profile,
    /// sysfs PWM chip directory (contains `export` and `pwmN/`).
    pub pwm_chip: PathBuf,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            profile: Profile::default(),
            pwm_chip: PathBuf::from(DEFAULT_PWM_CHIP),
        }
    }
}

/// `[rt]` section: real-time attributes of the playback thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RtSection {
    /// SCHED_FIFO priority (1..=99).
    pub priority: i32,
    /// Dedicated stack size of the playback thread [bytes].
    pub stack_size: usize,
    /// CPU core to pin the playback thread to (`None` = no pinning).
    pub cpu_core: Option<usize>,
    /// Lock all current and future pages before playback.
    pub lock_memory: bool,
}

impl Default for RtSection {
    fn default() -> Self {
        Self {
            priority: DEFAULT_RT_PRIORITY,
            stack_size: DEFAULT_RT_STACK_SIZE,
            cpu_core: None,
            lock_memory: true,
        }
    }
}

/// Complete player configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// General player settings.
    pub player: PlayerSection,
    /// Real-time thread settings.
    pub rt: RtSection,
}

impl PlayerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load a configuration file and validate it.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `rt.priority` is outside 1..=99
    /// - `rt.stack_size` is below `PTHREAD_STACK_MIN`
    /// - `player.pwm_chip` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=99).contains(&self.rt.priority) {
            return Err(ConfigError::ValidationError(format!(
                "rt.priority must be within 1..=99, got {}",
                self.rt.priority
            )));
        }
        if self.rt.stack_size < libc::PTHREAD_STACK_MIN {
            return Err(ConfigError::ValidationError(format!(
                "rt.stack_size must be at least {} bytes, got {}",
                libc::PTHREAD_STACK_MIN,
                self.rt.stack_size
            )));
        }
        if self.player.pwm_chip.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "player.pwm_chip cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

//! Prelude module for common re-exports.
//!
//! ```rust
//! use rtplay_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, PlayerConfig, Profile};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CHANNEL_COUNT, PWM_CARRIER_PERIOD_NS};

// ─── PWM Interface ──────────────────────────────────────────────────
pub use crate::pwm::{DutyHandle, PwmBackend, PwmError};

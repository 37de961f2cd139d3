//! PWM backend trait and error types.
//!
//! This module defines:
//! - `PwmBackend` trait - Interface for the actuator control surface
//! - `DutyHandle` trait - One opened duty-cycle interface (released on drop)
//! - `PwmError` enum - Error types for PWM operations
//! - `format_duty()` - Allocation-free decimal rendering of a duty value

use crate::consts::DUTY_TEXT_CAPACITY;
use core::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for PWM operations.
///
/// Every variant carries the control file that failed so the operator can
/// see which channel is missing.
#[derive(Debug, Error)]
pub enum PwmError {
    /// A control file could not be opened.
    #[error("can't open {path}: {source}")]
    Open {
        /// Offending control file.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A control file was opened but the value could not be written.
    #[error("can't write {path}: {source}")]
    Write {
        /// Offending control file.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Channel index outside the configured channel range.
    #[error("channel {channel} out of range (0..{count})")]
    ChannelOutOfRange {
        /// Requested channel.
        channel: usize,
        /// Number of channels.
        count: usize,
    },
}

impl PwmError {
    /// Path of the control file involved, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Open { path, .. } | Self::Write { path, .. } => Some(path),
            Self::ChannelOutOfRange { .. } => None,
        }
    }
}

/// One duty-cycle control interface, opened for a single playback iteration.
///
/// Implementations release the underlying resource when dropped, so the
/// interface is closed on every exit path of the iteration.
pub trait DutyHandle {
    /// Write a duty value [ns] as ASCII decimal.
    fn write_duty(&mut self, duty_ns: u32) -> Result<(), PwmError>;
}

/// Trait defining the actuator control surface.
///
/// # Lifecycle
///
/// 1. `prepare_channel()` - Called once per channel before playback
/// 2. `open_duty()` - Called per channel on every playback iteration
///
/// # Timing Contracts
///
/// | Operation | RT Constraint |
/// |-----------|---------------|
/// | `prepare_channel()` | None (pre-RT) |
/// | `open_duty()` + `write_duty()` | Inside the playback period |
pub trait PwmBackend {
    /// Handle type returned by `open_duty()`.
    type Handle: DutyHandle;

    /// Returns the backend's identifier (e.g., "sysfs", "null").
    fn name(&self) -> &'static str;

    /// Export (if needed), configure the carrier period and enable a channel.
    fn prepare_channel(&mut self, channel: usize, carrier_period_ns: u64)
        -> Result<(), PwmError>;

    /// Open the duty-cycle interface of a channel for one iteration.
    fn open_duty(&mut self, channel: usize) -> Result<Self::Handle, PwmError>;
}

/// Render a duty value as decimal text without touching the heap.
pub fn format_duty(duty_ns: u32) -> heapless::String<DUTY_TEXT_CAPACITY> {
    let mut text = heapless::String::new();
    // Capacity covers every u32, the write cannot fail.
    let _ = write!(text, "{duty_ns}");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duty() {
        assert_eq!(format_duty(0).as_str(), "0");
        assert_eq!(format_duty(1_550_000).as_str(), "1550000");
        assert_eq!(format_duty(u32::MAX).as_str(), "4294967295");
    }

    #[test]
    fn test_pwm_error_display_names_path() {
        let err = PwmError::Open {
            path: PathBuf::from("/sys/class/pwm/pwmchip0/pwm1/duty_cycle"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("can't open /sys/class/pwm/pwmchip0/pwm1/duty_cycle"));
        assert_eq!(
            err.path(),
            Some(std::path::Path::new("/sys/class/pwm/pwmchip0/pwm1/duty_cycle"))
        );
    }

    #[test]
    fn test_channel_out_of_range_has_no_path() {
        let err = PwmError::ChannelOutOfRange { channel: 5, count: 3 };
        assert!(err.path().is_none());
        assert!(err.to_string().contains("channel 5"));
    }
}

//! System-wide constants for the rtplay workspace.
//!
//! Single source of truth for calibration values, periods and default paths.
//! Shared by the player and its tests.

use static_assertions::const_assert;

/// Number of PWM channels driven by the player (one per actuator).
pub const CHANNEL_COUNT: usize = 3;

/// Linear duty model scale [ns of pulse per degree].
pub const DUTY_MODEL_M: f64 = 531_034.0;

/// Linear duty model offset [ns of pulse at 0°].
pub const DUTY_MODEL_H: f64 = 1_550_000.0;

/// PWM carrier period written to every channel at startup [ns] (50 Hz).
pub const PWM_CARRIER_PERIOD_NS: u64 = 20_000_000;

/// Playback period of the hardware-backed profile [µs].
pub const HARDWARE_PLAYBACK_PERIOD_US: u64 = 40_000;

/// Playback period of the diagnostic-only profile [µs].
pub const DIAGNOSTIC_PLAYBACK_PERIOD_US: u64 = 10_000;

/// Line prefix identifying a position command in the input stream.
pub const COMMAND_PREFIX: &str = "rt-cmd:POS";

/// Default sysfs PWM chip directory.
pub const DEFAULT_PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

/// Default SCHED_FIFO priority of the playback thread.
pub const DEFAULT_RT_PRIORITY: i32 = 80;

/// Default stack size of the playback thread [bytes].
pub const DEFAULT_RT_STACK_SIZE: usize = 64 * 1024;

/// Capacity of the decimal text buffer for one duty value (`u32::MAX` has 10 digits).
pub const DUTY_TEXT_CAPACITY: usize = 10;

// Neutral pulse must fit inside one carrier period; the model must be increasing.
const_assert!(DUTY_MODEL_H < PWM_CARRIER_PERIOD_NS as f64);
const_assert!(DUTY_MODEL_M > 0.0);
const_assert!(DIAGNOSTIC_PLAYBACK_PERIOD_US < HARDWARE_PLAYBACK_PERIOD_US);
const_assert!(DEFAULT_RT_PRIORITY >= 1 && DEFAULT_RT_PRIORITY <= 99);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert_eq!(CHANNEL_COUNT, 3);
        assert!(DUTY_MODEL_M > 0.0);
        assert!(DUTY_MODEL_H > 0.0);
        assert!(HARDWARE_PLAYBACK_PERIOD_US > 0);
        assert!(DIAGNOSTIC_PLAYBACK_PERIOD_US > 0);
    }

    #[test]
    fn neutral_pulse_fits_carrier() {
        assert!((DUTY_MODEL_H as u64) < PWM_CARRIER_PERIOD_NS);
    }

    #[test]
    fn duty_text_capacity_fits_u32() {
        assert_eq!(u32::MAX.to_string().len(), DUTY_TEXT_CAPACITY);
    }
}

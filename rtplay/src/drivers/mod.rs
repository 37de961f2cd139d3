//! PWM backend implementations.
//!
//! - [`sysfs`] - Linux sysfs PWM chip (`/sys/class/pwm/pwmchipN`)
//! - [`null`] - No-op backend for the diagnostic profile
//!
//! Both implement [`rtplay_common::pwm::PwmBackend`].

pub mod null;
pub mod sysfs;

pub use null::{NullDuty, NullPwm};
pub use sysfs::{SysfsDuty, SysfsPwm};

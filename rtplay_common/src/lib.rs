//! rtplay Common Library
//!
//! This crate provides the constants, configuration loading and hardware
//! interface shared by the rtplay workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Calibration constants, periods and default paths
//! - [`config`] - Configuration loading traits and types
//! - [`pwm`] - PWM backend trait and error types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rtplay_common::prelude::*;
//!
//! assert_eq!(CHANNEL_COUNT, 3);
//! assert!(Profile::Hardware.playback_period() > Profile::Diagnostic.playback_period());
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod pwm;

//! # rtplay Library
//!
//! Replays a recorded three-servo trajectory on sysfs PWM channels with hard
//! periodic timing. Position commands (`rt-cmd:POS x y z`) are collected
//! from a line stream, converted to duty-cycle values, and played back one
//! per period from a dedicated SCHED_FIFO thread.
//!
//! ## Components
//!
//! 1. **duty**: angle → duty-cycle model
//! 2. **trajectory**: waypoints parsed from the command stream
//! 3. **channel** / **drivers**: PWM channel setup and backends
//! 4. **engine**: absolute-deadline playback loop
//! 5. **rt** / **player**: RT setup and orchestration
//!
//! ## Drift-Free Pacing
//!
//! The playback loop sleeps with `clock_nanosleep(TIMER_ABSTIME)` on
//! `CLOCK_MONOTONIC`. Each deadline is the previous deadline plus one
//! period, independent of how long the previous iteration took.

pub mod channel;
pub mod clock;
pub mod drivers;
pub mod duty;
pub mod engine;
pub mod error;
pub mod player;
pub mod rt;
pub mod trajectory;

pub use crate::engine::{EngineState, PlaybackEngine, PlaybackError, PlaybackReport};
pub use crate::error::PlayerError;
pub use crate::player::{PlayerOptions, run_player};
pub use crate::trajectory::{Trajectory, Waypoint};

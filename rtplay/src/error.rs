//! Top-level player error and process exit codes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | playback complete |
//! | 1 | hardware failure during playback |
//! | 2 | channel export/configure/enable failed |
//! | 3 | memory locking failed |
//! | 4 | scheduling attributes rejected |
//! | 5 | input stream or configuration unusable |
//! | 6 | playback thread could not be spawned or panicked |

use rtplay_common::config::ConfigError;
use rtplay_common::pwm::PwmError;
use thiserror::Error;

use crate::engine::PlaybackError;
use crate::rt::RtError;
use crate::trajectory::TrajectoryError;

/// Exit code for a hardware failure inside the playback loop.
pub const EXIT_PLAYBACK: i32 = 1;
/// Exit code for a channel setup failure.
pub const EXIT_CHANNEL_SETUP: i32 = 2;
/// Exit code for a memory locking failure.
pub const EXIT_MEMORY_LOCK: i32 = 3;
/// Exit code for a scheduling setup failure.
pub const EXIT_SCHEDULING: i32 = 4;
/// Exit code for unusable input or configuration.
pub const EXIT_INPUT: i32 = 5;
/// Exit code for playback thread failures.
pub const EXIT_THREAD: i32 = 6;

/// Every failure that ends the player process.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Reading the command stream failed.
    #[error(transparent)]
    Input(#[from] TrajectoryError),

    /// The configuration file is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A PWM channel could not be prepared.
    #[error("channel setup failed: {0}")]
    ChannelSetup(#[source] PwmError),

    /// Pages could not be locked.
    #[error(transparent)]
    MemoryLock(RtError),

    /// Policy, priority, affinity or stack configuration failed.
    #[error(transparent)]
    Scheduling(RtError),

    /// The playback thread could not be created or died.
    #[error("playback thread failure: {0}")]
    Thread(String),

    /// Playback stopped early.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl From<RtError> for PlayerError {
    fn from(e: RtError) -> Self {
        match e {
            RtError::MemoryLock(_) => Self::MemoryLock(e),
            RtError::Spawn(ref io) => Self::Thread(io.to_string()),
            RtError::InvalidConfig(_) | RtError::Scheduling(_) | RtError::Affinity(_) => {
                Self::Scheduling(e)
            }
        }
    }
}

impl PlayerError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Playback(_) => EXIT_PLAYBACK,
            Self::ChannelSetup(_) => EXIT_CHANNEL_SETUP,
            Self::MemoryLock(_) => EXIT_MEMORY_LOCK,
            Self::Scheduling(_) => EXIT_SCHEDULING,
            Self::Input(_) | Self::Config(_) => EXIT_INPUT,
            Self::Thread(_) => EXIT_THREAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let errors = [
            PlayerError::Playback(PlaybackError::AlreadyDone),
            PlayerError::ChannelSetup(PwmError::ChannelOutOfRange { channel: 3, count: 3 }),
            PlayerError::MemoryLock(RtError::MemoryLock(nix::errno::Errno::ENOMEM)),
            PlayerError::Scheduling(RtError::Scheduling("EPERM".into())),
            PlayerError::Config(ConfigError::ValidationError("x".into())),
            PlayerError::Thread("panic".into()),
        ];
        let codes: HashSet<i32> = errors.iter().map(PlayerError::exit_code).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn rt_errors_map_to_tiers() {
        let e: PlayerError = RtError::MemoryLock(nix::errno::Errno::EPERM).into();
        assert_eq!(e.exit_code(), EXIT_MEMORY_LOCK);

        let e: PlayerError = RtError::Affinity("bad core".into()).into();
        assert_eq!(e.exit_code(), EXIT_SCHEDULING);

        let e: PlayerError = RtError::InvalidConfig("priority".into()).into();
        assert_eq!(e.exit_code(), EXIT_SCHEDULING);

        let e: PlayerError = RtError::Spawn(std::io::Error::other("no threads")).into();
        assert_eq!(e.exit_code(), EXIT_THREAD);
    }

    #[test]
    fn channel_setup_message_names_path() {
        let e = PlayerError::ChannelSetup(PwmError::Open {
            path: PathBuf::from("/sys/class/pwm/pwmchip0/pwm2/enable"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(e.to_string().contains("/sys/class/pwm/pwmchip0/pwm2/enable"));
        assert_eq!(e.exit_code(), EXIT_CHANNEL_SETUP);
    }
}

//! Orchestration: read → prepare channels → lock memory → play → join.
//!
//! The trajectory is owned here for the whole run. The playback thread only
//! borrows it (scoped thread), and it is dropped after the thread is joined.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use rtplay_common::config::{PlayerConfig, Profile};
use rtplay_common::pwm::PwmBackend;
use tracing::{info, warn};

use crate::channel::init_channels;
use crate::clock::MonotonicClock;
use crate::drivers::{NullPwm, SysfsPwm};
use crate::engine::{PlaybackEngine, PlaybackReport};
use crate::error::PlayerError;
use crate::rt::{RtConfig, lock_memory, realtime_enabled, spawn_playback};
use crate::trajectory::Trajectory;

/// Resolved run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOptions {
    /// Deployment profile (period + hardware on/off).
    pub profile: Profile,
    /// sysfs PWM chip directory.
    pub pwm_chip: PathBuf,
    /// Playback thread attributes.
    pub rt: RtConfig,
}

impl From<&PlayerConfig> for PlayerOptions {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            profile: config.player.profile,
            pwm_chip: config.player.pwm_chip.clone(),
            rt: RtConfig::from(&config.rt),
        }
    }
}

/// Run the whole player: collect the trajectory from `input`, then play it.
///
/// Diagnostic lines go to `out`. Returns the playback report on success.
pub fn run_player<R, W>(
    input: R,
    options: &PlayerOptions,
    out: W,
) -> Result<PlaybackReport, PlayerError>
where
    R: BufRead,
    W: Write + Send,
{
    let trajectory = Trajectory::from_reader(input)?;
    info!("Trajectory loaded: {} waypoints", trajectory.len());

    let report = if options.profile.writes_hardware() {
        if realtime_degraded(options.profile) {
            warn!(
                "Built without the `rt` feature: memory locking and {:?} priority {} are not applied",
                options.rt.policy, options.rt.priority
            );
        }
        let mut backend = SysfsPwm::new(&options.pwm_chip);
        init_channels(&mut backend).map_err(PlayerError::ChannelSetup)?;
        play(&trajectory, backend, options, out)?
    } else {
        info!("Diagnostic profile: hardware writes disabled");
        play(&trajectory, NullPwm, options, out)?
    };

    drop(trajectory);
    Ok(report)
}

/// True when `profile` drives hardware but the RT calls are compiled out.
pub fn realtime_degraded(profile: Profile) -> bool {
    profile.writes_hardware() && !realtime_enabled()
}

/// Lock memory, start the playback thread and block until it finishes.
fn play<B, W>(
    trajectory: &Trajectory,
    backend: B,
    options: &PlayerOptions,
    out: W,
) -> Result<PlaybackReport, PlayerError>
where
    B: PwmBackend + Send,
    W: Write + Send,
{
    lock_memory(&options.rt)?;

    let period = options.profile.playback_period();
    let outcome = std::thread::scope(|scope| -> Result<_, PlayerError> {
        let handle = spawn_playback(scope, &options.rt, move || {
            let mut engine = PlaybackEngine::new(backend, MonotonicClock, out, period);
            engine.run(trajectory)
        })?;
        handle
            .join()
            .map_err(|_| PlayerError::Thread("playback thread panicked".to_string()))
    })?;

    Ok(outcome??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::SchedInheritance;
    #[cfg(feature = "rt")]
    use crate::rt::RtError;
    use std::io::Cursor;

    fn diagnostic_options() -> PlayerOptions {
        PlayerOptions {
            profile: Profile::Diagnostic,
            pwm_chip: PathBuf::from("/nonexistent"),
            rt: RtConfig {
                inheritance: SchedInheritance::Inherit,
                lock_memory: false,
                ..RtConfig::default()
            },
        }
    }

    #[test]
    fn options_from_default_config() {
        let options = PlayerOptions::from(&PlayerConfig::default());
        assert_eq!(options.profile, Profile::Hardware);
        assert_eq!(options.pwm_chip, PathBuf::from("/sys/class/pwm/pwmchip0"));
        assert_eq!(options.rt, RtConfig::default());
    }

    #[test]
    fn diagnostic_run_prints_angles() {
        let mut out = Vec::new();
        let report = run_player(
            Cursor::new("rt-cmd:POS 1 2 3\nnoise\nrt-cmd:POS 4 5 6\n"),
            &diagnostic_options(),
            &mut out,
        )
        .unwrap();
        assert_eq!(report.iterations, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1.000000 2.000000 3.000000\n4.000000 5.000000 6.000000\n"
        );
    }

    #[test]
    fn empty_input_succeeds_with_zero_iterations() {
        let mut out = Vec::new();
        let report = run_player(Cursor::new(""), &diagnostic_options(), &mut out).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn hardware_profile_without_chip_fails_setup() {
        let options = PlayerOptions {
            profile: Profile::Hardware,
            ..diagnostic_options()
        };
        let err = run_player(Cursor::new("rt-cmd:POS 1 2 3\n"), &options, Vec::new()).unwrap_err();
        assert!(matches!(err, PlayerError::ChannelSetup(_)));
        assert_eq!(err.exit_code(), crate::error::EXIT_CHANNEL_SETUP);
    }

    #[test]
    fn realtime_degraded_only_for_hardware_without_rt() {
        assert!(!realtime_degraded(Profile::Diagnostic));
        assert_eq!(realtime_degraded(Profile::Hardware), !cfg!(feature = "rt"));
    }

    #[cfg(feature = "rt")]
    #[test]
    fn thread_setup_failure_plays_nothing() {
        let mut options = diagnostic_options();
        options.rt.cpu_core = Some(100_000);
        let mut out = Vec::new();
        let err = run_player(Cursor::new("rt-cmd:POS 1 2 3\n"), &options, &mut out).unwrap_err();
        assert!(matches!(err, PlayerError::Scheduling(RtError::Affinity(_))));
        assert_eq!(err.exit_code(), crate::error::EXIT_SCHEDULING);
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_rt_config_is_scheduling_error() {
        let mut options = diagnostic_options();
        options.rt.inheritance = SchedInheritance::Explicit;
        options.rt.priority = 0;
        let err = run_player(Cursor::new(""), &options, Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_SCHEDULING);
    }
}

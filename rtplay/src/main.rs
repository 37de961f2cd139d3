//! # rtplay
//!
//! Real-time replay of a recorded servo trajectory.
//!
//! Reads `rt-cmd:POS x y z` lines from stdin (or `--input`), prepares the
//! three sysfs PWM channels, locks memory and plays one waypoint per period
//! from a SCHED_FIFO thread. The commanded angles are echoed on stdout; logs
//! go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Hardware profile, commands from a recorded file
//! cat recorded.txt | rtplay
//!
//! # Diagnostic profile (no hardware writes), verbose logging
//! rtplay --profile diagnostic --input recorded.txt -v
//!
//! # Settings from file, CLI overrides win
//! rtplay --config /etc/rtplay.toml --rt-priority 90
//! ```

use clap::Parser;
use rtplay::error::EXIT_INPUT;
use rtplay::trajectory::TrajectoryError;
use rtplay::{PlayerError, PlayerOptions, run_player};
use rtplay_common::config::{ConfigError, LogLevel, PlayerConfig, Profile};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// rtplay: real-time servo trajectory player
#[derive(Parser, Debug)]
#[command(name = "rtplay")]
#[command(version)]
#[command(about = "Replays rt-cmd:POS trajectories on sysfs PWM channels with hard periodic timing")]
struct Args {
    /// Optional TOML configuration file ([player] and [rt] sections).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read commands from this file instead of stdin.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Deployment profile: `hardware` or `diagnostic`.
    #[arg(short, long)]
    profile: Option<Profile>,

    /// sysfs PWM chip directory.
    #[arg(long, value_name = "DIR")]
    pwm_chip: Option<PathBuf>,

    /// SCHED_FIFO priority of the playback thread.
    #[arg(long)]
    rt_priority: Option<i32>,

    /// CPU core to pin the playback thread to.
    #[arg(long)]
    cpu_core: Option<usize>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    let log_level = config
        .as_ref()
        .map(|c| c.player.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    info!("rtplay v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(EXIT_INPUT);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(e.exit_code());
    }

    info!("rtplay finished");
}

fn run(args: &Args, config: &PlayerConfig) -> Result<(), PlayerError> {
    let options = PlayerOptions::from(config);
    info!(
        "Config OK: profile={}, period={}µs, chip={}, priority={}",
        options.profile,
        options.profile.playback_period().as_micros(),
        options.pwm_chip.display(),
        options.rt.priority
    );

    let stdout = io::stdout();
    let report = match &args.input {
        Some(path) => {
            let file = File::open(path).map_err(|source| TrajectoryError::Open {
                path: path.clone(),
                source,
            })?;
            run_player(BufReader::new(file), &options, stdout)?
        }
        None => run_player(io::stdin().lock(), &options, stdout)?,
    };

    info!("Played {} waypoints", report.iterations);
    Ok(())
}

/// Load the optional config file and apply CLI overrides.
fn load_config(args: &Args) -> Result<PlayerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => PlayerConfig::load_validated(path)?,
        None => PlayerConfig::default(),
    };

    if let Some(profile) = args.profile {
        config.player.profile = profile;
    }
    if let Some(ref chip) = args.pwm_chip {
        config.player.pwm_chip = chip.clone();
    }
    if let Some(priority) = args.rt_priority {
        config.rt.priority = priority;
    }
    if args.cpu_core.is_some() {
        config.rt.cpu_core = args.cpu_core;
    }

    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber on stderr; stdout carries the angle lines.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}

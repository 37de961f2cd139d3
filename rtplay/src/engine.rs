//! Periodic playback of a trajectory: sleep → open → print → write.
//!
//! ## State Machine
//! `Ready → Running → Done`. `Done` is terminal and is reached when the
//! trajectory is exhausted or when a hardware interface fails.
//!
//! ## Timing
//! The deadline starts at the clock reading taken on entry to `Running` and
//! advances by exactly one period before every wait:
//! `deadline_k = start + k · period`. Time spent opening and writing the
//! control files shows up as jitter of one iteration, never as drift. An
//! overrun is counted, and the next wait simply returns immediately; no
//! waypoint is ever skipped.
//!
//! ## Iteration Body
//! 1. Open all duty interfaces (any failure aborts, nothing is written).
//! 2. Print the commanded angles on the diagnostic stream.
//! 3. Write the three duty values.
//! 4. Drop the handles (closes the files on every path).

use std::io::Write;
use std::time::Duration;

use rtplay_common::consts::CHANNEL_COUNT;
use rtplay_common::pwm::{DutyHandle, PwmBackend, PwmError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::clock::{ClockError, PlaybackClock, timespec_add_ns, timespec_diff_ns};
use crate::trajectory::{Trajectory, Waypoint};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-iteration timing statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Iterations executed.
    pub cycle_count: u64,
    /// Last iteration duration (wake → handles released) [ns].
    pub last_cycle_ns: i64,
    /// Minimum iteration duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum iteration duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Iterations that ended after the next deadline.
    pub overruns: u64,
    /// Maximum wake-up latency (actual wake − deadline) [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one iteration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average iteration time [ns] (returns 0 if no iterations).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Longest accepted playback period.
pub const MAX_PLAYBACK_PERIOD: Duration = Duration::from_secs(3600);

/// Lifecycle of a [`PlaybackEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Constructed, nothing played yet.
    #[default]
    Ready,
    /// Walking the trajectory.
    Running,
    /// Trajectory exhausted or aborted (terminal).
    Done,
}

/// Errors that end playback early.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A duty interface could not be opened or written.
    #[error("hardware failure at waypoint {index}: {source}")]
    Hardware {
        /// 0-based index of the waypoint being played.
        index: usize,
        /// Underlying PWM error.
        #[source]
        source: PwmError,
    },

    /// The clock could not be read or waited on.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// `run()` was called on an engine that already finished.
    #[error("playback engine already finished")]
    AlreadyDone,
}

/// Summary of a completed playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Waypoints played.
    pub iterations: usize,
    /// Timing statistics.
    pub stats: CycleStats,
}

/// Plays a [`Trajectory`] at a fixed period on a [`PwmBackend`].
pub struct PlaybackEngine<B, C, W> {
    backend: B,
    clock: C,
    out: W,
    period_ns: i64,
    state: EngineState,
    stats: CycleStats,
}

impl<B, C, W> PlaybackEngine<B, C, W>
where
    B: PwmBackend,
    C: PlaybackClock,
    W: Write,
{
    /// Create an engine in the `Ready` state.
    ///
    /// `out` receives one line per waypoint with the commanded angles.
    /// Periods above [`MAX_PLAYBACK_PERIOD`] are clamped to it.
    pub fn new(backend: B, clock: C, out: W, period: Duration) -> Self {
        if period > MAX_PLAYBACK_PERIOD {
            warn!(
                "Playback period {:?} clamped to {:?}",
                period, MAX_PLAYBACK_PERIOD
            );
        }
        let period = period.min(MAX_PLAYBACK_PERIOD);
        Self {
            backend,
            clock,
            out,
            period_ns: period.as_nanos() as i64,
            state: EngineState::Ready,
            stats: CycleStats::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Playback period [ns].
    pub fn period_ns(&self) -> i64 {
        self.period_ns
    }

    /// Release the backend, clock and diagnostic writer.
    pub fn into_parts(self) -> (B, C, W) {
        (self.backend, self.clock, self.out)
    }

    /// Play every waypoint in order, one per period.
    ///
    /// # Errors
    /// - `PlaybackError::Hardware` on the first open/write failure; later
    ///   waypoints are not played.
    /// - `PlaybackError::Clock` if the clock fails.
    /// - `PlaybackError::AlreadyDone` if called twice.
    pub fn run(&mut self, trajectory: &Trajectory) -> Result<PlaybackReport, PlaybackError> {
        if self.state != EngineState::Ready {
            return Err(PlaybackError::AlreadyDone);
        }

        self.state = EngineState::Running;
        info!(
            "Playback started: {} waypoints, period={}µs, backend={}",
            trajectory.len(),
            self.period_ns / 1000,
            self.backend.name()
        );

        let result = self.run_loop(trajectory);
        self.state = EngineState::Done;

        if let Err(e) = self.out.flush() {
            warn!("Failed to flush diagnostic output: {e}");
        }

        match &result {
            Ok(report) => info!(
                "Playback done: {} iterations, avg={}ns, max={}ns, max_latency={}ns, overruns={}",
                report.iterations,
                report.stats.avg_cycle_ns(),
                report.stats.max_cycle_ns,
                report.stats.max_latency_ns,
                report.stats.overruns
            ),
            Err(e) => error!(
                "Playback aborted after {} iterations: {e}",
                self.stats.cycle_count
            ),
        }
        result
    }

    fn run_loop(&mut self, trajectory: &Trajectory) -> Result<PlaybackReport, PlaybackError> {
        let mut deadline = self.clock.now()?;

        for (index, waypoint) in trajectory.iter().enumerate() {
            deadline = timespec_add_ns(deadline, self.period_ns);
            self.clock.sleep_until(&deadline)?;

            let wake = self.clock.now()?;
            self.play_waypoint(waypoint)
                .map_err(|source| PlaybackError::Hardware { index, source })?;
            let end = self.clock.now()?;

            self.stats.record(
                timespec_diff_ns(&end, &wake),
                timespec_diff_ns(&wake, &deadline),
            );

            let behind_ns = timespec_diff_ns(&end, &deadline) - self.period_ns;
            if behind_ns > 0 {
                self.stats.overruns += 1;
                if self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0 {
                    warn!(
                        "Overrun #{} at waypoint {}: next deadline missed by {}ns",
                        self.stats.overruns, index, behind_ns
                    );
                }
            }

            debug!(
                "Waypoint {} played: duties={:?}",
                index,
                waypoint.duties()
            );
        }

        Ok(PlaybackReport {
            iterations: trajectory.len(),
            stats: self.stats.clone(),
        })
    }

    /// Open → print → write for one waypoint. Handles drop on every path.
    fn play_waypoint(&mut self, waypoint: &Waypoint) -> Result<(), PwmError> {
        let mut handles: heapless::Vec<B::Handle, CHANNEL_COUNT> = heapless::Vec::new();
        for channel in 0..CHANNEL_COUNT {
            let handle = self.backend.open_duty(channel)?;
            // Capacity equals CHANNEL_COUNT, push cannot fail.
            let _ = handles.push(handle);
        }

        let [a0, a1, a2] = waypoint.angles();
        if let Err(e) = writeln!(self.out, "{a0:.6} {a1:.6} {a2:.6}") {
            warn!("Failed to write diagnostic line: {e}");
        }

        for (handle, duty) in handles.iter_mut().zip(waypoint.duties()) {
            handle.write_duty(duty)?;
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

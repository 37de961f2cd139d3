//! Absolute-deadline clock for the playback loop.
//!
//! Deadlines are absolute `CLOCK_MONOTONIC` timestamps. Waiting uses
//! `clock_nanosleep(TIMER_ABSTIME)`, so the time spent in one iteration never
//! moves the deadline of the next one.

use nix::errno::Errno;
use nix::sys::time::TimeSpec;
use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};
use thiserror::Error;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Errors from clock system calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// `clock_gettime` failed.
    #[error("clock_gettime failed: {0}")]
    Read(Errno),
    /// `clock_nanosleep` failed with something other than `EINTR`.
    #[error("clock_nanosleep failed: {0}")]
    Sleep(Errno),
}

/// Time source and absolute wait used by the playback engine.
pub trait PlaybackClock {
    /// Current time on this clock.
    fn now(&mut self) -> Result<TimeSpec, ClockError>;

    /// Suspend until the clock reaches `deadline`.
    ///
    /// Returns immediately if the deadline already passed.
    fn sleep_until(&mut self, deadline: &TimeSpec) -> Result<(), ClockError>;
}

/// `CLOCK_MONOTONIC` with `TIMER_ABSTIME` sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl PlaybackClock for MonotonicClock {
    fn now(&mut self) -> Result<TimeSpec, ClockError> {
        clock_gettime(ClockId::CLOCK_MONOTONIC).map_err(ClockError::Read)
    }

    fn sleep_until(&mut self, deadline: &TimeSpec) -> Result<(), ClockError> {
        loop {
            match clock_nanosleep(
                ClockId::CLOCK_MONOTONIC,
                ClockNanosleepFlags::TIMER_ABSTIME,
                deadline,
            ) {
                Ok(_) => return Ok(()),
                // Same absolute deadline on retry, signals cannot shift it.
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ClockError::Sleep(e)),
            }
        }
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec, keeping `tv_nsec` normalized.
pub fn timespec_add_ns(ts: TimeSpec, ns: i64) -> TimeSpec {
    let total = ts.tv_nsec() as i64 + ns;
    let secs = ts.tv_sec() as i64 + total.div_euclid(NANOS_PER_SEC);
    let nanos = total.rem_euclid(NANOS_PER_SEC);
    TimeSpec::new(secs as _, nanos as _)
}

/// Compute the difference (a - b) in nanoseconds.
pub fn timespec_diff_ns(a: &TimeSpec, b: &TimeSpec) -> i64 {
    (a.tv_sec() as i64 - b.tv_sec() as i64) * NANOS_PER_SEC
        + (a.tv_nsec() as i64 - b.tv_nsec() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_carries_into_seconds() {
        let ts = timespec_add_ns(TimeSpec::new(10, 999_000_000), 2_000_000);
        assert_eq!(ts.tv_sec(), 11);
        assert_eq!(ts.tv_nsec(), 1_000_000);
    }

    #[test]
    fn add_exact_second_boundary() {
        // Lands exactly on 1e9 ns: must normalize to the next second.
        let ts = timespec_add_ns(TimeSpec::new(5, 960_000_000), 40_000_000);
        assert_eq!(ts.tv_sec(), 6);
        assert_eq!(ts.tv_nsec(), 0);
    }

    #[test]
    fn add_multiple_seconds_and_negative() {
        let ts = timespec_add_ns(TimeSpec::new(1, 0), 3_500_000_000);
        assert_eq!((ts.tv_sec(), ts.tv_nsec()), (4, 500_000_000));
        let ts = timespec_add_ns(TimeSpec::new(1, 100), -200);
        assert_eq!((ts.tv_sec(), ts.tv_nsec()), (0, 999_999_900));
    }

    #[test]
    fn diff_is_signed() {
        let a = TimeSpec::new(2, 100);
        let b = TimeSpec::new(1, 999_999_900);
        assert_eq!(timespec_diff_ns(&a, &b), 200);
        assert_eq!(timespec_diff_ns(&b, &a), -200);
    }

    #[test]
    fn repeated_adds_do_not_drift() {
        let start = TimeSpec::new(100, 123_456_789);
        let mut deadline = start;
        for _ in 0..1000 {
            deadline = timespec_add_ns(deadline, 40_000_000);
        }
        assert_eq!(timespec_diff_ns(&deadline, &start), 40_000_000_000);
    }

    #[test]
    fn monotonic_clock_sleeps_past_deadline() {
        let mut clock = MonotonicClock;
        let start = clock.now().unwrap();
        let deadline = timespec_add_ns(start, 2_000_000);
        clock.sleep_until(&deadline).unwrap();
        let after = clock.now().unwrap();
        assert!(timespec_diff_ns(&after, &deadline) >= 0);
    }

    #[test]
    fn monotonic_clock_past_deadline_returns() {
        let mut clock = MonotonicClock;
        let past = timespec_add_ns(clock.now().unwrap(), -1_000_000);
        assert!(clock.sleep_until(&past).is_ok());
    }
}

//! Recorded trajectory: waypoints parsed from the command stream.
//!
//! A [`Trajectory`] is built once from a line-oriented stream and is
//! read-only afterwards. Lines of the form `rt-cmd:POS <x> <y> <z>` each
//! contribute one [`Waypoint`]; every other line is skipped.

use std::io::BufRead;

use rtplay_common::consts::{CHANNEL_COUNT, COMMAND_PREFIX};
use thiserror::Error;
use tracing::debug;

use crate::duty::angles_to_duties;

/// Errors while reading the command stream.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    /// The input file could not be opened.
    #[error("cannot open input {}: {source}", .path.display())]
    Open {
        /// Input file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The underlying reader failed.
    #[error("failed to read command stream at line {line}: {source}")]
    Read {
        /// 1-based line number of the failed read.
        line: usize,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// One commanded actuator state.
///
/// Duty values are derived from the angles at construction and never change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    angles: [f32; CHANNEL_COUNT],
    duties: [u32; CHANNEL_COUNT],
}

impl Waypoint {
    /// Build a waypoint, deriving the duty values from the angles.
    pub fn new(angles: [f32; CHANNEL_COUNT]) -> Self {
        Self {
            angles,
            duties: angles_to_duties(angles),
        }
    }

    /// Commanded angles.
    #[inline]
    pub fn angles(&self) -> [f32; CHANNEL_COUNT] {
        self.angles
    }

    /// Duty-cycle values [ns], one per channel.
    #[inline]
    pub fn duties(&self) -> [u32; CHANNEL_COUNT] {
        self.duties
    }
}

/// Parse one command line.
///
/// Returns `None` for anything that is not a complete position command.
/// Tokens after the third angle are ignored.
pub fn parse_command(line: &str) -> Option<[f32; CHANNEL_COUNT]> {
    let rest = line.strip_prefix(COMMAND_PREFIX)?;
    let mut tokens = rest.split_whitespace();
    let mut angles = [0.0_f32; CHANNEL_COUNT];
    for angle in &mut angles {
        *angle = tokens.next()?.parse().ok()?;
    }
    Some(angles)
}

/// Ordered, immutable sequence of waypoints in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
}

impl Trajectory {
    /// Read the whole stream and collect every position command.
    ///
    /// Returns once the reader reports end of input.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, TrajectoryError> {
        let mut waypoints = Vec::new();
        let mut buf = Vec::new();
        let mut line_no = 0usize;
        let mut skipped = 0usize;

        loop {
            buf.clear();
            line_no += 1;
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| TrajectoryError::Read {
                    line: line_no,
                    source,
                })?;
            if n == 0 {
                break;
            }
            // Non-UTF-8 lines are malformed commands, not stream errors.
            match std::str::from_utf8(&buf).ok().and_then(parse_command) {
                Some(angles) => waypoints.push(Waypoint::new(angles)),
                None => skipped += 1,
            }
        }

        debug!(
            "Collected {} waypoints ({} lines skipped)",
            waypoints.len(),
            skipped
        );
        Ok(Self { waypoints })
    }

    /// Number of waypoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// True if no command was collected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints in playback order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    /// Read-only view of all waypoints.
    #[inline]
    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Waypoint;
    type IntoIter = std::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(input: &str) -> Trajectory {
        Trajectory::from_reader(Cursor::new(input)).unwrap()
    }

    #[test]
    fn parse_well_formed_command() {
        assert_eq!(
            parse_command("rt-cmd:POS 10.0 20.0 30.0\n"),
            Some([10.0, 20.0, 30.0])
        );
        assert_eq!(
            parse_command("rt-cmd:POS\t-1.5   2e1 0\r\n"),
            Some([-1.5, 20.0, 0.0])
        );
    }

    #[test]
    fn parse_ignores_trailing_tokens() {
        assert_eq!(
            parse_command("rt-cmd:POS 1 2 3 extra"),
            Some([1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn parse_rejects_missing_value() {
        assert_eq!(parse_command("rt-cmd:POS 1.0 2.0"), None);
        assert_eq!(parse_command("rt-cmd:POS 1.0 2.0\n"), None);
        assert_eq!(parse_command("rt-cmd:POS"), None);
    }

    #[test]
    fn parse_rejects_other_lines() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("rt-cmd:VEL 1 2 3"), None);
        assert_eq!(parse_command(" rt-cmd:POS 1 2 3"), None);
        assert_eq!(parse_command("rt-cmd:POS 1 two 3"), None);
    }

    #[test]
    fn trajectory_keeps_input_order() {
        let input: String = (0..50)
            .map(|i| format!("rt-cmd:POS {i} {} {}\n", i + 1, i + 2))
            .collect();
        let trajectory = load(&input);
        assert_eq!(trajectory.len(), 50);
        for (i, wp) in trajectory.iter().enumerate() {
            let i = i as f32;
            assert_eq!(wp.angles(), [i, i + 1.0, i + 2.0]);
        }
    }

    #[test]
    fn trajectory_skips_malformed_lines() {
        let trajectory = load(
            "# header\nrt-cmd:POS 1 2 3\nrt-cmd:POS 1.0 2.0\ngarbage\nrt-cmd:POS 4 5 6",
        );
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.as_slice()[0].angles(), [1.0, 2.0, 3.0]);
        assert_eq!(trajectory.as_slice()[1].angles(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn trajectory_skips_invalid_utf8_line() {
        let mut input = b"rt-cmd:POS 1 2 3\n".to_vec();
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"rt-cmd:POS 4 5 6\n");
        let trajectory = Trajectory::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(trajectory.len(), 2);
    }

    #[test]
    fn empty_stream_gives_empty_trajectory() {
        assert!(load("").is_empty());
        assert!(load("nothing\nto see\n").is_empty());
    }

    #[test]
    fn waypoint_duties_follow_angles() {
        let trajectory = load("rt-cmd:POS 10.0 20.0 30.0\nrt-cmd:POS 0.0 0.0 0.0\n");
        assert_eq!(
            trajectory.as_slice()[0].duties(),
            [6_860_340, 12_170_680, 17_481_020]
        );
        assert_eq!(trajectory.as_slice()[1].duties(), [1_550_000; 3]);
    }

    #[test]
    fn read_error_is_reported() {
        struct Failing;
        impl std::io::Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }
        let result = Trajectory::from_reader(std::io::BufReader::new(Failing));
        assert!(matches!(result, Err(TrajectoryError::Read { line: 1, .. })));
    }
}

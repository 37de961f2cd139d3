//! Linux sysfs PWM backend.
//!
//! Layout of a PWM chip directory:
//!
//! ```text
//! <chip>/export              write N to allocate channel N
//! <chip>/pwmN/period         carrier period [ns]
//! <chip>/pwmN/enable         1 = output on
//! <chip>/pwmN/duty_cycle     active time per period [ns]
//! ```
//!
//! All paths are built once in [`SysfsPwm::new`]; the playback loop only
//! opens and writes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rtplay_common::consts::CHANNEL_COUNT;
use rtplay_common::pwm::{DutyHandle, PwmBackend, PwmError, format_duty};
use tracing::{debug, info};

/// Control file paths of one channel.
#[derive(Debug, Clone)]
struct ChannelPaths {
    dir: PathBuf,
    period: PathBuf,
    enable: PathBuf,
    duty_cycle: Arc<Path>,
}

impl ChannelPaths {
    fn new(chip: &Path, channel: usize) -> Self {
        let dir = chip.join(format!("pwm{channel}"));
        Self {
            period: dir.join("period"),
            enable: dir.join("enable"),
            duty_cycle: Arc::from(dir.join("duty_cycle")),
            dir,
        }
    }
}

/// sysfs PWM chip backend.
#[derive(Debug, Clone)]
pub struct SysfsPwm {
    chip: PathBuf,
    export: PathBuf,
    channels: [ChannelPaths; CHANNEL_COUNT],
}

impl SysfsPwm {
    /// Create a backend rooted at a PWM chip directory.
    pub fn new(chip: impl Into<PathBuf>) -> Self {
        let chip = chip.into();
        Self {
            export: chip.join("export"),
            channels: std::array::from_fn(|ch| ChannelPaths::new(&chip, ch)),
            chip,
        }
    }

    /// Duty-cycle control file of a channel.
    pub fn duty_path(&self, channel: usize) -> Option<&Path> {
        self.channels.get(channel).map(|c| &*c.duty_cycle)
    }

    fn channel(&self, channel: usize) -> Result<&ChannelPaths, PwmError> {
        self.channels.get(channel).ok_or(PwmError::ChannelOutOfRange {
            channel,
            count: CHANNEL_COUNT,
        })
    }
}

/// Open an existing control file for writing (truncates, never creates).
fn open_control(path: &Path) -> Result<File, PwmError> {
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|source| PwmError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Write one value to a control file and close it.
fn write_control(path: &Path, value: &str) -> Result<(), PwmError> {
    let mut file = open_control(path)?;
    file.write_all(value.as_bytes())
        .map_err(|source| PwmError::Write {
            path: path.to_path_buf(),
            source,
        })
}

impl PwmBackend for SysfsPwm {
    type Handle = SysfsDuty;

    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn prepare_channel(
        &mut self,
        channel: usize,
        carrier_period_ns: u64,
    ) -> Result<(), PwmError> {
        let paths = self.channel(channel)?.clone();

        if !paths.dir.exists() {
            debug!("Exporting PWM channel {} via {:?}", channel, self.export);
            write_control(&self.export, &channel.to_string())?;
        }

        write_control(&paths.period, &carrier_period_ns.to_string())?;
        write_control(&paths.enable, "1")?;

        info!(
            "PWM channel {} ready (period={}ns, chip={})",
            channel,
            carrier_period_ns,
            self.chip.display()
        );
        Ok(())
    }

    fn open_duty(&mut self, channel: usize) -> Result<SysfsDuty, PwmError> {
        let path = Arc::clone(&self.channel(channel)?.duty_cycle);
        let file = open_control(&path)?;
        Ok(SysfsDuty { file, path })
    }
}

/// Opened `duty_cycle` file of one channel; closed on drop.
#[derive(Debug)]
pub struct SysfsDuty {
    file: File,
    path: Arc<Path>,
}

impl DutyHandle for SysfsDuty {
    fn write_duty(&mut self, duty_ns: u32) -> Result<(), PwmError> {
        let text = format_duty(duty_ns);
        self.file
            .write_all(text.as_bytes())
            .map_err(|source| PwmError::Write {
                path: self.path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_sysfs_layout() {
        let pwm = SysfsPwm::new("/sys/class/pwm/pwmchip0");
        assert_eq!(pwm.chip, PathBuf::from("/sys/class/pwm/pwmchip0"));
        assert_eq!(
            pwm.duty_path(2),
            Some(Path::new("/sys/class/pwm/pwmchip0/pwm2/duty_cycle"))
        );
        assert_eq!(
            pwm.channels[1].period,
            PathBuf::from("/sys/class/pwm/pwmchip0/pwm1/period")
        );
        assert_eq!(
            pwm.channels[0].enable,
            PathBuf::from("/sys/class/pwm/pwmchip0/pwm0/enable")
        );
        assert_eq!(pwm.export, PathBuf::from("/sys/class/pwm/pwmchip0/export"));
        assert!(pwm.duty_path(3).is_none());
    }

    #[test]
    fn open_out_of_range_channel() {
        let mut pwm = SysfsPwm::new("/nonexistent");
        let err = pwm.open_duty(7).unwrap_err();
        assert!(matches!(err, PwmError::ChannelOutOfRange { channel: 7, .. }));
    }

    #[test]
    fn open_missing_chip_names_path() {
        let mut pwm = SysfsPwm::new("/nonexistent/pwmchip0");
        let err = pwm.open_duty(0).unwrap_err();
        assert!(matches!(err, PwmError::Open { .. }));
        assert_eq!(
            err.path(),
            Some(Path::new("/nonexistent/pwmchip0/pwm0/duty_cycle"))
        );
    }
}

//! No-op PWM backend used by the diagnostic profile.

use rtplay_common::pwm::{DutyHandle, PwmBackend, PwmError};

/// Backend that accepts every operation and touches no hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPwm;

/// Handle returned by [`NullPwm`]; discards every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDuty;

impl DutyHandle for NullDuty {
    fn write_duty(&mut self, _duty_ns: u32) -> Result<(), PwmError> {
        Ok(())
    }
}

impl PwmBackend for NullPwm {
    type Handle = NullDuty;

    fn name(&self) -> &'static str {
        "null"
    }

    fn prepare_channel(&mut self, _channel: usize, _carrier_period_ns: u64) -> Result<(), PwmError> {
        Ok(())
    }

    fn open_duty(&mut self, _channel: usize) -> Result<NullDuty, PwmError> {
        Ok(NullDuty)
    }
}

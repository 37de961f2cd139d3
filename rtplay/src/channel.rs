//! One-time channel setup before playback.
//!
//! Every channel is exported, given the carrier period and enabled. The
//! first failure stops setup; playback never starts on a partial set.

use rtplay_common::consts::{CHANNEL_COUNT, PWM_CARRIER_PERIOD_NS};
use rtplay_common::pwm::{PwmBackend, PwmError};
use tracing::info;

/// Prepare all [`CHANNEL_COUNT`] channels with the fixed carrier period.
pub fn init_channels<B: PwmBackend>(backend: &mut B) -> Result<(), PwmError> {
    for channel in 0..CHANNEL_COUNT {
        backend.prepare_channel(channel, PWM_CARRIER_PERIOD_NS)?;
    }
    info!(
        "{} PWM channels initialized on '{}' backend",
        CHANNEL_COUNT,
        backend.name()
    );
    Ok(())
}

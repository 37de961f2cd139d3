//! Angle → duty-cycle conversion.
//!
//! Linear actuator model `duty = round(M·angle + H)` with compile-time
//! calibration constants from [`rtplay_common::consts`].

use rtplay_common::consts::{DUTY_MODEL_H, DUTY_MODEL_M};

/// Convert a commanded angle into a duty-cycle value [ns].
///
/// Total over every `f32`: negative results clamp to 0, results beyond
/// `u32::MAX` saturate, NaN maps to 0.
#[inline]
pub fn angle_to_duty(angle: f32) -> u32 {
    let duty = (DUTY_MODEL_M * f64::from(angle) + DUTY_MODEL_H).round();
    // `as` saturates and maps NaN to 0.
    duty as u32
}

/// Convert the three angles of one waypoint.
#[inline]
pub fn angles_to_duties(angles: [f32; 3]) -> [u32; 3] {
    angles.map(angle_to_duty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_angle_gives_offset() {
        assert_eq!(angle_to_duty(0.0), 1_550_000);
    }

    #[test]
    fn reference_angles() {
        assert_eq!(
            angles_to_duties([10.0, 20.0, 30.0]),
            [6_860_340, 12_170_680, 17_481_020]
        );
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(angle_to_duty(0.5), 1_815_517);
        // 531034 * 0.25 = 132758.5
        assert_eq!(angle_to_duty(0.25), 1_682_759);
        // 531034 * 1e-6 = 0.53
        assert_eq!(angle_to_duty(1.0e-6), 1_550_001);
    }

    #[test]
    fn matches_model_formula() {
        for i in -300..=300 {
            let a = i as f32 * 0.1;
            let expected = (DUTY_MODEL_M * f64::from(a) + DUTY_MODEL_H).round();
            assert_eq!(angle_to_duty(a), expected.max(0.0) as u32, "angle {a}");
        }
    }

    #[test]
    fn monotonic_in_angle() {
        let mut previous = angle_to_duty(-5.0);
        for i in -499..=2000 {
            let duty = angle_to_duty(i as f32 * 0.01);
            assert!(duty >= previous);
            previous = duty;
        }
    }

    #[test]
    fn total_over_extremes() {
        assert_eq!(angle_to_duty(-1000.0), 0);
        assert_eq!(angle_to_duty(f32::MAX), u32::MAX);
        assert_eq!(angle_to_duty(f32::NEG_INFINITY), 0);
        assert_eq!(angle_to_duty(f32::NAN), 0);
    }
}

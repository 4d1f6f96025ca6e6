//! Shade angle controller
//!
//! Maps the averaged light intensity of one send cycle, the current
//! temperature and the active [`ControlConfig`] to a servo angle.

use log::debug;

use crate::config::{ControlConfig, MAX_ANGLE_DEG};

/// Compute the shade angle in degrees.
///
/// ```text
/// angle = offset + (180 - offset) * intensity * gain * ln(Ts / Tu) * (T / T_ref)
/// ```
///
/// where `Ts` and `Tu` are the sample and send periods. The result is
/// clamped to `[offset, 180]`. `ln(Ts / Tu)` is negative whenever samples
/// are taken faster than they are sent, which pins the shade to the
/// baseline for positive temperatures; the formula is kept as is.
///
/// A NaN temperature (failed sensor read) yields the baseline angle, as does
/// any non-finite intermediate such as `0 * inf`.
pub fn compute_angle(intensity: f32, temperature_c: f32, config: &ControlConfig) -> f32 {
    let offset = config.angle_offset_deg;
    if temperature_c.is_nan() {
        return offset;
    }

    let ratio = config.sample_secs() / config.send_secs();
    let angle = offset
        + (MAX_ANGLE_DEG - offset)
            * intensity
            * config.gain
            * libm::logf(ratio)
            * (temperature_c / config.reference_temp_c);

    let clamped = if angle.is_nan() {
        offset
    } else {
        angle.max(offset).min(MAX_ANGLE_DEG)
    };

    debug!(
        "Servo calc: light={} temp={} -> angle={}",
        intensity, temperature_c, clamped
    );
    clamped
}

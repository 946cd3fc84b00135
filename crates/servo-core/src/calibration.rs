//! Logical → physical angle transform.
//!
//! Inversion is applied first, then `(angle + centerOffset) * angleMultiplier`.
//! Limits are checked separately by the caller against the same config.

use crate::types::ActuatorConfig;

pub fn calibrate(angle: f64, config: &ActuatorConfig) -> f64 {
    let mut angle = angle;
    if config.inverted {
        angle = 180.0 - angle;
    }
    if let Some(cal) = &config.calibration {
        angle = (angle + cal.center_offset) * cal.angle_multiplier;
    }
    angle
}

/// Check a calibrated angle against the config's limits.
///
/// Returns the violated `(min, max)` window on failure. NaN never passes.
pub fn check_limits(physical: f64, config: &ActuatorConfig) -> Result<(), (f64, f64)> {
    let limits = config.effective_limits();
    if limits.min_angle <= physical && physical <= limits.max_angle {
        Ok(())
    } else {
        Err((limits.min_angle, limits.max_angle))
    }
}

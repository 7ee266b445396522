//! input.rs
//! Manual pilot input, already normalized by the input-device collaborator.
//!
//! Manual control goes through the same weighted request surfaces as the automatic layer;
//! it simply submits with its own weight and lets the aggregators arbitrate.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Weight of every manual request.
pub const INPUT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualInput {
    /// Take-off throttle, [0, 1].
    pub take_off: f64,
    /// Turbo throttle, [0, 1].
    pub turbo: f64,
    /// Pitch/roll stick, each axis in [-1, 1].
    pub torque: Vector2<f64>,
    /// x: lateral strafe, y: vertical strafe.
    pub xy_strafe: Vector2<f64>,
    /// x: yaw, y: forward strafe.
    pub y_torque_z_strafe: Vector2<f64>,
    /// Gimbal angle in degrees, when the pilot is steering it.
    pub gimbal: Option<f64>,
    pub weight: f64,
}

impl Default for ManualInput {
    fn default() -> Self {
        Self {
            take_off: 0.0,
            turbo: 0.0,
            torque: Vector2::zeros(),
            xy_strafe: Vector2::zeros(),
            y_torque_z_strafe: Vector2::zeros(),
            gimbal: None,
            weight: INPUT_WEIGHT,
        }
    }
}

/// Squares the magnitude while keeping the sign: fine control near the centre.
#[inline]
pub fn shape(x: f64) -> f64 {
    x * x.abs()
}

impl ManualInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn shaped_torque(&self) -> Vector2<f64> {
        self.torque.map(shape)
    }

    /// Lateral (x) and forward (z) strafe, combined from both sticks.
    pub fn xz_strafe(&self) -> Vector2<f64> {
        Vector2::new(self.xy_strafe.x, self.y_torque_z_strafe.y)
    }

    pub fn y_strafe(&self) -> f64 {
        self.xy_strafe.y
    }

    pub fn shaped_y_torque(&self) -> f64 {
        shape(self.y_torque_z_strafe.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaping_keeps_sign() {
        assert_eq!(shape(0.5), 0.25);
        assert_eq!(shape(-0.5), -0.25);
        assert_eq!(shape(1.0), 1.0);
    }

    #[test]
    fn strafe_axes_are_recombined() {
        let input = ManualInput {
            xy_strafe: Vector2::new(0.3, -0.7),
            y_torque_z_strafe: Vector2::new(-0.4, 0.9),
            ..ManualInput::default()
        };
        assert_eq!(input.xz_strafe(), Vector2::new(0.3, 0.9));
        assert_eq!(input.y_strafe(), -0.7);
        assert!((input.shaped_y_torque() + 0.16).abs() < 1e-12);
    }
}

//! torque.rs
//! Attitude stabilizer: cascaded PIDs on two independent axis groups.
//!
//! - XZ group (pitch about local x, roll about local z) feeds the torque double-axis pair.
//! - Y group (yaw about local y) feeds the yaw axis pair.
//!
//! Per group and per tick:
//! - `None`: nothing is computed or submitted, the group's PIDs stay reset.
//! - `Velocity`: local angular velocity driven to 0, clamped to `velocity_clamp` and scaled.
//! - `Direction`: the velocity stage plus a heading stage on the local Euler offset to the
//!   expected rotation (clamped to `angle_clamp` degrees), summed and halved.

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::component_a::sensor::SensorSnapshot;
use crate::component_b::pid::{PidController, PidGains};
use crate::component_b::request::wrap_degrees;

const XZ_AXES: [usize; 2] = [0, 2];
const Y_AXES: [usize; 1] = [1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TorqueStabilization {
    #[default]
    None,
    Velocity,
    Direction,
}

impl fmt::Display for TorqueStabilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorqueConfig {
    pub velocity_gains: PidGains,
    pub direction_gains: PidGains,
    pub control_weight: f64,
    /// Degrees.
    pub angle_clamp: f64,
    /// Radians per second.
    pub velocity_clamp: f64,
}

impl Default for TorqueConfig {
    fn default() -> Self {
        Self {
            velocity_gains: PidGains::new(2.0, 0.0, 0.05),
            direction_gains: PidGains::new(1.5, 0.05, 0.4),
            control_weight: 2.5,
            angle_clamp: 10.0,
            velocity_clamp: 1.0,
        }
    }
}

/// Requests produced for one tick; `None` means "do not submit".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TorqueOutput {
    /// (pitch, roll) for the torque pair.
    pub xz: Option<Vector2<f64>>,
    pub y: Option<f64>,
    pub weight: f64,
}

/// Clamps every component to `[-clamp, clamp]` and divides by `clamp`.
pub(crate) fn clamp_scale(v: Vector3<f64>, clamp: f64) -> Vector3<f64> {
    if clamp == 0.0 || !clamp.is_finite() {
        return v;
    }
    let c = clamp.abs();
    v.map(|x| x.clamp(-c, c) / c)
}

#[derive(Debug, Clone)]
pub struct TorqueStabilizer {
    config: TorqueConfig,
    xz_mode: TorqueStabilization,
    y_mode: TorqueStabilization,
    velocity: [PidController; 3],
    direction: [PidController; 3],
    expected_rotation: UnitQuaternion<f64>,
    current_correction: Vector3<f64>,
    is_on: bool,
}

impl TorqueStabilizer {
    pub fn new(config: TorqueConfig) -> Self {
        let config = TorqueConfig {
            control_weight: config.control_weight.max(0.0),
            ..config
        };
        Self {
            velocity: std::array::from_fn(|_| PidController::new(config.velocity_gains)),
            direction: std::array::from_fn(|_| PidController::new(config.direction_gains)),
            config,
            xz_mode: TorqueStabilization::None,
            y_mode: TorqueStabilization::None,
            expected_rotation: UnitQuaternion::identity(),
            current_correction: Vector3::zeros(),
            is_on: false,
        }
    }

    pub fn config(&self) -> &TorqueConfig {
        &self.config
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn set_on(&mut self, on: bool) {
        if on == self.is_on {
            return;
        }
        self.is_on = on;
        if !on {
            self.reset_axes(&[0, 1, 2]);
            self.current_correction = Vector3::zeros();
        }
    }

    pub fn control_weight(&self) -> f64 {
        self.config.control_weight
    }

    /// Negative weights count as 0.
    pub fn set_control_weight(&mut self, weight: f64) {
        self.config.control_weight = if weight > 0.0 { weight } else { 0.0 };
    }

    pub fn xz_mode(&self) -> TorqueStabilization {
        self.xz_mode
    }

    pub fn y_mode(&self) -> TorqueStabilization {
        self.y_mode
    }

    /// Returns true when the mode actually changed; the group's PIDs are reset then.
    pub fn set_xz_mode(&mut self, mode: TorqueStabilization) -> bool {
        if mode == self.xz_mode {
            return false;
        }
        self.xz_mode = mode;
        self.reset_axes(&XZ_AXES);
        true
    }

    pub fn set_y_mode(&mut self, mode: TorqueStabilization) -> bool {
        if mode == self.y_mode {
            return false;
        }
        self.y_mode = mode;
        self.reset_axes(&Y_AXES);
        true
    }

    pub fn expected_rotation(&self) -> UnitQuaternion<f64> {
        self.expected_rotation
    }

    pub fn set_expected_rotation(&mut self, rotation: UnitQuaternion<f64>) {
        self.expected_rotation = rotation;
    }

    /// Correction of the last update, (pitch, yaw, roll) in [-1, 1].
    pub fn current_correction(&self) -> Vector3<f64> {
        self.current_correction
    }

    fn reset_axes(&mut self, axes: &[usize]) {
        for &i in axes {
            self.velocity[i].reset();
            self.direction[i].reset();
        }
    }

    /// Local Euler offset (degrees, each in (-180, 180]) from `current` to the target attitude.
    ///
    /// In XZ Direction the target keeps the current heading levelled on the expected up;
    /// in Y Direction it takes the expected forward. `None` when the frame is degenerate.
    pub fn orientation_offset(&self, current: UnitQuaternion<f64>) -> Option<Vector3<f64>> {
        let mut up = current * Vector3::y();
        let mut forward = current * Vector3::z();

        if self.xz_mode == TorqueStabilization::Direction {
            up = self.expected_rotation * Vector3::y();
            forward -= up * forward.dot(&up);
        }
        if self.y_mode == TorqueStabilization::Direction {
            forward = self.expected_rotation * Vector3::z();
        }

        if forward.norm() < 1e-9 || forward.cross(&up).norm() < 1e-9 {
            return None;
        }

        let target = UnitQuaternion::face_towards(&forward, &up);
        let (x, y, z) = (current.inverse() * target).euler_angles();
        Some(Vector3::new(
            wrap_degrees(x.to_degrees()),
            wrap_degrees(y.to_degrees()),
            wrap_degrees(z.to_degrees()),
        ))
    }

    /// Runs the enabled cascades for one tick.
    pub fn update(&mut self, dt: f64, snapshot: &SensorSnapshot) -> TorqueOutput {
        if !self.is_on || !(dt > 0.0) || !dt.is_finite() {
            self.current_correction = Vector3::zeros();
            return TorqueOutput::default();
        }

        let local_velocity = snapshot.local_angular_velocity();
        let wants_heading =
            self.xz_mode == TorqueStabilization::Direction || self.y_mode == TorqueStabilization::Direction;
        let offset = if wants_heading { self.orientation_offset(snapshot.rotation) } else { None };
        if wants_heading && offset.is_none() {
            log::trace!("degenerate attitude target, heading stage skipped");
        }

        let mut velocity_stage = Vector3::zeros();
        let mut direction_stage = Vector3::zeros();
        for (axes, mode) in [(&XZ_AXES[..], self.xz_mode), (&Y_AXES[..], self.y_mode)] {
            if mode == TorqueStabilization::None {
                continue;
            }
            for &i in axes {
                velocity_stage[i] = self.velocity[i].refresh(local_velocity[i], 0.0, dt);
                if mode == TorqueStabilization::Direction {
                    if let Some(offset) = offset {
                        direction_stage[i] = self.direction[i].refresh(-offset[i], 0.0, dt);
                    }
                }
            }
        }

        let velocity_stage = clamp_scale(velocity_stage, self.config.velocity_clamp);
        let direction_stage = clamp_scale(direction_stage, self.config.angle_clamp);

        let mut correction = Vector3::zeros();
        for (axes, mode) in [(&XZ_AXES[..], self.xz_mode), (&Y_AXES[..], self.y_mode)] {
            for &i in axes {
                correction[i] = match mode {
                    TorqueStabilization::None => 0.0,
                    TorqueStabilization::Velocity => velocity_stage[i],
                    TorqueStabilization::Direction => (velocity_stage[i] + direction_stage[i]) / 2.0,
                };
            }
        }
        self.current_correction = correction;

        TorqueOutput {
            xz: (self.xz_mode != TorqueStabilization::None).then(|| Vector2::new(correction.x, correction.z)),
            y: (self.y_mode != TorqueStabilization::None).then_some(correction.y),
            weight: self.config.control_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stabilizer() -> TorqueStabilizer {
        let mut t = TorqueStabilizer::new(TorqueConfig {
            velocity_gains: PidGains::new(1.0, 0.0, 0.0),
            direction_gains: PidGains::new(1.0, 0.0, 0.0),
            ..TorqueConfig::default()
        });
        t.set_on(true);
        t
    }

    fn tilted(deg: f64) -> SensorSnapshot {
        SensorSnapshot {
            rotation: UnitQuaternion::from_axis_angle(&Vector3::x_axis(), deg.to_radians()),
            ..SensorSnapshot::default()
        }
    }

    #[test]
    fn none_submits_nothing() {
        let mut t = stabilizer();
        let out = t.update(0.02, &tilted(20.0));
        assert_eq!(out.xz, None);
        assert_eq!(out.y, None);
        assert_eq!(t.current_correction(), Vector3::zeros());
    }

    #[test]
    fn velocity_mode_opposes_spin_unhalved() {
        let mut t = stabilizer();
        t.set_xz_mode(TorqueStabilization::Velocity);
        let snap = SensorSnapshot {
            angular_velocity: Vector3::new(0.4, 0.0, -3.0),
            ..SensorSnapshot::default()
        };
        let out = t.update(0.02, &snap);
        let xz = out.xz.unwrap_or_else(Vector2::zeros);
        assert!((xz.x + 0.4).abs() < 1e-12);
        // Clamped to the velocity bound, then scaled.
        assert!((xz.y - 1.0).abs() < 1e-12);
        assert_eq!(out.y, None);
        assert_eq!(out.weight, 2.5);
    }

    #[test]
    fn direction_mode_halves_both_stages() {
        let mut t = stabilizer();
        t.set_xz_mode(TorqueStabilization::Direction);
        t.set_expected_rotation(UnitQuaternion::identity());

        let out = t.update(0.02, &tilted(20.0));
        let xz = out.xz.unwrap_or_else(Vector2::zeros);
        // Offset -20° saturates the 10° clamp; no spin, so (0 + -1) / 2.
        assert!((xz.x + 0.5).abs() < 1e-9, "pitch {}", xz.x);
        assert!(xz.y.abs() < 1e-9);
    }

    #[test]
    fn offset_is_wrapped_and_local() {
        let mut t = stabilizer();
        t.set_xz_mode(TorqueStabilization::Direction);
        let offset = t.orientation_offset(tilted(5.0).rotation).unwrap_or_else(Vector3::zeros);
        assert!((offset.x + 5.0).abs() < 1e-9);
        assert!(offset.y.abs() < 1e-9 && offset.z.abs() < 1e-9);
    }

    #[test]
    fn yaw_direction_uses_expected_forward() {
        let mut t = stabilizer();
        t.set_y_mode(TorqueStabilization::Direction);
        t.set_expected_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 30f64.to_radians()));
        let offset = t.orientation_offset(UnitQuaternion::identity()).unwrap_or_else(Vector3::zeros);
        assert!((offset.y - 30.0).abs() < 1e-9, "yaw {}", offset.y);
    }

    #[test]
    fn yaw_offset_takes_the_short_arc_across_north() {
        let mut t = stabilizer();
        t.set_y_mode(TorqueStabilization::Direction);
        t.set_expected_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 10f64.to_radians()));
        let current = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 350f64.to_radians());

        let offset = t.orientation_offset(current).unwrap_or_else(Vector3::zeros);
        assert!((offset.y - 20.0).abs() < 1e-9, "yaw {}", offset.y);
        assert!(offset.x.abs() < 1e-9 && offset.z.abs() < 1e-9);

        // +20° saturates the 10° clamp; no spin, so (0 + 1) / 2 towards +yaw.
        let snap = SensorSnapshot { rotation: current, ..SensorSnapshot::default() };
        let out = t.update(0.02, &snap);
        let y = out.y.unwrap_or(0.0);
        assert!((y - 0.5).abs() < 1e-9, "yaw correction {}", y);
        assert_eq!(out.xz, None);
    }

    #[test]
    fn mode_change_resets_only_that_group() {
        let mut t = stabilizer();
        t.set_xz_mode(TorqueStabilization::Velocity);
        t.set_y_mode(TorqueStabilization::Velocity);
        let snap = SensorSnapshot {
            angular_velocity: Vector3::new(0.3, 0.2, 0.1),
            ..SensorSnapshot::default()
        };
        let first = t.update(0.02, &snap);

        assert!(t.set_xz_mode(TorqueStabilization::None));
        assert!(!t.set_xz_mode(TorqueStabilization::None));
        assert!(t.velocity[0].is_reset() && t.velocity[2].is_reset());
        assert!(!t.velocity[1].is_reset());

        t.set_xz_mode(TorqueStabilization::Velocity);
        assert_eq!(t.update(0.02, &snap).y, first.y);
    }

    #[test]
    fn switching_off_resets_everything() {
        let mut t = stabilizer();
        t.set_xz_mode(TorqueStabilization::Direction);
        t.set_y_mode(TorqueStabilization::Velocity);
        t.update(0.02, &tilted(12.0));
        t.set_on(false);
        assert!(t.velocity.iter().chain(t.direction.iter()).all(|p| p.is_reset()));
        assert_eq!(t.update(0.02, &tilted(12.0)), TorqueOutput::default());
    }

    #[test]
    fn negative_weight_is_clamped() {
        let mut t = stabilizer();
        t.set_control_weight(-1.0);
        assert_eq!(t.control_weight(), 0.0);
    }
}

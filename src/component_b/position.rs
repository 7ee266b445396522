//! position.rs
//! Translation stabilizer: one stabilization type for all three local axes.
//!
//! `Velocity` drives the local linear velocity to 0. `Position` additionally pulls toward the
//! expected position (local offset, clamped to `position_clamp` metres); both stages are then
//! summed and halved. Output goes to the strafe pair (x, z) and the vertical axis (y).

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::component_a::sensor::SensorSnapshot;
use crate::component_b::pid::{PidController, PidGains};
use crate::component_b::torque::clamp_scale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionStabilization {
    #[default]
    None,
    Velocity,
    Position,
}

impl fmt::Display for PositionStabilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub velocity_gains: PidGains,
    pub position_gains: PidGains,
    pub control_weight: f64,
    pub velocity_clamp: f64,
    pub position_clamp: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            velocity_gains: PidGains::new(1.0, 0.0, 0.02),
            position_gains: PidGains::new(0.8, 0.02, 0.3),
            control_weight: 2.5,
            velocity_clamp: 1.0,
            position_clamp: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionOutput {
    /// (lateral x, forward z) for the strafe pair.
    pub strafe: Option<Vector2<f64>>,
    pub vertical: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct PositionStabilizer {
    config: PositionConfig,
    mode: PositionStabilization,
    velocity: [PidController; 3],
    position: [PidController; 3],
    expected_position: Vector3<f64>,
    current_correction: Vector3<f64>,
    is_on: bool,
}

impl PositionStabilizer {
    pub fn new(config: PositionConfig) -> Self {
        let config = PositionConfig {
            control_weight: config.control_weight.max(0.0),
            ..config
        };
        Self {
            velocity: std::array::from_fn(|_| PidController::new(config.velocity_gains)),
            position: std::array::from_fn(|_| PidController::new(config.position_gains)),
            config,
            mode: PositionStabilization::None,
            expected_position: Vector3::zeros(),
            current_correction: Vector3::zeros(),
            is_on: false,
        }
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
            self.reset();
            self.current_correction = Vector3::zeros();
        }
    }

    pub fn control_weight(&self) -> f64 {
        self.config.control_weight
    }

    pub fn set_control_weight(&mut self, weight: f64) {
        self.config.control_weight = if weight > 0.0 { weight } else { 0.0 };
    }

    pub fn mode(&self) -> PositionStabilization {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PositionStabilization) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.reset();
        true
    }

    pub fn expected_position(&self) -> Vector3<f64> {
        self.expected_position
    }

    pub fn set_expected_position(&mut self, position: Vector3<f64>) {
        self.expected_position = position;
    }

    pub fn current_correction(&self) -> Vector3<f64> {
        self.current_correction
    }

    fn reset(&mut self) {
        self.velocity.iter_mut().chain(self.position.iter_mut()).for_each(PidController::reset);
    }

    pub fn update(&mut self, dt: f64, snapshot: &SensorSnapshot) -> PositionOutput {
        if !self.is_on || self.mode == PositionStabilization::None || !(dt > 0.0) || !dt.is_finite() {
            self.current_correction = Vector3::zeros();
            return PositionOutput::default();
        }

        let local_velocity = snapshot.local_velocity();
        let mut velocity_stage = Vector3::zeros();
        for i in 0..3 {
            velocity_stage[i] = self.velocity[i].refresh(local_velocity[i], 0.0, dt);
        }
        let velocity_stage = clamp_scale(velocity_stage, self.config.velocity_clamp);

        let correction = match self.mode {
            PositionStabilization::Position => {
                let local_target = snapshot
                    .rotation
                    .inverse_transform_vector(&(self.expected_position - snapshot.position));
                let mut position_stage = Vector3::zeros();
                for i in 0..3 {
                    position_stage[i] = self.position[i].refresh(0.0, local_target[i], dt);
                }
                (velocity_stage + clamp_scale(position_stage, self.config.position_clamp)) / 2.0
            }
            _ => velocity_stage,
        };
        self.current_correction = correction;

        PositionOutput {
            strafe: Some(Vector2::new(correction.x, correction.z)),
            vertical: Some(correction.y),
            weight: self.config.control_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    fn stabilizer(mode: PositionStabilization) -> PositionStabilizer {
        let mut p = PositionStabilizer::new(PositionConfig {
            velocity_gains: PidGains::new(1.0, 0.0, 0.0),
            position_gains: PidGains::new(1.0, 0.0, 0.0),
            ..PositionConfig::default()
        });
        p.set_on(true);
        p.set_mode(mode);
        p
    }

    #[test]
    fn none_is_silent() {
        let mut p = stabilizer(PositionStabilization::None);
        assert_eq!(p.update(0.02, &SensorSnapshot::default()), PositionOutput::default());
    }

    #[test]
    fn velocity_brakes_in_local_frame() {
        let mut p = stabilizer(PositionStabilization::Velocity);
        let snap = SensorSnapshot {
            rotation: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
            velocity: Vector3::new(0.5, 0.0, 0.0),
            ..SensorSnapshot::default()
        };
        let out = p.update(0.02, &snap);
        // A quarter turn about y maps local +z onto world +x.
        let strafe = out.strafe.unwrap_or_else(Vector2::zeros);
        assert!(strafe.x.abs() < 1e-9);
        assert!((strafe.y + 0.5).abs() < 1e-9, "strafe {:?}", strafe);
    }

    #[test]
    fn position_pulls_toward_target() {
        let mut p = stabilizer(PositionStabilization::Position);
        p.set_expected_position(Vector3::new(0.0, 10.0, 0.0));
        let snap = SensorSnapshot { position: Vector3::new(0.0, 7.5, 0.0), ..SensorSnapshot::default() };

        let out = p.update(0.02, &snap);
        // 2.5 m below the target: (0 + 2.5 / 5) / 2.
        assert!((out.vertical.unwrap_or(0.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn mode_change_resets_pids() {
        let mut p = stabilizer(PositionStabilization::Velocity);
        let snap = SensorSnapshot { velocity: Vector3::new(1.0, 2.0, 3.0), ..SensorSnapshot::default() };
        p.update(0.02, &snap);
        assert!(p.set_mode(PositionStabilization::Position));
        assert!(p.velocity.iter().all(|pid| pid.is_reset()));
    }
}

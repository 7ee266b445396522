//! config.rs
//! Run and vehicle configuration, loadable from JSON.
//!
//! Every section has defaults, so a config file only needs the fields it changes.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

use crate::advanced::scenario::ScenarioKind;
use crate::component_a::ambient::{FieldSample, FieldSource};
use crate::component_a::status::StatusConfig;
use crate::component_b::actuator::ResponseCurve;
use crate::component_b::position::PositionConfig;
use crate::component_b::torque::TorqueConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrusterConfig {
    /// Per thruster; the take-off group has four.
    pub take_off_max: f64,
    pub turbo_max: f64,
    pub torque_max: f64,
    pub y_torque_max: f64,
    pub strafe_max: f64,
    pub vertical_max: f64,
    /// Normalized units per second.
    pub approach_rate: f64,
    pub take_off_curve: ResponseCurve,
    /// Turbo gimbal travel, degrees.
    pub gimbal_limit: f64,
    /// Degrees per second.
    pub gimbal_rate: f64,
}

impl Default for ThrusterConfig {
    fn default() -> Self {
        Self {
            take_off_max: 5.0,
            turbo_max: 25.0,
            torque_max: 3.0,
            y_torque_max: 2.0,
            strafe_max: 4.0,
            vertical_max: 4.0,
            approach_rate: 4.0,
            take_off_curve: ResponseCurve::Linear,
            gimbal_limit: 30.0,
            gimbal_rate: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    /// Seconds for a full stroke.
    pub travel_time: f64,
    /// Height of the body origin above the gear feet.
    pub height: f64,
    pub legs: u32,
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            travel_time: 1.5,
            height: 1.0,
            legs: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Sample used when no source covers the vehicle (open space).
    pub default_sample: FieldSample,
    pub sources: Vec<FieldSource>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            default_sample: FieldSample::default(),
            sources: vec![
                // Surface at y = 0, atmosphere and gravity end at y = 80.
                FieldSource::natural("planet", Vector3::new(0.0, -1000.0, 0.0), 1080.0, 9.81).with_drag(0.1, 0.5),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub duration_s: f64,
    /// Variable-step frame phase (decide + resolve).
    pub frame_dt: f64,
    /// Fixed-step physics phase (apply).
    pub fixed_dt: f64,
    pub seed: u64,
    /// Pace frames against the wall clock.
    pub realtime: bool,
    pub output_dir: String,
    /// Altimeter noise amplitude, metres.
    pub sensor_noise: f64,
    pub altimeter_range: f64,
    pub scenario: ScenarioKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_s: 40.0,
            frame_dt: 1.0 / 60.0,
            fixed_dt: 0.02,
            seed: 7,
            realtime: false,
            output_dir: "data".to_string(),
            sensor_noise: 0.005,
            altimeter_range: 30.0,
            scenario: ScenarioKind::Flight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub torque: TorqueConfig,
    pub position: PositionConfig,
    pub status: StatusConfig,
    pub thrusters: ThrusterConfig,
    pub gear: GearConfig,
    pub field: FieldConfig,
    pub run: RunConfig,
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Rejects step sizes the loop cannot run with and thruster curves that misbehave.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        let run = &self.run;
        if !(run.frame_dt > 0.0 && run.frame_dt.is_finite()) || !(run.fixed_dt > 0.0 && run.fixed_dt.is_finite()) {
            return Err(format!(
                "step sizes must be finite and > 0 (frame_dt={}, fixed_dt={})",
                run.frame_dt, run.fixed_dt
            )
            .into());
        }
        if !(run.duration_s >= 0.0 && run.duration_s.is_finite()) {
            return Err(format!("duration must be finite and >= 0, got {}", run.duration_s).into());
        }
        self.thrusters.take_off_curve.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_tuning_constants() {
        let c = SimConfig::default();
        assert_eq!(c.torque.control_weight, 2.5);
        assert_eq!(c.torque.angle_clamp, 10.0);
        assert_eq!(c.torque.velocity_clamp, 1.0);
        assert_eq!(c.position.position_clamp, 5.0);
        assert_eq!(c.status.landed_max_speed, 0.05);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: SimConfig = serde_json::from_str(r#"{ "torque": { "control_weight": 4.0 }, "run": { "seed": 99 } }"#)
            .unwrap();
        assert_eq!(c.torque.control_weight, 4.0);
        assert_eq!(c.torque.angle_clamp, 10.0);
        assert_eq!(c.run.seed, 99);
        assert_eq!(c.field.sources.len(), 1);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        let mut c = SimConfig::default();
        c.run.duration_s = 3.0;
        c.save(&path).unwrap();

        let loaded = SimConfig::load(&path).unwrap();
        assert_eq!(loaded.run.duration_s, 3.0);
        assert_eq!(loaded.torque, c.torque);
        assert_eq!(loaded.field.sources[0].name, "planet");
    }

    #[test]
    fn non_finite_timing_is_rejected() {
        let mut c = SimConfig::default();
        c.run.frame_dt = f64::INFINITY;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.run.fixed_dt = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.run.duration_s = f64::INFINITY;
        assert!(c.validate().is_err());

        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_take_off_curve_is_rejected() {
        let mut c = SimConfig::default();
        c.thrusters.take_off_curve = ResponseCurve::Power { exponent: 0.0 };
        assert!(c.validate().is_err());

        c.thrusters.take_off_curve = ResponseCurve::Table { points: vec![(0.0, 0.0), (0.8, 0.5), (0.4, 1.0)] };
        assert!(c.validate().is_err());

        c.thrusters.take_off_curve = ResponseCurve::Power { exponent: 2.0 };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_step_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "run": { "fixed_dt": 0.0 } }"#).unwrap();
        assert!(SimConfig::load(&path).is_err());
    }
}

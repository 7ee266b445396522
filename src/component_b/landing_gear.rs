//! landing_gear.rs
//! Retractable landing gear. The Landed status is only reachable with the gear fully out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GearStatus {
    In,
    Moving,
    #[default]
    Out,
}

#[derive(Debug, Clone)]
pub struct LandingGear {
    /// Seconds for a full stroke.
    travel_time: f64,
    /// 0 = fully in, 1 = fully out.
    extension: f64,
    deploying: bool,
    is_on: bool,
}

impl LandingGear {
    /// Starts fully deployed: a vehicle spawns resting on its gear.
    pub fn new(travel_time: f64) -> Self {
        Self {
            travel_time: travel_time.max(0.0),
            extension: 1.0,
            deploying: true,
            is_on: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn set_on(&mut self, on: bool) {
        self.is_on = on;
    }

    /// Starts retracting (`true`) or deploying (`false`). Ignored while off.
    pub fn retract(&mut self, retract: bool) {
        if !self.is_on {
            return;
        }
        if self.deploying == retract {
            log::debug!("landing gear {}", if retract { "retracting" } else { "deploying" });
        }
        self.deploying = !retract;
    }

    pub fn update(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }
        let target = if self.deploying { 1.0 } else { 0.0 };
        self.extension = if self.travel_time <= f64::EPSILON {
            target
        } else {
            crate::component_b::actuator::move_towards(self.extension, target, dt / self.travel_time)
        };
    }

    pub fn status(&self) -> GearStatus {
        if self.extension >= 1.0 {
            GearStatus::Out
        } else if self.extension <= 0.0 {
            GearStatus::In
        } else {
            GearStatus::Moving
        }
    }

    pub fn extension(&self) -> f64 {
        self.extension
    }
}

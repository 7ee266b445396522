//! rotator.rs
//! Angle actuator (gimbal): weighted angle requests about one local axis.
//!
//! Requests are wrapped into [0, 360) and blended as unit vectors; the resolved angle is
//! expressed in (-180, 180] and clamped to the configured limits when they are set.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::component_b::actuator::Actuator;
use crate::component_b::request::{wrap_degrees, Angle, RequestAggregator};
use crate::physics::PhysicsBody;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatorSpec {
    pub name: String,
    pub local_axis: Vector3<f64>,
    /// `[min, max]` in degrees; ignored unless `max > min`.
    pub limits: [f64; 2],
    /// Degrees per second.
    pub approach_rate: f64,
}

#[derive(Debug, Clone)]
pub struct Rotator {
    spec: RotatorSpec,
    axis: Unit<Vector3<f64>>,
    requests: RequestAggregator<Angle>,
    requested: f64,
    current: f64,
    is_on: bool,
}

impl Rotator {
    pub fn new(spec: RotatorSpec) -> Self {
        let axis = Unit::try_new(spec.local_axis, f64::EPSILON).unwrap_or_else(Vector3::z_axis);
        Self {
            spec,
            axis,
            requests: RequestAggregator::new(),
            requested: 0.0,
            current: 0.0,
            is_on: false,
        }
    }

    pub fn spec(&self) -> &RotatorSpec {
        &self.spec
    }

    pub fn request_angle(&mut self, angle: f64, weight: f64) {
        self.requests.submit(Angle(angle.rem_euclid(360.0)), weight);
    }

    /// Resolved target in degrees.
    pub fn requested_angle(&self) -> f64 {
        self.requested
    }

    /// Current offset in degrees.
    pub fn current_angle(&self) -> f64 {
        self.current
    }

    /// Mount rotation for the current offset.
    pub fn current_rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&self.axis, self.current.to_radians())
    }

    fn limited(&self) -> bool {
        self.spec.limits[1] > self.spec.limits[0]
    }

    fn clamp_to_limits(&self, angle: f64) -> f64 {
        if self.limited() {
            angle.clamp(self.spec.limits[0], self.spec.limits[1])
        } else {
            angle
        }
    }
}

impl Actuator for Rotator {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn is_on(&self) -> bool {
        self.is_on
    }

    fn set_on(&mut self, on: bool) {
        if on == self.is_on {
            return;
        }
        self.requests.clear();
        self.requested = 0.0;
        self.is_on = on;
    }

    fn resolve(&mut self) {
        let resolved = self.requests.resolve();
        self.requested = if self.is_on {
            self.clamp_to_limits(resolved.signed().degrees())
        } else {
            0.0
        };
    }

    fn apply(&mut self, dt: f64, _body: &mut dyn PhysicsBody) {
        if !(dt > 0.0) {
            return;
        }

        let max_step = self.spec.approach_rate.max(0.0) * dt;
        // With limits the travel must stay inside them, so never take the short way across 180.
        let delta = if self.limited() {
            self.requested - self.current
        } else {
            wrap_degrees(self.requested - self.current)
        };
        let step = delta.clamp(-max_step, max_step);

        self.current = if self.limited() {
            self.clamp_to_limits(self.current + step)
        } else {
            wrap_degrees(self.current + step)
        };
    }

    fn requested_normalized(&self) -> f64 {
        self.requested / 180.0
    }

    fn current_normalized(&self) -> f64 {
        self.current / 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicBody;

    fn rotator(limits: [f64; 2], rate: f64) -> Rotator {
        let mut r = Rotator::new(RotatorSpec {
            name: "gimbal".into(),
            local_axis: Vector3::new(0.0, 3.0, 0.0),
            limits,
            approach_rate: rate,
        });
        r.set_on(true);
        r
    }

    #[test]
    fn angles_blend_through_zero() {
        let mut r = rotator([0.0, 0.0], 90.0);
        r.request_angle(-10.0, 1.0);
        r.request_angle(30.0, 1.0);
        r.resolve();
        assert!((r.requested_angle() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn limits_clamp_the_request() {
        let mut r = rotator([-20.0, 20.0], 90.0);
        r.request_angle(45.0, 1.0);
        r.resolve();
        assert_eq!(r.requested_angle(), 20.0);
    }

    #[test]
    fn unlimited_rotator_takes_the_short_arc() {
        let mut r = rotator([0.0, 0.0], 10.0);
        let mut body = KinematicBody::default();
        r.request_angle(-170.0, 1.0);
        r.resolve();
        for _ in 0..20 {
            r.apply(1.0, &mut body);
        }
        r.request_angle(170.0, 1.0);
        r.resolve();
        r.apply(1.0, &mut body);
        // Crossed the wrap instead of swinging back through zero.
        assert!(r.current_angle().abs() > 179.9, "current {}", r.current_angle());
    }

    #[test]
    fn approach_is_rate_limited() {
        let mut r = rotator([-90.0, 90.0], 30.0);
        let mut body = KinematicBody::default();
        r.request_angle(80.0, 1.0);
        r.resolve();
        r.apply(0.5, &mut body);
        assert!((r.current_angle() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_uses_normalized_axis() {
        let mut r = rotator([0.0, 0.0], 1000.0);
        let mut body = KinematicBody::default();
        r.request_angle(90.0, 1.0);
        r.resolve();
        r.apply(1.0, &mut body);

        let turned = r.current_rotation() * Vector3::z();
        assert!((turned.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn off_rotator_returns_to_neutral() {
        let mut r = rotator([0.0, 0.0], 1000.0);
        r.request_angle(45.0, 1.0);
        r.set_on(false);
        r.request_angle(45.0, 1.0);
        r.resolve();
        assert_eq!(r.requested_angle(), 0.0);
    }
}

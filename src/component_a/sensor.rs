//! sensor.rs
//! Per-tick sensor snapshot: pose, velocity, ground proximity and ambient field.
//!
//! The snapshot is built once per frame and handed explicitly to the status machine and
//! the stabilizers; nothing reads the body behind their back.
//! - `SensorProbe` is the collaborator boundary (radar altimeter + gear contact switches).
//! - `SimulatedSensor` probes a flat ground plane with seeded noise for the scenario driver.

use nalgebra::{UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::component_a::ambient::FieldSample;
use crate::component_b::landing_gear::GearStatus;
use crate::physics::PhysicsBody;

/// One radar altimeter hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundInfo {
    pub distance: f64,
    pub normal: Vector3<f64>,
    pub point: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub tick: u64,
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// `None` when the altimeter sees nothing in range.
    pub ground: Option<GroundInfo>,
    /// Gear contact switches currently touching ground.
    pub ground_contacts: u32,
    pub gear: GearStatus,
    pub field: FieldSample,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            ground: None,
            ground_contacts: 0,
            gear: GearStatus::Out,
            field: FieldSample::default(),
        }
    }
}

impl SensorSnapshot {
    /// Pose and velocity of `body`; probes and field are filled in by the caller.
    pub fn of_body(tick: u64, body: &dyn PhysicsBody) -> Self {
        Self {
            tick,
            position: body.position(),
            rotation: body.rotation(),
            velocity: body.velocity(),
            angular_velocity: body.angular_velocity(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.ground_contacts > 0
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    #[inline]
    pub fn angular_speed(&self) -> f64 {
        self.angular_velocity.norm()
    }

    pub fn local_velocity(&self) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&self.velocity)
    }

    pub fn local_angular_velocity(&self) -> Vector3<f64> {
        self.rotation.inverse_transform_vector(&self.angular_velocity)
    }

    /// Angle in degrees between the body's up axis and the field's up (world up without gravity).
    pub fn tilt_degrees(&self) -> f64 {
        let reference = self.field.up().unwrap_or_else(Vector3::y);
        let up = self.rotation * Vector3::y();
        up.angle(&reference).to_degrees()
    }

    pub fn altitude(&self) -> Option<f64> {
        self.ground.map(|g| g.distance)
    }
}

/// Ground-proximity collaborator polled once per frame.
pub trait SensorProbe {
    fn ground(&mut self, body: &dyn PhysicsBody) -> Option<GroundInfo>;

    fn ground_contacts(&mut self, body: &dyn PhysicsBody) -> u32;
}

/// Altimeter over a horizontal plane with uniform distance noise.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    pub ground_height: f64,
    /// Maximum altimeter range.
    pub range: f64,
    /// Height of the body origin above its gear feet.
    pub gear_height: f64,
    pub contact_tolerance: f64,
    pub legs: u32,
    pub noise: f64,
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new(range: f64, gear_height: f64, noise: f64, seed: u64) -> Self {
        Self {
            ground_height: 0.0,
            range,
            gear_height,
            contact_tolerance: 0.02,
            legs: 3,
            noise: noise.abs(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn height_above_ground(&self, body: &dyn PhysicsBody) -> f64 {
        body.position().y - self.ground_height
    }

    fn jitter(&mut self) -> f64 {
        if self.noise > 0.0 {
            self.rng.random_range(-self.noise..self.noise)
        } else {
            0.0
        }
    }
}

impl SensorProbe for SimulatedSensor {
    fn ground(&mut self, body: &dyn PhysicsBody) -> Option<GroundInfo> {
        let height = self.height_above_ground(body);
        if height < 0.0 || height > self.range {
            return None;
        }

        let position = body.position();
        Some(GroundInfo {
            distance: (height + self.jitter()).max(0.0),
            normal: Vector3::y(),
            point: Vector3::new(position.x, self.ground_height, position.z),
        })
    }

    fn ground_contacts(&mut self, body: &dyn PhysicsBody) -> u32 {
        let clearance = self.height_above_ground(body) - self.gear_height;
        if clearance <= self.contact_tolerance { self.legs } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicBody;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn altimeter_range_and_contacts() {
        let mut sensor = SimulatedSensor::new(10.0, 1.0, 0.0, 7);
        let resting = KinematicBody::at(Vector3::new(0.0, 1.0, 0.0));
        let hovering = KinematicBody::at(Vector3::new(0.0, 5.0, 0.0));
        let high = KinematicBody::at(Vector3::new(0.0, 50.0, 0.0));

        assert_eq!(sensor.ground_contacts(&resting), 3);
        assert_eq!(sensor.ground_contacts(&hovering), 0);
        assert_eq!(sensor.ground(&hovering).map(|g| g.distance), Some(5.0));
        assert!(sensor.ground(&high).is_none());
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let body = KinematicBody::at(Vector3::new(0.0, 5.0, 0.0));
        let mut a = SimulatedSensor::new(10.0, 1.0, 0.1, 42);
        let mut b = SimulatedSensor::new(10.0, 1.0, 0.1, 42);
        for _ in 0..10 {
            let da = a.ground(&body).map(|g| g.distance);
            assert_eq!(da, b.ground(&body).map(|g| g.distance));
            assert!(da.is_some_and(|d| (d - 5.0).abs() <= 0.1));
        }
    }

    #[test]
    fn tilt_follows_field_up() {
        let mut snap = SensorSnapshot::default();
        assert!(snap.tilt_degrees().abs() < 1e-9);

        snap.rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert!((snap.tilt_degrees() - 90.0).abs() < 1e-9);

        snap.field.gravity = Vector3::new(9.81, 0.0, 0.0);
        // Body up now points at -x, which is exactly the field's up.
        assert!(snap.tilt_degrees().abs() < 1e-6);
    }
}

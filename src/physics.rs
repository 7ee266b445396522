//! physics.rs
//! Boundary with the external physics engine.
//!
//! The core only reads pose/velocity and accumulates forces; integration belongs to the engine.
//! `KinematicBody` is a minimal stand-in engine (unit mass, unit inertia, flat ground at y = 0)
//! used by the scenario driver, benches and tests.

use nalgebra::{UnitQuaternion, Vector3};

/// Rigid body as seen by the stabilization core.
///
/// Force calls accumulate for the next integration step; they never set velocity directly.
/// All forces are accelerations (mass-independent), expressed in world space.
pub trait PhysicsBody {
    fn position(&self) -> Vector3<f64>;
    fn rotation(&self) -> UnitQuaternion<f64>;
    fn velocity(&self) -> Vector3<f64>;
    fn angular_velocity(&self) -> Vector3<f64>;

    fn add_force(&mut self, force: Vector3<f64>);
    fn add_torque(&mut self, torque: Vector3<f64>);
    fn add_force_at_position(&mut self, force: Vector3<f64>, point: Vector3<f64>);
    fn set_drag(&mut self, linear: f64, angular: f64);

    fn use_gravity(&self) -> bool {
        true
    }

    fn local_velocity(&self) -> Vector3<f64> {
        self.rotation().inverse_transform_vector(&self.velocity())
    }

    fn local_angular_velocity(&self) -> Vector3<f64> {
        self.rotation().inverse_transform_vector(&self.angular_velocity())
    }

    /// Body-frame point expressed in world space.
    fn transform_point(&self, local: Vector3<f64>) -> Vector3<f64> {
        self.position() + self.rotation() * local
    }
}

/// Semi-implicit Euler body with a flat ground plane.
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub drag: f64,
    pub angular_drag: f64,
    pub use_gravity: bool,
    /// Height of the body origin above its lowest point when resting on the ground.
    pub ground_clearance: f64,

    pub(crate) force: Vector3<f64>,
    pub(crate) torque: Vector3<f64>,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            drag: 0.0,
            angular_drag: 0.05,
            use_gravity: true,
            ground_clearance: 1.0,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }
}

impl KinematicBody {
    pub fn at(position: Vector3<f64>) -> Self {
        Self { position, ..Self::default() }
    }

    /// Force accumulated since the last step.
    pub fn pending_force(&self) -> Vector3<f64> {
        self.force
    }

    /// Torque accumulated since the last step.
    pub fn pending_torque(&self) -> Vector3<f64> {
        self.torque
    }

    pub fn altitude(&self) -> f64 {
        self.position.y - self.ground_clearance
    }

    /// Integrates one fixed step and clears the accumulators.
    pub fn step(&mut self, dt: f64) {
        if !(dt > 0.0) {
            return;
        }

        self.velocity += self.force * dt;
        self.velocity *= 1.0 / (1.0 + self.drag * dt);
        self.angular_velocity += self.torque * dt;
        self.angular_velocity *= 1.0 / (1.0 + self.angular_drag * dt);

        self.position += self.velocity * dt;
        self.rotation = UnitQuaternion::from_scaled_axis(self.angular_velocity * dt) * self.rotation;
        self.rotation.renormalize();

        // Resting contact: no penetration, no bounce, friction kills sliding.
        let floor = self.ground_clearance;
        if self.position.y < floor {
            self.position.y = floor;
            if self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
            self.velocity.x *= 0.5;
            self.velocity.z *= 0.5;
        }

        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
    }
}

impl PhysicsBody for KinematicBody {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    fn add_force(&mut self, force: Vector3<f64>) {
        self.force += force;
    }

    fn add_torque(&mut self, torque: Vector3<f64>) {
        self.torque += torque;
    }

    fn add_force_at_position(&mut self, force: Vector3<f64>, point: Vector3<f64>) {
        self.force += force;
        self.torque += (point - self.position).cross(&force);
    }

    fn set_drag(&mut self, linear: f64, angular: f64) {
        self.drag = linear.max(0.0);
        self.angular_drag = angular.max(0.0);
    }

    fn use_gravity(&self) -> bool {
        self.use_gravity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn forces_accumulate_until_step() {
        let mut body = KinematicBody::at(Vector3::new(0.0, 10.0, 0.0));
        body.add_force(Vector3::new(1.0, 0.0, 0.0));
        body.add_force(Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(body.pending_force(), Vector3::new(3.0, 0.0, 0.0));

        body.step(0.5);
        assert_eq!(body.pending_force(), Vector3::zeros());
        assert!((body.velocity.x - 1.5).abs() < 1e-12);
    }

    #[test]
    fn off_center_force_produces_torque() {
        let mut body = KinematicBody::at(Vector3::new(0.0, 10.0, 0.0));
        body.add_force_at_position(Vector3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 10.0, 0.0));
        assert!((body.pending_torque().z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ground_stops_falling_body() {
        let mut body = KinematicBody::at(Vector3::new(0.0, 1.05, 0.0));
        for _ in 0..20 {
            body.add_force(Vector3::new(0.0, -9.81, 0.0));
            body.step(0.02);
        }
        assert_eq!(body.position.y, body.ground_clearance);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn local_frame_follows_rotation() {
        let mut body = KinematicBody::default();
        body.rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        body.velocity = Vector3::new(0.0, 0.0, -1.0);

        let local = body.local_velocity();
        assert!((local.x - 1.0).abs() < 1e-12);
        assert!(local.z.abs() < 1e-12);
    }
}

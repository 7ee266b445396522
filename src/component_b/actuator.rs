//! actuator.rs
//! Thrusters: arbitrated normalized request → rate-limited, curve-shaped physical force.
//!
//! Per tick:
//! 1. `resolve()` turns the pending weighted requests into the held `requested` value.
//! 2. `apply()` moves `current` toward `requested` by at most `approach_rate * dt`,
//!    maps it through the response curve and pushes `direction × curve × max_magnitude`
//!    into the physics engine.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::component_b::request::RequestAggregator;
use crate::physics::PhysicsBody;

/// Capability shared by every actuator, whatever it drives.
pub trait Actuator {
    fn name(&self) -> &str;

    fn is_on(&self) -> bool;

    /// Turning an actuator off drops pending requests and zeroes the requested value.
    fn set_on(&mut self, on: bool);

    /// Resolves this tick's requests into the held requested value and clears them.
    fn resolve(&mut self);

    /// Advances toward the requested value and pushes the result into the physics engine.
    fn apply(&mut self, dt: f64, body: &mut dyn PhysicsBody);

    fn requested_normalized(&self) -> f64;

    fn current_normalized(&self) -> f64;
}

/// Monotonic mapping from normalized command to normalized physical output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseCurve {
    #[default]
    Linear,
    /// `x^exponent`; exponents above 1 soften the low end.
    Power { exponent: f64 },
    /// Piecewise-linear through `(input, output)` points sorted by input.
    Table { points: Vec<(f64, f64)> },
}

impl ResponseCurve {
    /// Output for `x`, always within [0, 1].
    pub fn evaluate(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        let y = match self {
            ResponseCurve::Linear => x,
            ResponseCurve::Power { exponent } if *exponent > 0.0 => x.powf(*exponent),
            ResponseCurve::Power { .. } => x,
            ResponseCurve::Table { points } => interpolate(points, x),
        };

        if y.is_finite() { y.clamp(0.0, 1.0) } else { 0.0 }
    }

    /// Rejects curves that would not map an idle command to zero output monotonically.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ResponseCurve::Linear => Ok(()),
            ResponseCurve::Power { exponent } => {
                if exponent.is_finite() && *exponent > 0.0 {
                    Ok(())
                } else {
                    Err(format!("power curve exponent must be finite and > 0, got {}", exponent))
                }
            }
            ResponseCurve::Table { points } => {
                if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
                    return Err("curve table points must be finite".to_string());
                }
                if points.windows(2).any(|pair| pair[1].0 < pair[0].0) {
                    return Err("curve table points must be sorted by input".to_string());
                }
                Ok(())
            }
        }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return x,
    };

    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }

    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let span = x1 - x0;
            if span <= f64::EPSILON {
                return y1;
            }
            return y0 + (y1 - y0) * (x - x0) / span;
        }
    }

    last.1
}

/// Moves `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_towards(current: f64, target: f64, max_delta: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

/// How a thruster's output reaches the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceKind {
    #[default]
    Force,
    Torque,
    ForceAtPosition,
}

/// Static description of one thruster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrusterSpec {
    pub name: String,
    pub kind: ForceKind,
    /// Thrust direction in the body frame; normalized on construction.
    pub local_direction: Vector3<f64>,
    /// Mount point in the body frame, used by `ForceKind::ForceAtPosition`.
    pub mount: Vector3<f64>,
    pub max_magnitude: f64,
    /// Normalized units per second.
    pub approach_rate: f64,
    pub curve: ResponseCurve,
}

impl ThrusterSpec {
    pub fn new(name: &str, kind: ForceKind, local_direction: Vector3<f64>, max_magnitude: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            local_direction,
            mount: Vector3::zeros(),
            max_magnitude,
            approach_rate: 1.0,
            curve: ResponseCurve::Linear,
        }
    }

    pub fn with_approach_rate(mut self, rate: f64) -> Self {
        self.approach_rate = rate;
        self
    }

    pub fn with_curve(mut self, curve: ResponseCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_mount(mut self, mount: Vector3<f64>) -> Self {
        self.mount = mount;
        self
    }
}

/// Unidirectional actuator accepting `request_force(0..=1, weight)`.
#[derive(Debug, Clone)]
pub struct Thruster {
    spec: ThrusterSpec,
    requests: RequestAggregator<f64>,
    requested: f64,
    current: f64,
    is_on: bool,
    last_output: Vector3<f64>,
}

impl Thruster {
    pub fn new(mut spec: ThrusterSpec) -> Self {
        spec.local_direction = spec
            .local_direction
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        spec.max_magnitude = spec.max_magnitude.max(0.0);
        spec.approach_rate = spec.approach_rate.max(0.0);

        Self {
            spec,
            requests: RequestAggregator::new(),
            requested: 0.0,
            current: 0.0,
            is_on: false,
            last_output: Vector3::zeros(),
        }
    }

    pub fn spec(&self) -> &ThrusterSpec {
        &self.spec
    }

    /// Queues a normalized force request; the value is clamped into [0, 1].
    pub fn request_force(&mut self, force: f64, weight: f64) {
        self.requests.submit(force.clamp(0.0, 1.0), weight);
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Physical vector pushed into the body on the last apply.
    pub fn last_output(&self) -> Vector3<f64> {
        self.last_output
    }

    /// Output after the response curve, in [0, 1].
    pub fn current_power(&self) -> f64 {
        self.spec.curve.evaluate(self.current)
    }

    /// Applies with the thrust direction additionally rotated by a gimbal.
    pub fn apply_mounted(&mut self, dt: f64, body: &mut dyn PhysicsBody, gimbal: UnitQuaternion<f64>) {
        if !(dt > 0.0) {
            return;
        }

        self.current = move_towards(self.current, self.requested, self.spec.approach_rate * dt);

        let world_direction = body.rotation() * (gimbal * self.spec.local_direction);
        let output = world_direction * self.current_power() * self.spec.max_magnitude;
        self.last_output = output;

        if output == Vector3::zeros() {
            return;
        }

        match self.spec.kind {
            ForceKind::Force => body.add_force(output),
            ForceKind::Torque => body.add_torque(output),
            ForceKind::ForceAtPosition => {
                let point = body.transform_point(self.spec.mount);
                body.add_force_at_position(output, point);
            }
        }
    }
}

impl Actuator for Thruster {
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
        self.requested = if self.is_on { resolved.clamp(0.0, 1.0) } else { 0.0 };
        log::trace!("[{}] requested={:.3} current={:.3}", self.spec.name, self.requested, self.current);
    }

    fn apply(&mut self, dt: f64, body: &mut dyn PhysicsBody) {
        self.apply_mounted(dt, body, UnitQuaternion::identity());
    }

    fn requested_normalized(&self) -> f64 {
        self.requested
    }

    fn current_normalized(&self) -> f64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicBody;

    fn thruster(kind: ForceKind, rate: f64) -> Thruster {
        let mut t = Thruster::new(
            ThrusterSpec::new("t", kind, Vector3::new(0.0, 2.0, 0.0), 10.0).with_approach_rate(rate),
        );
        t.set_on(true);
        t
    }

    #[test]
    fn move_towards_never_overshoots() {
        assert_eq!(move_towards(0.0, 1.0, 0.25), 0.25);
        assert_eq!(move_towards(0.9, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(1.0, 0.0, 0.25), 0.75);
        assert_eq!(move_towards(0.5, 0.5, 0.0), 0.5);
    }

    #[test]
    fn current_is_rate_limited() {
        let mut t = thruster(ForceKind::Force, 2.0);
        let mut body = KinematicBody::default();

        t.request_force(1.0, 1.0);
        t.resolve();
        let mut previous = t.current_normalized();
        for _ in 0..4 {
            t.apply(0.1, &mut body);
            let step = t.current_normalized() - previous;
            assert!(step <= 0.2 + 1e-12, "step {}", step);
            previous = t.current_normalized();
        }
        assert!((t.current_normalized() - 0.8).abs() < 1e-12);

        t.apply(0.1, &mut body);
        assert_eq!(t.current_normalized(), 1.0);
    }

    #[test]
    fn two_sources_are_blended() {
        let mut t = thruster(ForceKind::Force, 1.0);
        t.request_force(0.2, 1.0);
        t.request_force(0.8, 3.0);
        t.resolve();
        assert!((t.requested_normalized() - 0.65).abs() < 1e-12);
        assert_eq!(t.pending_requests(), 0);
    }

    #[test]
    fn requests_are_clamped_into_unit_range() {
        let mut t = thruster(ForceKind::Force, 1.0);
        t.request_force(3.0, 1.0);
        t.resolve();
        assert_eq!(t.requested_normalized(), 1.0);

        t.request_force(-1.0, 1.0);
        t.resolve();
        assert_eq!(t.requested_normalized(), 0.0);
    }

    #[test]
    fn switching_off_drops_requests() {
        let mut t = thruster(ForceKind::Force, 1.0);
        t.request_force(0.7, 1.0);
        t.set_on(false);
        assert_eq!(t.pending_requests(), 0);

        t.request_force(0.7, 1.0);
        t.resolve();
        assert_eq!(t.requested_normalized(), 0.0);
    }

    #[test]
    fn force_goes_along_rotated_direction() {
        let mut t = thruster(ForceKind::Force, 100.0);
        let mut body = KinematicBody::default();
        body.rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);

        t.request_force(0.5, 1.0);
        t.resolve();
        t.apply(0.1, &mut body);

        let f = body.pending_force();
        assert!((f.x + 5.0).abs() < 1e-9 && f.y.abs() < 1e-9);
    }

    #[test]
    fn torque_kind_feeds_torque() {
        let mut t = thruster(ForceKind::Torque, 100.0);
        let mut body = KinematicBody::default();
        t.request_force(1.0, 1.0);
        t.resolve();
        t.apply(0.1, &mut body);
        assert_eq!(body.pending_force(), Vector3::zeros());
        assert!((body.pending_torque().y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn response_curves_stay_in_unit_range() {
        let power = ResponseCurve::Power { exponent: 2.0 };
        assert_eq!(power.evaluate(0.5), 0.25);
        assert_eq!(power.evaluate(4.0), 1.0);

        let table = ResponseCurve::Table { points: vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)] };
        assert!((table.evaluate(0.25) - 0.4).abs() < 1e-12);
        assert!((table.evaluate(0.75) - 0.9).abs() < 1e-12);
        assert_eq!(table.evaluate(-1.0), 0.0);

        let mut last = 0.0;
        for i in 0..=20 {
            let y = table.evaluate(i as f64 / 20.0);
            assert!(y >= last);
            last = y;
        }
    }

    #[test]
    fn non_positive_exponent_keeps_idle_at_zero() {
        for exponent in [0.0, -1.5] {
            let curve = ResponseCurve::Power { exponent };
            assert_eq!(curve.evaluate(0.0), 0.0);
            assert_eq!(curve.evaluate(0.4), 0.4);
            assert!(curve.validate().is_err());
        }
        assert!(ResponseCurve::Power { exponent: 0.5 }.validate().is_ok());

        let unsorted = ResponseCurve::Table { points: vec![(0.5, 0.5), (0.2, 1.0)] };
        assert!(unsorted.validate().is_err());
        let sorted = ResponseCurve::Table { points: vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)] };
        assert!(sorted.validate().is_ok());
    }

    #[test]
    fn zero_direction_produces_no_output() {
        let mut t = Thruster::new(ThrusterSpec::new("dead", ForceKind::Force, Vector3::zeros(), 10.0));
        t.set_on(true);
        let mut body = KinematicBody::default();
        t.request_force(1.0, 1.0);
        t.resolve();
        t.apply(1.0, &mut body);
        assert_eq!(body.pending_force(), Vector3::zeros());
    }
}

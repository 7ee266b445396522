//! ambient.rs
//! Ambient force field (gravity and drag) as a multi-writer actuator.
//!
//! Every field source the vehicle is inside of contributes a `FieldSample` through the same
//! weighted-request aggregator the thrusters use. Gravity contributions superpose, drags are
//! averaged, and the resolved sample is pushed into the body on each fixed step.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::component_b::request::{Blend, RequestAggregator, WeightedRequest};
use crate::physics::PhysicsBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    None,
    /// Planet-like: pulls toward a centre.
    Natural,
    /// Generator-like: pushes along a fixed direction.
    Artificial,
    /// Several sources of different kinds overlap.
    Mixed,
}

impl FieldKind {
    /// First non-None kind wins; two different kinds give Mixed.
    pub fn merge(self, other: FieldKind) -> FieldKind {
        match (self, other) {
            (FieldKind::None, k) | (k, FieldKind::None) => k,
            (a, b) if a == b => a,
            _ => FieldKind::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSample {
    pub kind: FieldKind,
    pub drag: f64,
    pub angular_drag: f64,
    /// Acceleration in world space.
    pub gravity: Vector3<f64>,
}

impl Default for FieldSample {
    fn default() -> Self {
        Self {
            kind: FieldKind::None,
            drag: 0.0,
            angular_drag: 0.05,
            gravity: Vector3::zeros(),
        }
    }
}

impl FieldSample {
    pub fn has_gravity(&self) -> bool {
        self.gravity.norm_squared() > 0.0
    }

    /// Direction opposite to gravity, if there is any.
    pub fn up(&self) -> Option<Vector3<f64>> {
        (-self.gravity).try_normalize(f64::EPSILON)
    }
}

impl Blend for FieldSample {
    fn neutral() -> Self {
        FieldSample {
            angular_drag: 0.0,
            ..FieldSample::default()
        }
    }

    fn blend(requests: &[WeightedRequest<Self>], total_weight: f64) -> Self {
        let mut out = FieldSample::neutral();
        for r in requests {
            out.kind = out.kind.merge(r.value.kind);
            out.gravity += r.value.gravity * r.weight;
            out.drag += r.value.drag * r.weight;
            out.angular_drag += r.value.angular_drag * r.weight;
        }
        out.drag /= total_weight;
        out.angular_drag /= total_weight;
        out
    }

    fn is_finite(&self) -> bool {
        self.drag.is_finite() && self.angular_drag.is_finite() && self.gravity.iter().all(|c| f64::is_finite(*c))
    }
}

/// Per-vehicle receiver of the ambient field.
#[derive(Debug, Clone)]
pub struct AmbientFieldReceiver {
    default_sample: FieldSample,
    requests: RequestAggregator<FieldSample>,
    current: FieldSample,
}

impl AmbientFieldReceiver {
    pub fn new(default_sample: FieldSample) -> Self {
        Self {
            default_sample,
            requests: RequestAggregator::new(),
            current: default_sample,
        }
    }

    pub fn submit(&mut self, sample: FieldSample, weight: f64) {
        self.requests.submit(sample, weight);
    }

    /// Resolves this tick's contributions; nothing (or only zero weights) means the default sample.
    pub fn resolve(&mut self) -> FieldSample {
        self.current = if self.requests.is_empty() || self.requests.total_weight() <= 0.0 {
            self.requests.clear();
            self.default_sample
        } else {
            self.requests.resolve()
        };
        self.current
    }

    pub fn current(&self) -> FieldSample {
        self.current
    }

    /// Pushes drag and gravity into the body for one fixed step.
    pub fn apply(&self, body: &mut dyn PhysicsBody) {
        body.set_drag(self.current.drag, self.current.angular_drag);
        if body.use_gravity() && self.current.has_gravity() {
            body.add_force(self.current.gravity);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Natural,
    Artificial,
}

/// A region of space emitting an ambient field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSource {
    pub name: String,
    pub kind: SourceKind,
    pub center: Vector3<f64>,
    pub radius: f64,
    /// Acceleration magnitude.
    pub strength: f64,
    /// Used by artificial sources only.
    pub direction: Vector3<f64>,
    pub drag: f64,
    pub angular_drag: f64,
    pub weight: f64,
}

impl FieldSource {
    pub fn natural(name: &str, center: Vector3<f64>, radius: f64, strength: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: SourceKind::Natural,
            center,
            radius,
            strength,
            direction: Vector3::zeros(),
            drag: 0.0,
            angular_drag: 0.05,
            weight: 1.0,
        }
    }

    pub fn artificial(name: &str, center: Vector3<f64>, radius: f64, direction: Vector3<f64>, strength: f64) -> Self {
        Self {
            kind: SourceKind::Artificial,
            direction,
            ..Self::natural(name, center, radius, strength)
        }
    }

    pub fn with_drag(mut self, drag: f64, angular_drag: f64) -> Self {
        self.drag = drag;
        self.angular_drag = angular_drag;
        self
    }

    pub fn contains(&self, position: Vector3<f64>) -> bool {
        (position - self.center).norm() <= self.radius
    }

    /// Field felt at `position`, or `None` outside the radius.
    pub fn sample_at(&self, position: Vector3<f64>) -> Option<FieldSample> {
        if !self.contains(position) {
            return None;
        }

        let (kind, pull) = match self.kind {
            SourceKind::Natural => (FieldKind::Natural, self.center - position),
            SourceKind::Artificial => (FieldKind::Artificial, self.direction),
        };
        let gravity = pull.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros) * self.strength;

        Some(FieldSample {
            kind,
            drag: self.drag,
            angular_drag: self.angular_drag,
            gravity,
        })
    }

    /// Submits this source's contribution if `position` is inside it.
    pub fn contribute(&self, position: Vector3<f64>, receiver: &mut AmbientFieldReceiver) -> bool {
        match self.sample_at(position) {
            Some(sample) => {
                receiver.submit(sample, self.weight);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::KinematicBody;

    fn planet() -> FieldSource {
        FieldSource::natural("planet", Vector3::new(0.0, -100.0, 0.0), 200.0, 9.81).with_drag(0.2, 0.4)
    }

    #[test]
    fn no_contribution_resolves_to_default() {
        let default = FieldSample { drag: 0.3, ..FieldSample::default() };
        let mut rx = AmbientFieldReceiver::new(default);
        assert_eq!(rx.resolve(), default);
    }

    #[test]
    fn natural_source_pulls_toward_centre() {
        let sample = planet().sample_at(Vector3::new(0.0, 10.0, 0.0)).unwrap();
        assert_eq!(sample.kind, FieldKind::Natural);
        assert!((sample.gravity.y + 9.81).abs() < 1e-12);
        assert!(planet().sample_at(Vector3::new(0.0, 150.0, 0.0)).is_none());
    }

    #[test]
    fn gravity_superposes_and_drag_averages() {
        let mut rx = AmbientFieldReceiver::new(FieldSample::default());
        let at = Vector3::new(0.0, 10.0, 0.0);
        planet().contribute(at, &mut rx);
        FieldSource::artificial("fan", Vector3::zeros(), 50.0, Vector3::x(), 2.0)
            .with_drag(0.6, 0.0)
            .contribute(at, &mut rx);

        let s = rx.resolve();
        assert_eq!(s.kind, FieldKind::Mixed);
        assert!((s.gravity - Vector3::new(2.0, -9.81, 0.0)).norm() < 1e-12);
        assert!((s.drag - 0.4).abs() < 1e-12);
        assert!((s.angular_drag - 0.2).abs() < 1e-12);
    }

    #[test]
    fn kinds_merge() {
        assert_eq!(FieldKind::None.merge(FieldKind::Natural), FieldKind::Natural);
        assert_eq!(FieldKind::Natural.merge(FieldKind::Natural), FieldKind::Natural);
        assert_eq!(FieldKind::Natural.merge(FieldKind::Artificial), FieldKind::Mixed);
    }

    #[test]
    fn apply_sets_drag_and_gravity() {
        let mut rx = AmbientFieldReceiver::new(FieldSample::default());
        let mut body = KinematicBody::at(Vector3::new(0.0, 10.0, 0.0));
        planet().contribute(body.position, &mut rx);
        rx.resolve();
        rx.apply(&mut body);

        assert!((body.drag - 0.2).abs() < 1e-12);
        assert!((body.pending_force().y + 9.81).abs() < 1e-12);

        body.use_gravity = false;
        body.step(0.01);
        rx.apply(&mut body);
        assert_eq!(body.pending_force(), Vector3::zeros());
    }
}

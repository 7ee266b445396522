//! request.rs
//! Weighted request arbitration shared by every multi-writer actuator.
//!
//! Any number of uncoordinated sources (manual input, stabilizers, automatic handling)
//! submit `(value, weight)` pairs during the decide pass of a tick. Exactly one consumer
//! resolves them into a single net value, which also clears the list for the next tick.
//! Nobody holds exclusive access to an actuator: the weight is the arbitration.

use nalgebra::{Vector2, Vector3};

/// Below this resultant length a circular mean has no meaningful direction.
const DEGENERATE_EPSILON: f64 = 1e-9;

/// A proposed actuator value paired with its source's confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedRequest<T> {
    pub value: T,
    pub weight: f64,
}

/// Values that can be combined by weighted mean.
pub trait Blend: Copy {
    /// Value resolved when nothing, or nothing with positive weight, was requested.
    fn neutral() -> Self;

    /// Weighted mean of a non-empty request set whose `total_weight` is > 0.
    fn blend(requests: &[WeightedRequest<Self>], total_weight: f64) -> Self;

    fn is_finite(&self) -> bool;
}

macro_rules! impl_linear_blend {
    ($t:ty, $zero:expr, $finite:expr) => {
        impl Blend for $t {
            fn neutral() -> Self {
                $zero
            }

            fn blend(requests: &[WeightedRequest<Self>], total_weight: f64) -> Self {
                let sum = requests
                    .iter()
                    .fold($zero, |acc: $t, r| acc + r.value * r.weight);
                sum / total_weight
            }

            fn is_finite(&self) -> bool {
                $finite(self)
            }
        }
    };
}

impl_linear_blend!(f64, 0.0, |v: &f64| f64::is_finite(*v));
impl_linear_blend!(Vector2<f64>, Vector2::zeros(), |v: &Vector2<f64>| v
    .iter()
    .all(|c| f64::is_finite(*c)));
impl_linear_blend!(Vector3<f64>, Vector3::zeros(), |v: &Vector3<f64>| v
    .iter()
    .all(|c| f64::is_finite(*c)));

/// An angle in degrees.
///
/// Angles are blended as unit vectors `(cos, sin)` rather than linearly, so that
/// 359° and 1° average to 0° instead of 180°.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Angle(pub f64);

impl Angle {
    pub fn degrees(self) -> f64 {
        self.0
    }

    /// Same angle expressed in (-180, 180].
    pub fn signed(self) -> Self {
        Angle(wrap_degrees(self.0))
    }
}

impl Blend for Angle {
    fn neutral() -> Self {
        Angle(0.0)
    }

    fn blend(requests: &[WeightedRequest<Self>], total_weight: f64) -> Self {
        let (sin, cos) = requests.iter().fold((0.0, 0.0), |(s, c), r| {
            let rad = r.value.0.to_radians();
            (s + rad.sin() * r.weight, c + rad.cos() * r.weight)
        });

        // Opposing requests of equal weight cancel out: no direction to recover.
        if sin.hypot(cos) <= DEGENERATE_EPSILON * total_weight {
            return Angle::neutral();
        }

        Angle(sin.atan2(cos).to_degrees())
    }

    fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

/// Wraps any angle in degrees into (-180, 180].
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Signed shortest offset from `current` to `target`, both in degrees.
pub fn angle_offset(current: f64, target: f64) -> f64 {
    wrap_degrees(target - current)
}

/// Tick-local request list owned by exactly one actuator.
#[derive(Debug, Clone)]
pub struct RequestAggregator<T> {
    requests: Vec<WeightedRequest<T>>,
}

impl<T> Default for RequestAggregator<T> {
    fn default() -> Self {
        Self { requests: Vec::new() }
    }
}

impl<T: Blend> RequestAggregator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request for the current tick.
    /// Negative (or NaN) weights count as 0; non-finite values are dropped.
    pub fn submit(&mut self, value: T, weight: f64) {
        if !value.is_finite() {
            log::trace!("dropping non-finite request");
            return;
        }

        let weight = if weight > 0.0 && weight.is_finite() { weight } else { 0.0 };
        self.requests.push(WeightedRequest { value, weight });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.requests.iter().map(|r| r.weight).sum()
    }

    /// Weighted mean of the pending requests without consuming them.
    pub fn peek(&self) -> T {
        let total = self.total_weight();
        if self.requests.is_empty() || total <= 0.0 {
            return T::neutral();
        }
        T::blend(&self.requests, total)
    }

    /// Weighted mean of the pending requests; the list is cleared afterwards.
    pub fn resolve(&mut self) -> T {
        let value = self.peek();
        self.requests.clear();
        value
    }

    /// Drops pending requests (actuator disabled, tick cancelled).
    pub fn clear(&mut self) {
        self.requests.clear();
    }
}

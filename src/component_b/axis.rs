//! axis.rs
//! Paired thrusters driven through a single signed command.
//!
//! A signed request in [-1, 1] is split linearly: the positive part goes to the positive
//! thruster, the negated negative part to the opposite one, both with the caller's weight.
//! The pair only holds thruster ids; the bank owns the thrusters themselves.

use nalgebra::Vector2;

use crate::component_b::bank::ThrusterId;

/// Splits a signed command into `(positive, negative)` magnitudes in [0, 1].
#[inline]
pub fn decompose(value: f64) -> (f64, f64) {
    let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    (v.max(0.0), (-v).max(0.0))
}

/// One signed axis over two opposite thrusters (left {-1 .. 1} right).
#[derive(Debug, Clone)]
pub struct AxisThruster {
    pub name: String,
    pub negative: Option<ThrusterId>,
    pub positive: Option<ThrusterId>,
    pub(crate) is_on: bool,
}

impl AxisThruster {
    pub fn new(name: &str, negative: Option<ThrusterId>, positive: Option<ThrusterId>) -> Self {
        Self {
            name: name.to_string(),
            negative,
            positive,
            is_on: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }
}

/// Two signed axes over four thrusters.
/// X: left {-1 .. 1} right, Y: back {-1 .. 1} front.
#[derive(Debug, Clone)]
pub struct DoubleAxisThruster {
    pub name: String,
    pub x: AxisThruster,
    pub y: AxisThruster,
    pub(crate) is_on: bool,
}

impl DoubleAxisThruster {
    pub fn new(name: &str, x: AxisThruster, y: AxisThruster) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            is_on: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }
}

/// Clamps each component of a signed 2D command into [-1, 1].
pub fn clamp_direction(direction: Vector2<f64>) -> Vector2<f64> {
    direction.map(|c| if c.is_finite() { c.clamp(-1.0, 1.0) } else { 0.0 })
}

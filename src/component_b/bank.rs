//! bank.rs
//! Owns every actuator of a vehicle and routes requests to them by id.
//!
//! Controllers never hold actuator references; they hold ids into the bank and submit
//! through it. A request to an id the bank does not know is skipped (returns `false`),
//! which is how a vehicle layout with a missing paired actuator degrades.

use nalgebra::{UnitQuaternion, Vector2};

use crate::component_b::{
    actuator::{Actuator, Thruster, ThrusterSpec},
    axis::{AxisThruster, DoubleAxisThruster, clamp_direction, decompose},
    rotator::{Rotator, RotatorSpec},
};
use crate::physics::PhysicsBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThrusterId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RotatorId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoubleAxisId(pub usize);

#[derive(Debug, Default)]
pub struct ActuatorBank {
    thrusters: Vec<Thruster>,
    /// Gimbal carrying each thruster, same index as `thrusters`.
    mounts: Vec<Option<RotatorId>>,
    rotators: Vec<Rotator>,
    axes: Vec<AxisThruster>,
    double_axes: Vec<DoubleAxisThruster>,
    is_on: bool,
}

impl ActuatorBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thruster(&mut self, spec: ThrusterSpec) -> ThrusterId {
        self.add_mounted_thruster(spec, None)
    }

    /// Adds a thruster whose direction follows the given rotator.
    pub fn add_mounted_thruster(&mut self, spec: ThrusterSpec, gimbal: Option<RotatorId>) -> ThrusterId {
        let mut thruster = Thruster::new(spec);
        thruster.set_on(self.is_on);
        self.thrusters.push(thruster);
        self.mounts.push(gimbal.filter(|id| id.0 < self.rotators.len()));
        ThrusterId(self.thrusters.len() - 1)
    }

    pub fn add_rotator(&mut self, spec: RotatorSpec) -> RotatorId {
        let mut rotator = Rotator::new(spec);
        rotator.set_on(self.is_on);
        self.rotators.push(rotator);
        RotatorId(self.rotators.len() - 1)
    }

    /// Pairs two thrusters into a signed axis; unknown ids leave that side empty.
    pub fn add_axis(&mut self, name: &str, negative: Option<ThrusterId>, positive: Option<ThrusterId>) -> AxisId {
        let mut axis = AxisThruster::new(name, self.known(negative), self.known(positive));
        axis.is_on = self.is_on;
        self.axes.push(axis);
        AxisId(self.axes.len() - 1)
    }

    pub fn add_double_axis(
        &mut self,
        name: &str,
        x: (Option<ThrusterId>, Option<ThrusterId>),
        y: (Option<ThrusterId>, Option<ThrusterId>),
    ) -> DoubleAxisId {
        let x_axis = AxisThruster::new(&format!("{}.x", name), self.known(x.0), self.known(x.1));
        let y_axis = AxisThruster::new(&format!("{}.y", name), self.known(y.0), self.known(y.1));
        let mut pair = DoubleAxisThruster::new(name, x_axis, y_axis);
        pair.is_on = self.is_on;
        self.double_axes.push(pair);
        DoubleAxisId(self.double_axes.len() - 1)
    }

    fn known(&self, id: Option<ThrusterId>) -> Option<ThrusterId> {
        id.filter(|id| id.0 < self.thrusters.len())
    }

    pub fn thruster(&self, id: ThrusterId) -> Option<&Thruster> {
        self.thrusters.get(id.0)
    }

    pub fn rotator(&self, id: RotatorId) -> Option<&Rotator> {
        self.rotators.get(id.0)
    }

    pub fn axis(&self, id: AxisId) -> Option<&AxisThruster> {
        self.axes.get(id.0)
    }

    pub fn double_axis(&self, id: DoubleAxisId) -> Option<&DoubleAxisThruster> {
        self.double_axes.get(id.0)
    }

    pub fn thrusters(&self) -> impl Iterator<Item = &Thruster> {
        self.thrusters.iter()
    }

    pub fn rotators(&self) -> impl Iterator<Item = &Rotator> {
        self.rotators.iter()
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Switches every actuator; switching off drops all pending requests.
    pub fn set_on(&mut self, on: bool) {
        self.is_on = on;
        for t in &mut self.thrusters {
            t.set_on(on);
        }
        for r in &mut self.rotators {
            r.set_on(on);
        }
        for a in &mut self.axes {
            a.is_on = on;
        }
        for d in &mut self.double_axes {
            d.is_on = on;
            d.x.is_on = on;
            d.y.is_on = on;
        }
    }

    /// Switches a single thruster (take-off group, turbo); only while the bank is on.
    pub fn set_thruster_on(&mut self, id: ThrusterId, on: bool) -> bool {
        let bank_on = self.is_on;
        match self.thrusters.get_mut(id.0) {
            Some(t) => {
                t.set_on(on && bank_on);
                true
            }
            None => false,
        }
    }

    pub fn request_force(&mut self, id: ThrusterId, force: f64, weight: f64) -> bool {
        match self.thrusters.get_mut(id.0) {
            Some(t) => {
                t.request_force(force, weight);
                true
            }
            None => {
                log::warn!("force request to unknown thruster {}", id.0);
                false
            }
        }
    }

    pub fn request_angle(&mut self, id: RotatorId, angle: f64, weight: f64) -> bool {
        match self.rotators.get_mut(id.0) {
            Some(r) => {
                r.request_angle(angle, weight);
                true
            }
            None => {
                log::warn!("angle request to unknown rotator {}", id.0);
                false
            }
        }
    }

    /// Signed request in [-1, 1] split across the pair with the same weight.
    pub fn request_axis(&mut self, id: AxisId, value: f64, weight: f64) -> bool {
        let Some(axis) = self.axes.get(id.0) else {
            log::warn!("axis request to unknown axis {}", id.0);
            return false;
        };
        if !axis.is_on {
            return false;
        }
        let (negative, positive) = (axis.negative, axis.positive);
        self.submit_pair(negative, positive, value, weight)
    }

    /// X goes to the left/right pair, Y to the back/front pair.
    pub fn request_double_axis(&mut self, id: DoubleAxisId, direction: Vector2<f64>, weight: f64) -> bool {
        let Some(pair) = self.double_axes.get(id.0) else {
            log::warn!("double axis request to unknown pair {}", id.0);
            return false;
        };
        if !pair.is_on {
            return false;
        }
        let direction = clamp_direction(direction);
        let (x, y) = ((pair.x.negative, pair.x.positive), (pair.y.negative, pair.y.positive));
        let x_ok = self.submit_pair(x.0, x.1, direction.x, weight);
        let y_ok = self.submit_pair(y.0, y.1, direction.y, weight);
        x_ok && y_ok
    }

    fn submit_pair(
        &mut self,
        negative: Option<ThrusterId>,
        positive: Option<ThrusterId>,
        value: f64,
        weight: f64,
    ) -> bool {
        let (pos, neg) = decompose(value);
        let mut complete = true;

        match positive {
            Some(id) => {
                self.request_force(id, pos, weight);
            }
            None => complete = false,
        }
        match negative {
            Some(id) => {
                self.request_force(id, neg, weight);
            }
            None => complete = false,
        }

        complete
    }

    /// Signed requested value of an axis: positive side minus negative side.
    pub fn axis_requested(&self, id: AxisId) -> f64 {
        self.axes
            .get(id.0)
            .map(|a| self.side(a.positive) - self.side(a.negative))
            .unwrap_or(0.0)
    }

    pub fn double_axis_requested(&self, id: DoubleAxisId) -> Vector2<f64> {
        self.double_axes
            .get(id.0)
            .map(|d| {
                Vector2::new(
                    self.side(d.x.positive) - self.side(d.x.negative),
                    self.side(d.y.positive) - self.side(d.y.negative),
                )
            })
            .unwrap_or_else(Vector2::zeros)
    }

    fn side(&self, id: Option<ThrusterId>) -> f64 {
        id.and_then(|id| self.thrusters.get(id.0))
            .map(|t| t.requested_normalized())
            .unwrap_or(0.0)
    }

    /// Resolve pass: every actuator turns its pending requests into one held value.
    pub fn resolve_all(&mut self) {
        for t in &mut self.thrusters {
            t.resolve();
        }
        for r in &mut self.rotators {
            r.resolve();
        }
    }

    /// Apply pass for one fixed step. Gimbals move first so mounted thrusters
    /// push along the rotated direction in the same step.
    pub fn apply_all(&mut self, dt: f64, body: &mut dyn PhysicsBody) {
        for r in &mut self.rotators {
            r.apply(dt, body);
        }

        for (thruster, mount) in self.thrusters.iter_mut().zip(self.mounts.iter()) {
            let gimbal = mount
                .and_then(|id| self.rotators.get(id.0))
                .map(|r| r.current_rotation())
                .unwrap_or_else(UnitQuaternion::identity);
            thruster.apply_mounted(dt, body, gimbal);
        }
    }
}

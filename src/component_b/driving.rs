//! driving.rs
//! Automatic driving mode: status-driven stabilization choices and target capture.
//!
//! The handler learns the current status only from the status feed. Each frame it
//! - drains pending status changes,
//! - in Automatic mode, decides stabilization types, take-off group and gear from that status,
//! - in any mode, captures fresh targets when a stabilizer enters a target-holding mode.

use crossbeam::channel::Receiver;
use log::debug;
use nalgebra::{UnitQuaternion, Vector3};

use crate::component_a::{
    sensor::SensorSnapshot,
    status::{IN_SPACE, OFF_STATUS},
    status_feed::StatusChange,
};
use crate::component_b::{
    landing_gear::GearStatus,
    position::{PositionStabilization, PositionStabilizer},
    torque::{TorqueStabilization, TorqueStabilizer},
};

/// What automatic mode wants this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomaticPlan {
    pub xz: TorqueStabilization,
    pub y: TorqueStabilization,
    /// Only forced in space; otherwise the pilot's choice stands.
    pub position: Option<PositionStabilization>,
    pub take_off_on: bool,
    /// `Some(retract)` when the gear has to move.
    pub retract_gear: Option<bool>,
}

pub struct DrivingModeHandler {
    status_rx: Receiver<StatusChange>,
    status: &'static str,
    torque_target_set: bool,
    position_target_set: bool,
}

impl DrivingModeHandler {
    pub fn new(status_rx: Receiver<StatusChange>) -> Self {
        Self {
            status_rx,
            status: OFF_STATUS,
            torque_target_set: false,
            position_target_set: false,
        }
    }

    /// Status as last reported by the feed.
    pub fn status(&self) -> &'static str {
        self.status
    }

    /// Consumes every pending notification; returns how many arrived.
    pub fn sync(&mut self) -> usize {
        let mut count = 0;
        for change in self.status_rx.try_iter() {
            debug!("tick {}: handler sees {} -> {}", change.tick, change.previous, change.current);
            self.status = change.current;
            count += 1;
        }
        count
    }

    pub fn plan(&self, snapshot: &SensorSnapshot) -> AutomaticPlan {
        let in_space = self.status == IN_SPACE;
        let hovering = snapshot.ground.is_some();
        let gear_must_move = (snapshot.gear == GearStatus::Out && !hovering)
            || (snapshot.gear == GearStatus::In && hovering);

        AutomaticPlan {
            xz: if in_space { TorqueStabilization::Velocity } else { TorqueStabilization::Direction },
            y: TorqueStabilization::Velocity,
            position: in_space.then_some(PositionStabilization::Velocity),
            take_off_on: !in_space,
            retract_gear: gear_must_move.then_some(!hovering),
        }
    }

    /// Captures the attitude and position targets on entry into Direction / Position.
    pub fn capture_targets(
        &mut self,
        snapshot: &SensorSnapshot,
        torque: &mut TorqueStabilizer,
        position: &mut PositionStabilizer,
    ) {
        match (self.torque_target_set, torque.xz_mode() == TorqueStabilization::Direction) {
            (false, true) => {
                torque.set_expected_rotation(levelled_heading(snapshot));
                self.torque_target_set = true;
            }
            (true, false) => self.torque_target_set = false,
            _ => {}
        }

        match (self.position_target_set, position.mode() == PositionStabilization::Position) {
            (false, true) => {
                position.set_expected_position(snapshot.position);
                self.position_target_set = true;
            }
            (true, false) => self.position_target_set = false,
            _ => {}
        }
    }
}

/// Current heading, levelled against the field: up = -gravity when there is gravity.
pub fn levelled_heading(snapshot: &SensorSnapshot) -> UnitQuaternion<f64> {
    let rotation = snapshot.rotation;
    let up = snapshot.field.up().unwrap_or_else(|| rotation * Vector3::y());
    let forward = rotation * Vector3::z();
    let levelled = forward - up * forward.dot(&up);

    if levelled.norm() < 1e-9 {
        // Nose straight along the field: keep the current attitude.
        return rotation;
    }
    UnitQuaternion::face_towards(&levelled, &up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_a::ambient::FieldSample;
    use crate::component_a::sensor::GroundInfo;
    use crate::component_a::status::{LANDED, UNDER_GRAVITY};
    use crate::component_b::position::PositionConfig;
    use crate::component_b::torque::TorqueConfig;
    use crossbeam::channel::bounded;

    fn handler_with(status: &'static str) -> DrivingModeHandler {
        let (tx, rx) = bounded(4);
        let _ = tx.try_send(StatusChange { tick: 1, previous: OFF_STATUS, current: status });
        let mut h = DrivingModeHandler::new(rx);
        assert_eq!(h.sync(), 1);
        h
    }

    fn gravity() -> FieldSample {
        FieldSample { gravity: Vector3::new(0.0, -9.81, 0.0), ..FieldSample::default() }
    }

    #[test]
    fn space_plan() {
        let h = handler_with(IN_SPACE);
        let plan = h.plan(&SensorSnapshot { gear: GearStatus::In, ..SensorSnapshot::default() });
        assert_eq!(plan.xz, TorqueStabilization::Velocity);
        assert_eq!(plan.y, TorqueStabilization::Velocity);
        assert_eq!(plan.position, Some(PositionStabilization::Velocity));
        assert!(!plan.take_off_on);
        assert_eq!(plan.retract_gear, None);
    }

    #[test]
    fn gravity_plan_deploys_gear_near_ground() {
        let h = handler_with(UNDER_GRAVITY);
        let snap = SensorSnapshot {
            gear: GearStatus::In,
            ground: Some(GroundInfo { distance: 3.0, normal: Vector3::y(), point: Vector3::zeros() }),
            ..SensorSnapshot::default()
        };
        let plan = h.plan(&snap);
        assert_eq!(plan.xz, TorqueStabilization::Direction);
        assert_eq!(plan.position, None);
        assert!(plan.take_off_on);
        assert_eq!(plan.retract_gear, Some(false));

        // Gear out and nothing below: retract.
        let plan = h.plan(&SensorSnapshot::default());
        assert_eq!(plan.retract_gear, Some(true));
    }

    #[test]
    fn moving_gear_is_left_alone() {
        let h = handler_with(LANDED);
        let plan = h.plan(&SensorSnapshot { gear: GearStatus::Moving, ..SensorSnapshot::default() });
        assert_eq!(plan.retract_gear, None);
    }

    #[test]
    fn heading_is_levelled_on_entry_only() {
        let (_tx, rx) = bounded(1);
        let mut h = DrivingModeHandler::new(rx);
        let mut torque = TorqueStabilizer::new(TorqueConfig::default());
        let mut position = PositionStabilizer::new(PositionConfig::default());
        torque.set_xz_mode(TorqueStabilization::Direction);

        let tilted = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5);
        let snap = SensorSnapshot { rotation: tilted, field: gravity(), ..SensorSnapshot::default() };
        h.capture_targets(&snap, &mut torque, &mut position);

        let target = torque.expected_rotation();
        assert!(((target * Vector3::y()) - Vector3::y()).norm() < 1e-9);
        let forward = target * Vector3::z();
        assert!(forward.y.abs() < 1e-9);

        // Already captured: a new attitude does not move the target.
        let other = SensorSnapshot { rotation: UnitQuaternion::identity(), ..snap.clone() };
        h.capture_targets(&other, &mut torque, &mut position);
        assert_eq!(torque.expected_rotation(), target);
    }

    #[test]
    fn position_is_captured_on_entry() {
        let (_tx, rx) = bounded(1);
        let mut h = DrivingModeHandler::new(rx);
        let mut torque = TorqueStabilizer::new(TorqueConfig::default());
        let mut position = PositionStabilizer::new(PositionConfig::default());
        position.set_mode(PositionStabilization::Position);

        let snap = SensorSnapshot { position: Vector3::new(1.0, 2.0, 3.0), ..SensorSnapshot::default() };
        h.capture_targets(&snap, &mut torque, &mut position);
        assert_eq!(position.expected_position(), Vector3::new(1.0, 2.0, 3.0));

        position.set_mode(PositionStabilization::Velocity);
        h.capture_targets(&snap, &mut torque, &mut position);
        position.set_mode(PositionStabilization::Position);
        let moved = SensorSnapshot { position: Vector3::new(5.0, 5.0, 5.0), ..snap };
        h.capture_targets(&moved, &mut torque, &mut position);
        assert_eq!(position.expected_position(), Vector3::new(5.0, 5.0, 5.0));
    }
}

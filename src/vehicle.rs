//! vehicle.rs
//! One vehicle: sensing, status, stabilizers and actuators wired with explicit context.
//!
//! Two phases per simulation tick:
//! - `frame(dt, ..)` (variable step): snapshot → status → automatic decisions → every
//!   source queues its requests → the scheduler commits and the bank resolves once.
//! - `fixed_step(dt, ..)` (fixed step): gear travel, actuators apply, ambient field applies.
//!
//! Nothing here owns the physics body; it is passed in on every call.

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::{Vector2, Vector3};

use crate::component_a::{
    ambient::{AmbientFieldReceiver, FieldSample, FieldSource},
    input::ManualInput,
    sensor::{SensorProbe, SensorSnapshot},
    status::{LanderProfile, StatusMachine, VehicleProfile},
    status_feed::StatusFeed,
};
use crate::component_b::{
    actuator::{Actuator, ForceKind, ThrusterSpec},
    bank::{ActuatorBank, AxisId, DoubleAxisId, RotatorId, ThrusterId},
    driving::{AutomaticPlan, DrivingModeHandler},
    landing_gear::LandingGear,
    position::{PositionStabilization, PositionStabilizer},
    rotator::RotatorSpec,
    scheduler::TickScheduler,
    torque::{TorqueStabilization, TorqueStabilizer},
};
use crate::config::SimConfig;
use crate::physics::PhysicsBody;
use crate::utils::metrics::{Event, EventRecorder};

const STATUS_FEED_CAPACITY: usize = 64;

/// Which actuators play which role. Any role may be missing.
#[derive(Debug, Clone, Default)]
pub struct ShipLayout {
    pub take_off: Vec<ThrusterId>,
    pub turbo: Option<ThrusterId>,
    /// X: pitch, Y: roll.
    pub torque: Option<DoubleAxisId>,
    pub y_torque: Option<AxisId>,
    /// X: lateral, Y: forward.
    pub strafe: Option<DoubleAxisId>,
    pub y_strafe: Option<AxisId>,
    pub gimbal: Option<RotatorId>,
}

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub tick: u64,
    pub status: &'static str,
    pub driving_mode: &'static str,
    pub field: FieldSample,
    pub torque_correction: Vector3<f64>,
    pub position_correction: Vector3<f64>,
    pub submitted: usize,
    pub skipped: usize,
}

pub struct Vehicle {
    bank: ActuatorBank,
    layout: ShipLayout,
    status: StatusMachine,
    handler: DrivingModeHandler,
    torque: TorqueStabilizer,
    position: PositionStabilizer,
    gear: LandingGear,
    ambient: AmbientFieldReceiver,
    scheduler: TickScheduler,
    recorder: Arc<EventRecorder>,
    snapshot: SensorSnapshot,
    active: Vec<bool>,
    tick: u64,
}

impl Vehicle {
    pub fn new(
        bank: ActuatorBank,
        layout: ShipLayout,
        profile: Box<dyn VehicleProfile>,
        config: &SimConfig,
        recorder: Arc<EventRecorder>,
    ) -> Self {
        let (feed, status_rx) = StatusFeed::new(STATUS_FEED_CAPACITY, recorder.clone());
        let status = StatusMachine::new(profile, config.status).with_feed(feed);
        let active = vec![false; bank.thrusters().count()];

        Self {
            bank,
            layout,
            status,
            handler: DrivingModeHandler::new(status_rx),
            torque: TorqueStabilizer::new(config.torque),
            position: PositionStabilizer::new(config.position),
            gear: LandingGear::new(config.gear.travel_time),
            ambient: AmbientFieldReceiver::new(config.field.default_sample),
            scheduler: TickScheduler::new(),
            recorder,
            snapshot: SensorSnapshot::default(),
            active,
            tick: 0,
        }
    }

    /// Standard lander: four take-off thrusters, gimballed turbo, torque and strafe pairs.
    pub fn lander(config: &SimConfig, recorder: Arc<EventRecorder>) -> Self {
        let t = &config.thrusters;
        let rate = t.approach_rate;
        let mut bank = ActuatorBank::new();

        let take_off = [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]
            .iter()
            .enumerate()
            .map(|(i, (x, z))| {
                bank.add_thruster(
                    ThrusterSpec::new(&format!("take_off_{}", i), ForceKind::Force, Vector3::y(), t.take_off_max)
                        .with_mount(Vector3::new(*x, -0.5, *z))
                        .with_approach_rate(rate)
                        .with_curve(t.take_off_curve.clone()),
                )
            })
            .collect();

        let gimbal = bank.add_rotator(RotatorSpec {
            name: "turbo_gimbal".into(),
            local_axis: Vector3::x(),
            limits: [-t.gimbal_limit, t.gimbal_limit],
            approach_rate: t.gimbal_rate,
        });
        let turbo = bank.add_mounted_thruster(
            ThrusterSpec::new("turbo", ForceKind::Force, Vector3::z(), t.turbo_max).with_approach_rate(rate),
            Some(gimbal),
        );

        let pitch = add_pair(&mut bank, "pitch", ForceKind::Torque, Vector3::x(), t.torque_max, rate);
        let roll = add_pair(&mut bank, "roll", ForceKind::Torque, Vector3::z(), t.torque_max, rate);
        let yaw = add_pair(&mut bank, "yaw", ForceKind::Torque, Vector3::y(), t.y_torque_max, rate);
        let lateral = add_pair(&mut bank, "lateral", ForceKind::Force, Vector3::x(), t.strafe_max, rate);
        let forward = add_pair(&mut bank, "forward", ForceKind::Force, Vector3::z(), t.strafe_max, rate);
        let vertical = add_pair(&mut bank, "vertical", ForceKind::Force, Vector3::y(), t.vertical_max, rate);

        let layout = ShipLayout {
            take_off,
            turbo: Some(turbo),
            torque: Some(bank.add_double_axis("torque", pitch, roll)),
            y_torque: Some(bank.add_axis("y_torque", yaw.0, yaw.1)),
            strafe: Some(bank.add_double_axis("strafe", lateral, forward)),
            y_strafe: Some(bank.add_axis("y_strafe", vertical.0, vertical.1)),
            gimbal: Some(gimbal),
        };

        Self::new(bank, layout, Box::new(LanderProfile), config, recorder)
    }

    pub fn bank(&self) -> &ActuatorBank {
        &self.bank
    }

    pub fn layout(&self) -> &ShipLayout {
        &self.layout
    }

    pub fn torque(&self) -> &TorqueStabilizer {
        &self.torque
    }

    pub fn position(&self) -> &PositionStabilizer {
        &self.position
    }

    pub fn gear(&self) -> &LandingGear {
        &self.gear
    }

    pub fn status(&self) -> &StatusMachine {
        &self.status
    }

    pub fn current_status(&self) -> &'static str {
        self.status.current_status()
    }

    pub fn field(&self) -> FieldSample {
        self.ambient.current()
    }

    /// Snapshot taken by the last frame.
    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_on(&self) -> bool {
        self.status.is_on()
    }

    /// Switching off forces `Off`, clears every pending request and resets every PID.
    pub fn set_on(&mut self, on: bool) {
        self.status.set_on(on);
        self.bank.set_on(on);
        self.torque.set_on(on);
        self.position.set_on(on);
        self.gear.set_on(on);
        if !on {
            self.scheduler.discard();
        }
    }

    /// Leaving automatic mode hands the take-off group back to the pilot.
    pub fn set_driving_mode(&mut self, mode: &str) -> bool {
        if !self.status.set_driving_mode(mode) {
            return false;
        }
        if !self.status.is_automatic() {
            for &id in &self.layout.take_off {
                self.bank.set_thruster_on(id, true);
            }
        }
        true
    }

    pub fn set_xz_stabilization(&mut self, mode: TorqueStabilization) {
        if self.torque.set_xz_mode(mode) {
            self.record_mode("torque.xz", mode.to_string());
        }
    }

    pub fn set_y_stabilization(&mut self, mode: TorqueStabilization) {
        if self.torque.set_y_mode(mode) {
            self.record_mode("torque.y", mode.to_string());
        }
    }

    pub fn set_position_stabilization(&mut self, mode: PositionStabilization) {
        if self.position.set_mode(mode) {
            self.record_mode("position", mode.to_string());
        }
    }

    fn record_mode(&self, group: &'static str, mode: String) {
        debug!("tick {}: {} -> {}", self.tick, group, mode);
        self.recorder.record(Event::StabilizationChanged { tick: self.tick, group, mode });
    }

    fn skip(&self, controller: &'static str, reason: &'static str) {
        warn!("tick {}: {} correction skipped ({})", self.tick, controller, reason);
        self.recorder.record(Event::CorrectionSkipped { tick: self.tick, controller, reason });
    }

    /// Decide and resolve pass for one frame.
    pub fn frame(
        &mut self,
        dt: f64,
        body: &dyn PhysicsBody,
        probe: &mut dyn SensorProbe,
        sources: &[FieldSource],
        input: &ManualInput,
    ) -> FrameReport {
        self.tick += 1;

        for source in sources {
            source.contribute(body.position(), &mut self.ambient);
        }
        let field = self.ambient.resolve();

        let mut snapshot = SensorSnapshot::of_body(self.tick, body);
        snapshot.ground = probe.ground(body);
        snapshot.ground_contacts = probe.ground_contacts(body);
        snapshot.gear = self.gear.status();
        snapshot.field = field;

        self.status.refresh(&snapshot);
        self.handler.sync();

        if self.status.is_on() && self.status.is_automatic() {
            let plan = self.handler.plan(&snapshot);
            self.follow(plan);
        }
        self.handler.capture_targets(&snapshot, &mut self.torque, &mut self.position);

        if self.status.is_on() {
            self.queue_manual(input);
            self.queue_stabilizers(dt, &snapshot);
        }

        let commit = self.scheduler.commit(&mut self.bank);
        for &source in &commit.skipped {
            self.skip(source, "incomplete_pair");
        }
        self.record_activity();

        self.snapshot = snapshot;
        FrameReport {
            tick: self.tick,
            status: self.status.current_status(),
            driving_mode: self.status.current_driving_mode(),
            field,
            torque_correction: self.torque.current_correction(),
            position_correction: self.position.current_correction(),
            submitted: commit.submitted,
            skipped: commit.skipped.len(),
        }
    }

    /// Apply pass for one fixed physics step.
    pub fn fixed_step(&mut self, dt: f64, body: &mut dyn PhysicsBody) {
        self.gear.update(dt);
        self.bank.apply_all(dt, body);
        self.ambient.apply(body);
    }

    fn follow(&mut self, plan: AutomaticPlan) {
        self.set_xz_stabilization(plan.xz);
        self.set_y_stabilization(plan.y);
        if let Some(mode) = plan.position {
            self.set_position_stabilization(mode);
        }

        for &id in &self.layout.take_off {
            let was_on = self.bank.thruster(id).is_some_and(|t| t.is_on());
            if was_on != plan.take_off_on {
                self.bank.set_thruster_on(id, plan.take_off_on);
            }
        }

        if let Some(retract) = plan.retract_gear {
            self.gear.retract(retract);
        }
    }

    fn queue_manual(&mut self, input: &ManualInput) {
        let w = input.weight;
        let layout = &self.layout;

        if input.take_off > 0.0 && !layout.take_off.is_empty() {
            let ids = layout.take_off.clone();
            let value = input.take_off;
            self.scheduler.submit("manual.take_off", move |b| {
                ids.iter().fold(true, |ok, id| b.request_force(*id, value, w) && ok)
            });
        }
        if let (true, Some(id)) = (input.turbo > 0.0, layout.turbo) {
            let value = input.turbo;
            self.scheduler.submit("manual.turbo", move |b| b.request_force(id, value, w));
        }
        if let (true, Some(id)) = (input.torque != Vector2::zeros(), layout.torque) {
            let value = input.shaped_torque();
            self.scheduler.submit("manual.torque", move |b| b.request_double_axis(id, value, w));
        }
        if let (true, Some(id)) = (input.xz_strafe() != Vector2::zeros(), layout.strafe) {
            let value = input.xz_strafe();
            self.scheduler.submit("manual.strafe", move |b| b.request_double_axis(id, value, w));
        }
        if let (true, Some(id)) = (input.shaped_y_torque() != 0.0, layout.y_torque) {
            let value = input.shaped_y_torque();
            self.scheduler.submit("manual.y_torque", move |b| b.request_axis(id, value, w));
        }
        if let (true, Some(id)) = (input.y_strafe() != 0.0, layout.y_strafe) {
            let value = input.y_strafe();
            self.scheduler.submit("manual.y_strafe", move |b| b.request_axis(id, value, w));
        }
        if let (Some(angle), Some(id)) = (input.gimbal, layout.gimbal) {
            self.scheduler.submit("manual.gimbal", move |b| b.request_angle(id, angle, w));
        }
    }

    fn queue_stabilizers(&mut self, dt: f64, snapshot: &SensorSnapshot) {
        let torque = self.torque.update(dt, snapshot);
        let w = torque.weight;
        if let Some(xz) = torque.xz {
            match self.layout.torque {
                Some(id) => self.scheduler.submit("torque.xz", move |b| b.request_double_axis(id, xz, w)),
                None => self.skip("torque.xz", "no_actuator"),
            }
        }
        if let Some(y) = torque.y {
            match self.layout.y_torque {
                Some(id) => self.scheduler.submit("torque.y", move |b| b.request_axis(id, y, w)),
                None => self.skip("torque.y", "no_actuator"),
            }
        }

        let position = self.position.update(dt, snapshot);
        let w = position.weight;
        if let Some(strafe) = position.strafe {
            match self.layout.strafe {
                Some(id) => self.scheduler.submit("position.strafe", move |b| b.request_double_axis(id, strafe, w)),
                None => self.skip("position.strafe", "no_actuator"),
            }
        }
        if let Some(vertical) = position.vertical {
            match self.layout.y_strafe {
                Some(id) => self.scheduler.submit("position.vertical", move |b| b.request_axis(id, vertical, w)),
                None => self.skip("position.vertical", "no_actuator"),
            }
        }

        if torque.xz.is_some() || torque.y.is_some() {
            self.recorder.record(Event::CorrectionApplied {
                tick: self.tick,
                controller: "torque",
                magnitude: self.torque.current_correction().norm(),
            });
        }
        if position.strafe.is_some() || position.vertical.is_some() {
            self.recorder.record(Event::CorrectionApplied {
                tick: self.tick,
                controller: "position",
                magnitude: self.position.current_correction().norm(),
            });
        }
    }

    /// Records thrusters that switch between idle and active.
    fn record_activity(&mut self) {
        for (i, thruster) in self.bank.thrusters().enumerate() {
            let requested = thruster.requested_normalized();
            let active = requested > 0.0;
            if self.active.get(i).copied() != Some(active) {
                if let Some(slot) = self.active.get_mut(i) {
                    *slot = active;
                }
                self.recorder.record(Event::ActuatorResolved {
                    tick: self.tick,
                    actuator: thruster.name().to_string(),
                    requested,
                });
            }
        }
    }
}

/// Negative and positive thruster along one local axis.
fn add_pair(
    bank: &mut ActuatorBank,
    name: &str,
    kind: ForceKind,
    axis: Vector3<f64>,
    max: f64,
    rate: f64,
) -> (Option<ThrusterId>, Option<ThrusterId>) {
    let negative = bank.add_thruster(ThrusterSpec::new(&format!("{}-", name), kind, -axis, max).with_approach_rate(rate));
    let positive = bank.add_thruster(ThrusterSpec::new(&format!("{}+", name), kind, axis, max).with_approach_rate(rate));
    (Some(negative), Some(positive))
}

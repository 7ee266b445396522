//! scenario.rs
//! Scripted flight on the stand-in body: lift-off, hover hold, disturbance, climb to space.
//!
//! Frames run at `frame_dt`; fixed physics steps accumulate at `fixed_dt` so a frame may be
//! followed by zero, one or several steps. With `realtime` set, frames are paced against the
//! wall clock the same way the periodic tasks are.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use spin_sleep::{SpinSleeper, SpinStrategy};

use crate::component_a::{
    input::ManualInput,
    sensor::SimulatedSensor,
    status::AUTOMATIC_MODE,
};
use crate::component_b::{actuator::Actuator, position::PositionStabilization};
use crate::config::SimConfig;
use crate::physics::{KinematicBody, PhysicsBody};
use crate::utils::{
    export::TickRow,
    metrics::{EventRecorder, Metrics, push_capped},
};
use crate::vehicle::{FrameReport, Vehicle};

/// One scripted pilot phase, active from `from_s` until the next phase starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub from_s: f64,
    pub name: &'static str,
    pub input: ManualInput,
    /// Position stabilization selected on entry, if any.
    pub position: Option<PositionStabilization>,
    /// Angular velocity kick added to the body on entry.
    pub kick: Option<Vector3<f64>>,
}

impl Phase {
    fn new(from_s: f64, name: &'static str, input: ManualInput) -> Self {
        Self { from_s, name, input, position: None, kick: None }
    }
}

/// Built-in scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Lift-off, hover hold, disturbance, climb out of the gravity well.
    #[default]
    Flight,
    /// Lift-off and hover hold with a disturbance; never leaves the field.
    Hover,
}

impl ScenarioKind {
    pub fn script(self) -> Vec<Phase> {
        match self {
            ScenarioKind::Flight => flight_script(),
            ScenarioKind::Hover => hover_script(),
        }
    }
}

fn throttle(take_off: f64) -> ManualInput {
    ManualInput { take_off, ..ManualInput::idle() }
}

pub fn hover_script() -> Vec<Phase> {
    vec![
        Phase::new(0.0, "idle", ManualInput::idle()),
        Phase::new(1.0, "lift_off", throttle(0.8)),
        Phase { position: Some(PositionStabilization::Position), ..Phase::new(2.0, "hover", throttle(0.5)) },
        Phase { kick: Some(Vector3::new(1.5, 0.0, 0.8)), ..Phase::new(8.0, "disturbance", throttle(0.5)) },
    ]
}

pub fn flight_script() -> Vec<Phase> {
    let mut script = hover_script();
    script.extend([
        Phase { position: Some(PositionStabilization::None), ..Phase::new(14.0, "climb", throttle(1.0)) },
        Phase {
            input: ManualInput { turbo: 0.2, gimbal: Some(15.0), ..ManualInput::idle() },
            ..Phase::new(30.0, "cruise", ManualInput::idle())
        },
        Phase::new(33.0, "coast", ManualInput::idle()),
    ]);
    script
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioOutcome {
    /// Last `MAX_POINTS` frames; the full trace goes through the row callback of `run_with`.
    pub rows: VecDeque<TickRow>,
    pub metrics: Metrics,
    pub final_status: &'static str,
    pub max_height: f64,
    /// Phases in the order they were entered.
    pub phases: Vec<&'static str>,
}

pub struct Scenario {
    config: SimConfig,
    script: Vec<Phase>,
    vehicle: Vehicle,
    body: KinematicBody,
    sensor: SimulatedSensor,
}

impl Scenario {
    pub fn new(config: SimConfig, recorder: Arc<EventRecorder>) -> Self {
        let vehicle = Vehicle::lander(&config, recorder);
        let body = KinematicBody {
            ground_clearance: config.gear.height,
            ..KinematicBody::at(Vector3::new(0.0, config.gear.height, 0.0))
        };
        let mut sensor = SimulatedSensor::new(
            config.run.altimeter_range,
            config.gear.height,
            config.run.sensor_noise,
            config.run.seed,
        );
        sensor.legs = config.gear.legs;

        let script = config.run.scenario.script();
        Self { config, script, vehicle, body, sensor }
    }

    pub fn with_script(mut self, script: Vec<Phase>) -> Self {
        self.script = script;
        self
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn body(&self) -> &KinematicBody {
        &self.body
    }

    fn phase_at(&self, t: f64) -> Option<usize> {
        self.script.iter().rposition(|p| p.from_s <= t)
    }

    pub fn run(&mut self) -> ScenarioOutcome {
        self.run_with(|_| {})
    }

    /// Runs the script, handing every frame's row to `on_row` as it is produced.
    pub fn run_with<F: FnMut(&TickRow)>(&mut self, mut on_row: F) -> ScenarioOutcome {
        let run = self.config.run.clone();
        let mut outcome = ScenarioOutcome {
            max_height: self.body.position.y,
            ..ScenarioOutcome::default()
        };

        self.vehicle.set_on(true);
        self.vehicle.set_driving_mode(AUTOMATIC_MODE);
        info!(
            "scenario start: {:.1}s, frame_dt={:.4}, fixed_dt={:.4}, seed={}",
            run.duration_s, run.frame_dt, run.fixed_dt, run.seed
        );

        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
        let period = Duration::from_secs_f64(run.frame_dt);
        let mut next_deadline = Instant::now() + period;

        let frames = (run.duration_s / run.frame_dt).round() as u64;
        let mut accumulator = 0.0;
        let mut current_phase = None;
        let mut last_status = self.vehicle.current_status();

        for frame in 0..frames {
            let t = frame as f64 * run.frame_dt;

            let phase = self.phase_at(t);
            if phase != current_phase {
                current_phase = phase;
                if let Some(p) = phase.and_then(|i| self.script.get(i)) {
                    info!("t={:.2}s phase {}", t, p.name);
                    outcome.phases.push(p.name);
                    if let Some(mode) = p.position {
                        self.vehicle.set_position_stabilization(mode);
                    }
                    if let Some(kick) = p.kick {
                        self.body.angular_velocity += kick;
                    }
                }
            }
            let input = phase
                .and_then(|i| self.script.get(i))
                .map(|p| p.input)
                .unwrap_or_else(ManualInput::idle);

            let report = self.vehicle.frame(
                run.frame_dt,
                &self.body,
                &mut self.sensor,
                &self.config.field.sources,
                &input,
            );
            outcome.metrics.skipped_corrections += report.skipped as u64;
            if report.status != last_status {
                outcome.metrics.status_changes += 1;
                last_status = report.status;
            }

            accumulator += run.frame_dt;
            while accumulator >= run.fixed_dt {
                self.vehicle.fixed_step(run.fixed_dt, &mut self.body);
                self.body.step(run.fixed_dt);
                accumulator -= run.fixed_dt;
                outcome.metrics.fixed_steps += 1;
            }

            outcome.max_height = outcome.max_height.max(self.body.position.y);
            let row = self.tick_row(t, &report);
            self.record(&mut outcome.metrics, &row);
            on_row(&row);
            push_capped(&mut outcome.rows, row);

            if run.realtime {
                let now = Instant::now();
                if now < next_deadline {
                    sleeper.sleep(next_deadline - now);
                } else {
                    debug!("frame {} late by {:?}", frame, now - next_deadline);
                }
                next_deadline += period;
            }
        }

        if !self.body.position.iter().all(|v| v.is_finite()) {
            warn!("body state diverged: {:?}", self.body.position);
        }
        outcome.final_status = self.vehicle.current_status();
        info!(
            "scenario done: {} frames, {} steps, final status {}, max height {:.1}",
            outcome.metrics.ticks, outcome.metrics.fixed_steps, outcome.final_status, outcome.max_height
        );
        outcome
    }

    fn tick_row(&self, t: f64, report: &FrameReport) -> TickRow {
        let snapshot = self.vehicle.snapshot();
        let take_off = &self.vehicle.layout().take_off;
        let take_off_output = if take_off.is_empty() {
            0.0
        } else {
            take_off
                .iter()
                .filter_map(|id| self.vehicle.bank().thruster(*id))
                .map(|t| t.current_normalized())
                .sum::<f64>()
                / take_off.len() as f64
        };

        TickRow {
            tick: report.tick,
            time_s: t,
            status: report.status,
            driving_mode: report.driving_mode,
            field: format!("{:?}", report.field.kind),
            height: self.body.position().y,
            speed: snapshot.speed(),
            angular_speed: snapshot.angular_speed(),
            tilt_deg: snapshot.tilt_degrees(),
            gear: format!("{:?}", self.vehicle.gear().status()),
            take_off_output,
            torque_correction: report.torque_correction.norm(),
            position_correction: report.position_correction.norm(),
        }
    }

    fn record(&self, m: &mut Metrics, row: &TickRow) {
        m.ticks += 1;
        push_capped(&mut m.speed, row.speed);
        push_capped(&mut m.angular_speed, row.angular_speed);
        push_capped(&mut m.tilt, row.tilt_deg);
        if let Some(altitude) = self.vehicle.snapshot().altitude() {
            push_capped(&mut m.altitude, altitude);
        }
        push_capped(&mut m.status, self.vehicle.status().status_index() as f64);
        push_capped(&mut m.take_off_output, row.take_off_output);
        push_capped(&mut m.torque_correction, row.torque_correction);
        push_capped(&mut m.position_correction, row.position_correction);
    }
}

//! # Vehicle Stabilization Core
//!
//! Closed-loop attitude/position stabilization for a multi-actuator vehicle.
//! Every frame, sensor state (pose, velocity, ground proximity, ambient field) is turned
//! into competing weighted actuator requests which are arbitrated and then applied to an
//! external physics engine on the fixed step.
//!
//! ## Layout
//! - **component_a:** sensing side: sensor snapshot, ambient field receiver, manual input,
//!   status state machine and its notification feed.
//! - **component_b:** actuation side: weighted request aggregator, PID, thrusters, rotators,
//!   paired axis thrusters, torque/position stabilizers, landing gear, automatic mode handling
//!   and the two-pass tick scheduler.
//! - **vehicle:** assembles both sides into one lander with explicit context passing.
//! - **utils:** telemetry (event recorder, bounded traces) and CSV export.
//! - **advanced:** scripted scenario driver and SVG dashboard.

pub mod advanced;
pub mod component_a;
pub mod component_b;
pub mod config;
pub mod physics;
pub mod utils;
pub mod vehicle;

pub use config::SimConfig;
pub use physics::{KinematicBody, PhysicsBody};
pub use vehicle::{FrameReport, ShipLayout, Vehicle};

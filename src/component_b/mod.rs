// Component B: actuation side.
// Weighted request arbitration, PID, thrusters/rotators and their bank, the two
// stabilizers, landing gear, automatic driving mode and the two-pass tick scheduler.
pub mod request;
pub mod pid;
pub mod actuator;
pub mod rotator;
pub mod axis;
pub mod bank;
pub mod landing_gear;
pub mod torque;
pub mod position;
pub mod driving;
pub mod scheduler;

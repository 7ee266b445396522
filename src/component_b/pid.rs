//! pid.rs
//! Single-axis PID controller with a clamped integral term.
//!
//! One instance per control axis; state is only touched by its own `refresh`/`reset`,
//! so identical input sequences always produce bit-identical output.

use serde::{Deserialize, Serialize};

/// Symmetric bound on the accumulated integral (anti-windup).
pub const INTEGRAL_BOUND: f64 = 9999.0;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    gains: PidGains,
    integral_bound: f64,

    proportional: f64,
    integral: f64,
    derivative: f64,
    last_error: f64,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self::with_integral_bound(gains, INTEGRAL_BOUND)
    }

    pub fn with_integral_bound(gains: PidGains, integral_bound: f64) -> Self {
        Self {
            gains,
            integral_bound: integral_bound.abs(),
            proportional: 0.0,
            integral: 0.0,
            derivative: 0.0,
            last_error: 0.0,
        }
    }

    /// Updates the controller and returns the correction for this step.
    ///
    /// `dt` must be > 0. A non-positive or non-finite `dt` leaves the state untouched
    /// and yields no correction, so a paused tick never divides by zero.
    pub fn refresh(&mut self, process_variable: f64, set_point: f64, dt: f64) -> f64 {
        if !(dt > 0.0) || !dt.is_finite() {
            log::trace!("pid refresh skipped, dt={}", dt);
            return 0.0;
        }

        let error = set_point - process_variable;
        self.proportional = error;
        self.integral = (self.integral + error * dt).clamp(-self.integral_bound, self.integral_bound);
        self.derivative = (error - self.last_error) / dt;
        self.last_error = error;

        error * self.gains.kp + self.integral * self.gains.ki + self.derivative * self.gains.kd
    }

    /// Clears the accumulated state; gains are kept.
    pub fn reset(&mut self) {
        self.proportional = 0.0;
        self.integral = 0.0;
        self.derivative = 0.0;
        self.last_error = 0.0;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    #[inline]
    pub fn proportional(&self) -> f64 {
        self.proportional
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    #[inline]
    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    /// True when no error has been accumulated since construction or the last reset.
    pub fn is_reset(&self) -> bool {
        self.integral == 0.0 && self.last_error == 0.0
    }
}

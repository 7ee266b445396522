//! status.rs
//! Discrete operating status derived every tick from the sensor snapshot.
//!
//! Each vehicle profile supplies an ordered status vocabulary and a priority-ordered list
//! of predicates; the first predicate that matches wins, and when none does the first
//! listed status is used. Two things hold for every profile:
//! - `Off` overrides everything while the vehicle is switched off.
//! - exactly one status is active at a time.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::component_a::{
    sensor::SensorSnapshot,
    status_feed::{StatusChange, StatusFeed},
};
use crate::component_b::landing_gear::GearStatus;
use crate::utils::metrics::Event;

pub const OFF_STATUS: &str = "Off";

pub const MANUAL_MODE: &str = "Manual";
pub const AUTOMATIC_MODE: &str = "Automatic";

pub const LANDED: &str = "Landed";
pub const UNDER_GRAVITY: &str = "UnderGravity";
pub const IN_SPACE: &str = "InSpace";

pub const CRUISING: &str = "Cruising";
pub const GROUNDED: &str = "Grounded";
pub const HOVERING: &str = "Hovering";

/// Thresholds used by the status predicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub landed_max_speed: f64,
    pub landed_max_angular_speed: f64,
    /// Altimeter distance under which a probe counts as hovering.
    pub hover_max_distance: f64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            landed_max_speed: 0.05,
            landed_max_angular_speed: 0.05,
            hover_max_distance: 4.0,
        }
    }
}

pub type Predicate = fn(&SensorSnapshot, &StatusConfig) -> bool;

#[derive(Clone, Copy)]
pub struct StatusRule {
    pub status: &'static str,
    pub predicate: Predicate,
}

/// Status vocabulary and predicate cascade of one vehicle type.
pub trait VehicleProfile: Send {
    fn name(&self) -> &str;

    /// Ordered statuses, `Off` excluded. The first one is the fallback.
    fn statuses(&self) -> &'static [&'static str];

    /// Rules in priority order.
    fn rules(&self) -> &'static [StatusRule];

    fn driving_modes(&self) -> &'static [&'static str] {
        &[MANUAL_MODE, AUTOMATIC_MODE]
    }
}

fn is_landed(s: &SensorSnapshot, c: &StatusConfig) -> bool {
    s.gear == GearStatus::Out
        && s.is_grounded()
        && s.speed() < c.landed_max_speed
        && s.angular_speed() < c.landed_max_angular_speed
}

fn has_gravity(s: &SensorSnapshot, _: &StatusConfig) -> bool {
    s.field.has_gravity()
}

fn no_gravity(s: &SensorSnapshot, _: &StatusConfig) -> bool {
    s.field.gravity.norm_squared() == 0.0
}

static LANDER_RULES: [StatusRule; 3] = [
    StatusRule { status: LANDED, predicate: is_landed },
    StatusRule { status: UNDER_GRAVITY, predicate: has_gravity },
    StatusRule { status: IN_SPACE, predicate: no_gravity },
];

/// Gear-equipped lander: resting, flying in a field, or drifting in space.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanderProfile;

impl VehicleProfile for LanderProfile {
    fn name(&self) -> &str {
        "lander"
    }

    fn statuses(&self) -> &'static [&'static str] {
        &[LANDED, UNDER_GRAVITY, IN_SPACE]
    }

    fn rules(&self) -> &'static [StatusRule] {
        &LANDER_RULES
    }
}

fn touches_ground(s: &SensorSnapshot, _: &StatusConfig) -> bool {
    s.is_grounded()
}

fn near_ground(s: &SensorSnapshot, c: &StatusConfig) -> bool {
    s.ground.is_some_and(|g| g.distance <= c.hover_max_distance)
}

static PROBE_RULES: [StatusRule; 2] = [
    StatusRule { status: GROUNDED, predicate: touches_ground },
    StatusRule { status: HOVERING, predicate: near_ground },
];

/// Gearless survey probe; anything not near the ground is cruising.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeProfile;

impl VehicleProfile for ProbeProfile {
    fn name(&self) -> &str {
        "probe"
    }

    fn statuses(&self) -> &'static [&'static str] {
        &[CRUISING, GROUNDED, HOVERING]
    }

    fn rules(&self) -> &'static [StatusRule] {
        &PROBE_RULES
    }

    fn driving_modes(&self) -> &'static [&'static str] {
        &[MANUAL_MODE]
    }
}

pub struct StatusMachine {
    profile: Box<dyn VehicleProfile>,
    config: StatusConfig,
    is_on: bool,
    current: &'static str,
    driving_mode: &'static str,
    feed: Option<StatusFeed>,
    tick: u64,
}

impl StatusMachine {
    pub fn new(profile: Box<dyn VehicleProfile>, config: StatusConfig) -> Self {
        Self {
            profile,
            config,
            is_on: false,
            current: OFF_STATUS,
            driving_mode: MANUAL_MODE,
            feed: None,
            tick: 0,
        }
    }

    pub fn with_feed(mut self, feed: StatusFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn profile(&self) -> &dyn VehicleProfile {
        self.profile.as_ref()
    }

    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Switching off forces `Off` immediately; switching on waits for the next refresh.
    pub fn set_on(&mut self, on: bool) {
        if on == self.is_on {
            return;
        }
        info!("[{}] vehicle switched {}", self.profile.name(), if on { "on" } else { "off" });
        self.is_on = on;
        if !on {
            self.transition(OFF_STATUS);
        }
    }

    pub fn current_status(&self) -> &'static str {
        self.current
    }

    /// Position in `[Off, statuses...]`.
    pub fn status_index(&self) -> usize {
        if self.current == OFF_STATUS {
            return 0;
        }
        self.profile
            .statuses()
            .iter()
            .position(|s| *s == self.current)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Predicate cascade alone, ignoring `is_on`.
    pub fn evaluate(&self, snapshot: &SensorSnapshot) -> &'static str {
        self.profile
            .rules()
            .iter()
            .find(|rule| (rule.predicate)(snapshot, &self.config))
            .map(|rule| rule.status)
            .or_else(|| self.profile.statuses().first().copied())
            .unwrap_or(OFF_STATUS)
    }

    /// Recomputes the status for this tick and notifies on change.
    pub fn refresh(&mut self, snapshot: &SensorSnapshot) -> &'static str {
        self.tick = snapshot.tick;
        let next = if self.is_on { self.evaluate(snapshot) } else { OFF_STATUS };
        self.transition(next);
        self.current
    }

    /// Forces a status from the vocabulary; unknown names are rejected.
    pub fn set_status(&mut self, status: &str) -> bool {
        let known = std::iter::once(OFF_STATUS)
            .chain(self.profile.statuses().iter().copied())
            .find(|s| *s == status);
        match known {
            Some(s) if s == OFF_STATUS || self.is_on => {
                self.transition(s);
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, next: &'static str) {
        if next == self.current {
            return;
        }
        let change = StatusChange {
            tick: self.tick,
            previous: self.current,
            current: next,
        };
        debug!("[{}] status {} -> {}", self.profile.name(), change.previous, change.current);
        self.current = next;
        if let Some(feed) = &self.feed {
            feed.emit(change);
        }
    }

    pub fn driving_modes(&self) -> &'static [&'static str] {
        self.profile.driving_modes()
    }

    pub fn current_driving_mode(&self) -> &'static str {
        self.driving_mode
    }

    pub fn is_automatic(&self) -> bool {
        self.driving_mode == AUTOMATIC_MODE
    }

    /// Selects a driving mode offered by the profile.
    pub fn set_driving_mode(&mut self, mode: &str) -> bool {
        let Some(found) = self.profile.driving_modes().iter().copied().find(|m| *m == mode) else {
            return false;
        };
        if found != self.driving_mode {
            debug!("[{}] driving mode {} -> {}", self.profile.name(), self.driving_mode, found);
            self.driving_mode = found;
            if let Some(feed) = &self.feed {
                feed.recorder().record(Event::ModeChanged {
                    tick: self.tick,
                    mode: found.to_string(),
                });
            }
        }
        true
    }
}

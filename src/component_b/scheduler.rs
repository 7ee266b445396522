//! scheduler.rs
//! Two-pass tick: every source queues its requests first, then the bank resolves once.
//!
//! Decide pass: controllers and manual input push closures tagged with their source.
//! Commit pass: the closures run against the bank, then every actuator resolves.
//! No actuator can resolve before all of this tick's requests are in, whatever order the
//! sources ran in.

use crate::component_b::bank::ActuatorBank;

/// A deferred request; returns false if its target actuator was missing.
pub type Submission = Box<dyn FnOnce(&mut ActuatorBank) -> bool + Send>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub submitted: usize,
    /// Sources whose request had no actuator to land on.
    pub skipped: Vec<&'static str>,
}

#[derive(Default)]
pub struct TickScheduler {
    queue: Vec<(&'static str, Submission)>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit<F>(&mut self, source: &'static str, request: F)
    where
        F: FnOnce(&mut ActuatorBank) -> bool + Send + 'static,
    {
        self.queue.push((source, Box::new(request)));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drops everything queued this tick (vehicle switched off mid-frame).
    pub fn discard(&mut self) {
        self.queue.clear();
    }

    /// Runs the queued submissions, then resolves every actuator exactly once.
    pub fn commit(&mut self, bank: &mut ActuatorBank) -> CommitReport {
        let mut report = CommitReport::default();
        for (source, request) in self.queue.drain(..) {
            report.submitted += 1;
            if !request(bank) {
                report.skipped.push(source);
            }
        }
        bank.resolve_all();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_b::actuator::{Actuator, ForceKind, ThrusterSpec};
    use crate::component_b::bank::ThrusterId;
    use nalgebra::Vector3;

    fn bank() -> (ActuatorBank, ThrusterId) {
        let mut bank = ActuatorBank::new();
        let id = bank.add_thruster(ThrusterSpec::new("main", ForceKind::Force, Vector3::y(), 1.0));
        bank.set_on(true);
        (bank, id)
    }

    #[test]
    fn nothing_resolves_before_commit() {
        let (mut bank, id) = bank();
        let mut scheduler = TickScheduler::new();
        scheduler.submit("manual", move |b| b.request_force(id, 0.2, 1.0));
        scheduler.submit("auto", move |b| b.request_force(id, 0.8, 3.0));

        assert_eq!(scheduler.pending(), 2);
        assert_eq!(bank.thruster(id).map(|t| t.requested_normalized()), Some(0.0));

        let report = scheduler.commit(&mut bank);
        assert_eq!(report.submitted, 2);
        assert!(report.skipped.is_empty());
        let requested = bank.thruster(id).map(|t| t.requested_normalized()).unwrap_or(0.0);
        assert!((requested - 0.65).abs() < 1e-12);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn missing_targets_are_reported() {
        let (mut bank, _) = bank();
        let mut scheduler = TickScheduler::new();
        scheduler.submit("torque", |b| b.request_force(ThrusterId(42), 1.0, 1.0));
        assert_eq!(scheduler.commit(&mut bank).skipped, vec!["torque"]);
    }

    #[test]
    fn discarded_requests_never_land() {
        let (mut bank, id) = bank();
        let mut scheduler = TickScheduler::new();
        scheduler.submit("manual", move |b| b.request_force(id, 1.0, 1.0));
        scheduler.discard();
        scheduler.commit(&mut bank);
        assert_eq!(bank.thruster(id).map(|t| t.requested_normalized()), Some(0.0));
    }
}

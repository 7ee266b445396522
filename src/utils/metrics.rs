//! metrics.rs
//! Telemetry for the stabilization loop.
//!
//! Two independent paths:
//! - **EventRecorder:** lock-free bounded queue (16K) of discrete events (status changes,
//!   mode switches, skipped corrections), drained into a CSV after the run.
//! - **Metrics:** bounded per-tick traces (1000 points each) plus counters, for the
//!   summary export and the dashboard.

use std::{
    collections::VecDeque,
    sync::{Arc, atomic::{AtomicU64, Ordering}},
};
use crossbeam_queue::ArrayQueue;

/// Discrete things that happened during a run, stamped with the frame tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Status machine settled on a new status.
    StatusChanged {
        tick: u64,
        from: String,
        to: String,
    },
    /// Driving mode switched (manual/automatic).
    ModeChanged {
        tick: u64,
        mode: String,
    },
    /// A stabilizer group switched its stabilization type.
    StabilizationChanged {
        tick: u64,
        group: &'static str,
        mode: String,
    },
    /// A stabilizer submitted a correction this tick.
    CorrectionApplied {
        tick: u64,
        controller: &'static str,
        magnitude: f64,
    },
    /// A stabilizer produced a correction that had nowhere to go.
    CorrectionSkipped {
        tick: u64,
        controller: &'static str,
        reason: &'static str,
    },
    /// A thruster's resolved request switched between idle and active.
    ActuatorResolved {
        tick: u64,
        actuator: String,
        requested: f64,
    },
}

impl Event {
    pub const CSV_HEADER: &'static str = "tick,component,event,field1,field2";

    pub fn tick(&self) -> u64 {
        match self {
            Event::StatusChanged { tick, .. }
            | Event::ModeChanged { tick, .. }
            | Event::StabilizationChanged { tick, .. }
            | Event::CorrectionApplied { tick, .. }
            | Event::CorrectionSkipped { tick, .. }
            | Event::ActuatorResolved { tick, .. } => *tick,
        }
    }

    /// CSV row matching `CSV_HEADER`.
    pub fn to_csv_row(&self) -> String {
        match self {
            Event::StatusChanged { tick, from, to } => {
                format!("{},status,StatusChanged,{},{}", tick, from, to)
            }
            Event::ModeChanged { tick, mode } => {
                format!("{},status,ModeChanged,{},", tick, mode)
            }
            Event::StabilizationChanged { tick, group, mode } => {
                format!("{},stabilizer,StabilizationChanged,{},{}", tick, group, mode)
            }
            Event::CorrectionApplied { tick, controller, magnitude } => {
                format!("{},stabilizer,CorrectionApplied,{},{:.6}", tick, controller, magnitude)
            }
            Event::CorrectionSkipped { tick, controller, reason } => {
                format!("{},stabilizer,CorrectionSkipped,{},{}", tick, controller, reason)
            }
            Event::ActuatorResolved { tick, actuator, requested } => {
                format!("{},actuator,ActuatorResolved,{},{:.6}", tick, actuator, requested)
            }
        }
    }
}

const EVENT_QUEUE_CAPACITY: usize = 16_384;

/// Non-blocking event sink shared by every component of a vehicle.
///
/// `record()` never blocks the tick; when the queue is full the event is dropped and counted.
#[derive(Debug)]
pub struct EventRecorder {
    queue: ArrayQueue<Event>,
    dropped: AtomicU64,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    #[inline]
    pub fn record(&self, event: Event) {
        if self.queue.push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Pops everything recorded so far, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            out.push(event);
        }
        out
    }
}

pub const MAX_POINTS: usize = 1_000;

/// Per-tick traces, bounded to the most recent `MAX_POINTS` samples each.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub speed: VecDeque<f64>,
    pub angular_speed: VecDeque<f64>,
    /// Degrees between body up and field up.
    pub tilt: VecDeque<f64>,
    /// Altimeter reading; NaN-free, ticks without ground are skipped.
    pub altitude: VecDeque<f64>,
    /// Index of the current status in the vehicle's vocabulary.
    pub status: VecDeque<f64>,

    pub take_off_output: VecDeque<f64>,
    pub torque_correction: VecDeque<f64>,
    pub position_correction: VecDeque<f64>,

    pub ticks: u64,
    pub fixed_steps: u64,
    pub skipped_corrections: u64,
    pub status_changes: u64,
}

/// Appends value to a trace; drops the oldest at capacity.
#[inline]
pub fn push_capped<T>(buf: &mut VecDeque<T>, val: T) {
    if buf.len() >= MAX_POINTS {
        buf.pop_front();
    }
    buf.push_back(val);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

pub fn calculate_stats(data: &VecDeque<f64>) -> Option<Stats> {
    if data.is_empty() {
        return None;
    }

    let count = data.len();
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().sum::<f64>() / count as f64;

    Some(Stats { min, max, mean, count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_capped_keeps_most_recent() {
        let mut buf = VecDeque::new();
        for i in 0..(MAX_POINTS + 10) {
            push_capped(&mut buf, i as f64);
        }
        assert_eq!(buf.len(), MAX_POINTS);
        assert_eq!(buf.front(), Some(&10.0));
    }

    #[test]
    fn stats_of_trace() {
        let buf: VecDeque<f64> = [1.0, 3.0, 2.0].into_iter().collect();
        let s = calculate_stats(&buf).unwrap();
        assert_eq!((s.min, s.max, s.mean, s.count), (1.0, 3.0, 2.0, 3));
        assert!(calculate_stats(&VecDeque::new()).is_none());
    }

    #[test]
    fn full_recorder_drops_and_counts() {
        let rec = EventRecorder::with_capacity(2);
        for tick in 0..5 {
            rec.record(Event::ModeChanged { tick, mode: "Manual".into() });
        }
        assert_eq!(rec.dropped(), 3);

        let events = rec.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick(), 0);
        assert!(rec.is_empty());
    }

    #[test]
    fn csv_rows_have_five_fields() {
        let e = Event::CorrectionSkipped { tick: 4, controller: "torque", reason: "no_actuator" };
        assert_eq!(e.to_csv_row(), "4,stabilizer,CorrectionSkipped,torque,no_actuator");
        assert_eq!(e.to_csv_row().split(',').count(), Event::CSV_HEADER.split(',').count());
    }
}

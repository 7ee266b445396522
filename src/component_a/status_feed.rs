//! status_feed.rs
//! Status change notifications: status machine → automatic-mode handler.
//!
//! Bounded channel with non-blocking `try_send`, so a slow or absent consumer can never
//! stall the tick. Every change is also recorded as a telemetry event.

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;

use crate::utils::metrics::{Event, EventRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub tick: u64,
    pub previous: &'static str,
    pub current: &'static str,
}

#[derive(Clone)]
pub struct StatusFeed {
    tx: Sender<StatusChange>,
    event_recorder: Arc<EventRecorder>,
}

impl StatusFeed {
    pub fn new(capacity: usize, event_recorder: Arc<EventRecorder>) -> (Self, Receiver<StatusChange>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx, event_recorder }, rx)
    }

    pub fn recorder(&self) -> &Arc<EventRecorder> {
        &self.event_recorder
    }

    /// Publishes a change; returns false if the consumer could not take it.
    pub fn emit(&self, change: StatusChange) -> bool {
        self.event_recorder.record(Event::StatusChanged {
            tick: change.tick,
            from: change.previous.to_string(),
            to: change.current.to_string(),
        });

        match self.tx.try_send(change) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("status feed full, dropped {} -> {}", change.previous, change.current);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("status feed has no consumer");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(tick: u64) -> StatusChange {
        StatusChange { tick, previous: "Off", current: "Landed" }
    }

    #[test]
    fn emits_and_records() {
        let recorder = Arc::new(EventRecorder::new());
        let (feed, rx) = StatusFeed::new(4, recorder.clone());

        assert!(feed.emit(change(1)));
        assert_eq!(rx.try_recv().ok(), Some(change(1)));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn full_feed_does_not_block() {
        let recorder = Arc::new(EventRecorder::new());
        let (feed, _rx) = StatusFeed::new(1, recorder.clone());

        assert!(feed.emit(change(1)));
        assert!(!feed.emit(change(2)));
        // Telemetry still sees both.
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn dropped_consumer_is_tolerated() {
        let (feed, rx) = StatusFeed::new(1, Arc::new(EventRecorder::new()));
        drop(rx);
        assert!(!feed.emit(change(3)));
    }
}

// Component A: sensing side.
// Per-tick sensor snapshot, ambient field receiver and sources, manual input,
// status state machine and the status change feed.

pub mod sensor;
pub mod ambient;
pub mod input;
pub mod status;
pub mod status_feed;

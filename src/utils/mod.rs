// Utilities: event recorder, bounded traces and run export.
pub mod metrics;
pub mod export;

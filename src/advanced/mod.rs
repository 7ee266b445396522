// Scenario driver and the end-of-run dashboard.
pub mod scenario;
pub mod dashboard;

//! Run export: per-tick trace, event log and summary statistics.
//!
//! Three files per run, all under the output directory:
//! - `ticks.csv`: one serialized `TickRow` per frame (pose, status, outputs), streamed
//!   through `TickWriter` while the run goes so the full trace is never held in memory.
//! - `events.csv`: recorder events in tick order.
//! - `summary.csv`: `metric,value,description` rows built from the bounded traces.

use crate::utils::metrics::{Event, Metrics, calculate_stats};
use csv::Writer;
use log::info;
use serde::Serialize;
use std::{
    collections::VecDeque,
    error::Error,
    fs::{File, create_dir_all, write},
    io::{BufWriter, Write},
    path::Path,
};

/// One frame as seen from outside the vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRow {
    pub tick: u64,
    pub time_s: f64,
    pub status: &'static str,
    pub driving_mode: &'static str,
    pub field: String,
    pub height: f64,
    pub speed: f64,
    pub angular_speed: f64,
    pub tilt_deg: f64,
    pub gear: String,
    pub take_off_output: f64,
    pub torque_correction: f64,
    pub position_correction: f64,
}

/// Per-frame CSV sink; rows go to disk as they are produced.
pub struct TickWriter {
    wtr: Writer<File>,
    rows: usize,
}

impl TickWriter {
    pub fn create(path: &Path) -> Result<Self, Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        Ok(Self { wtr: Writer::from_path(path)?, rows: 0 })
    }

    pub fn write(&mut self, row: &TickRow) -> Result<(), Box<dyn Error>> {
        self.wtr.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and returns the number of rows written.
    pub fn finish(mut self) -> Result<usize, Box<dyn Error>> {
        self.wtr.flush()?;
        Ok(self.rows)
    }
}

pub fn export_events(path: &Path, events: &[Event]) -> Result<usize, Box<dyn Error>> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "{}", Event::CSV_HEADER)?;
    for event in events {
        writeln!(file, "{}", event.to_csv_row())?;
    }
    file.flush()?;
    Ok(events.len())
}

fn push_stats(csv: &mut String, name: &str, label: &str, data: &VecDeque<f64>) {
    if let Some(stats) = calculate_stats(data) {
        csv.push_str(&format!("{}_min,{:.4},Minimum {}\n", name, stats.min, label));
        csv.push_str(&format!("{}_max,{:.4},Maximum {}\n", name, stats.max, label));
        csv.push_str(&format!("{}_avg,{:.4},Average {}\n", name, stats.mean, label));
        csv.push_str(&format!("{}_samples,{},{} samples\n", name, stats.count, label));
    }
}

/// Aggregated stats over the (bounded) traces plus run counters.
pub fn summary_csv(metrics: &Metrics, dropped_events: u64) -> String {
    let mut csv = String::from("metric,value,description\n");

    csv.push_str(&format!("ticks,{},Frames run\n", metrics.ticks));
    csv.push_str(&format!("fixed_steps,{},Physics steps run\n", metrics.fixed_steps));
    csv.push_str(&format!("status_changes,{},Status transitions\n", metrics.status_changes));
    csv.push_str(&format!("skipped_corrections,{},Corrections with no actuator\n", metrics.skipped_corrections));
    csv.push_str(&format!("dropped_events,{},Events lost to a full recorder\n", dropped_events));

    push_stats(&mut csv, "speed", "speed (m/s)", &metrics.speed);
    push_stats(&mut csv, "angular_speed", "angular speed (rad/s)", &metrics.angular_speed);
    push_stats(&mut csv, "tilt", "tilt (deg)", &metrics.tilt);
    push_stats(&mut csv, "altitude", "altimeter reading (m)", &metrics.altitude);
    push_stats(&mut csv, "take_off", "take-off output", &metrics.take_off_output);
    push_stats(&mut csv, "torque_correction", "torque correction", &metrics.torque_correction);
    push_stats(&mut csv, "position_correction", "position correction", &metrics.position_correction);

    csv
}

/// Writes the end-of-run exports (events and summary) into `dir`.
pub fn run_exports(
    dir: &Path,
    events: &[Event],
    metrics: &Metrics,
    dropped_events: u64,
) -> Result<(), Box<dyn Error>> {
    create_dir_all(dir)?;

    let n = export_events(&dir.join("events.csv"), events)?;
    info!("Exported {} events to {:?}", n, dir.join("events.csv"));

    write(dir.join("summary.csv"), summary_csv(metrics, dropped_events))?;
    info!("Summary exported to {:?}", dir.join("summary.csv"));
    Ok(())
}

//! # Ship Stabilization Simulation Entry Point
//!
//! Runs the scripted lander flight (lift-off, hover hold, disturbance, climb to space)
//! against the stand-in physics body and exports what happened.
//!
//! ## Outputs (under `--output`, default `data/`)
//! - `ticks.csv`: per-frame pose, status and actuator outputs.
//! - `events.csv`: status/mode/stabilization changes, skipped corrections, actuator toggles.
//! - `summary.csv`: aggregated stats over the bounded traces.
//! - `dashboard.svg`: traces of the last frames.

use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use ship_stabilization::{
    SimConfig,
    advanced::{
        dashboard::render_dashboard,
        scenario::{Scenario, ScenarioKind},
    },
    utils::{
        export::{TickWriter, run_exports},
        metrics::EventRecorder,
    },
};

#[derive(Parser, Debug)]
#[command(name = "ship_stabilization")]
#[command(about = "Scripted flight of a stabilized lander with CSV/SVG export")]
struct Cli {
    /// JSON config; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Simulated seconds
    #[arg(long)]
    duration: Option<f64>,
    /// Frame (decide + resolve) step, seconds
    #[arg(long)]
    frame_dt: Option<f64>,
    /// Fixed physics step, seconds
    #[arg(long)]
    fixed_dt: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Scripted scenario to fly
    #[arg(long, value_enum)]
    scenario: Option<CliScenario>,
    /// Output directory
    #[arg(long)]
    output: Option<PathBuf>,
    /// Pace frames against the wall clock
    #[arg(long)]
    realtime: bool,
    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliScenario {
    Flight,
    Hover,
}

impl From<CliScenario> for ScenarioKind {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::Flight => ScenarioKind::Flight,
            CliScenario::Hover => ScenarioKind::Hover,
        }
    }
}

fn build_config(cli: &Cli) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if let Some(d) = cli.duration {
        config.run.duration_s = d;
    }
    if let Some(dt) = cli.frame_dt {
        config.run.frame_dt = dt;
    }
    if let Some(dt) = cli.fixed_dt {
        config.run.fixed_dt = dt;
    }
    if let Some(seed) = cli.seed {
        config.run.seed = seed;
    }
    if let Some(kind) = cli.scenario {
        config.run.scenario = kind.into();
    }
    if let Some(out) = &cli.output {
        config.run.output_dir = out.to_string_lossy().into_owned();
    }
    config.run.realtime |= cli.realtime;

    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize config: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    info!("=== SHIP STABILIZATION SIMULATION ===");
    let output = PathBuf::from(&config.run.output_dir);
    let recorder = Arc::new(EventRecorder::new());
    let running = Arc::new(AtomicBool::new(true));

    // Collector drains the recorder while the run is going so bursts never fill the queue.
    let collector = {
        let recorder = recorder.clone();
        let running = running.clone();
        thread::spawn(move || {
            let mut events = Vec::new();
            while running.load(Ordering::Acquire) {
                events.extend(recorder.drain());
                thread::sleep(Duration::from_millis(1));
            }
            events.extend(recorder.drain());
            events
        })
    };

    let ticks_path = output.join("ticks.csv");
    let mut ticks = match TickWriter::create(&ticks_path) {
        Ok(w) => Some(w),
        Err(e) => {
            error!("Failed to open {:?}: {}", ticks_path, e);
            None
        }
    };

    let mut scenario = Scenario::new(config, recorder.clone());
    let outcome = scenario.run_with(|row| {
        if let Some(writer) = ticks.as_mut() {
            if let Err(e) = writer.write(row) {
                error!("Failed to write tick {}: {}", row.tick, e);
                ticks = None;
            }
        }
    });
    running.store(false, Ordering::Release);

    let mut events = match collector.join() {
        Ok(events) => events,
        Err(_) => {
            error!("Event collector panicked");
            recorder.drain()
        }
    };
    events.sort_by_key(|e| e.tick());
    if recorder.dropped() > 0 {
        warn!("{} events dropped (recorder full)", recorder.dropped());
    }

    let mut status = ExitCode::SUCCESS;
    match ticks.map(TickWriter::finish) {
        Some(Ok(n)) => info!("Exported {} tick rows to {:?}", n, ticks_path),
        Some(Err(e)) => {
            error!("Failed to flush {:?}: {}", ticks_path, e);
            status = ExitCode::FAILURE;
        }
        None => status = ExitCode::FAILURE,
    }
    if let Err(e) = run_exports(&output, &events, &outcome.metrics, recorder.dropped()) {
        error!("Failed to export run: {}", e);
        status = ExitCode::FAILURE;
    }
    match render_dashboard(&output.join("dashboard.svg"), &outcome.metrics, outcome.final_status) {
        Ok(()) => info!("Dashboard written to {:?}", output.join("dashboard.svg")),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            status = ExitCode::FAILURE;
        }
    }

    info!(
        "=== FINISHED: {} frames, final status {}, max height {:.1} m ===",
        outcome.metrics.ticks, outcome.final_status, outcome.max_height
    );
    status
}

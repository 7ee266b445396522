//! Run dashboard: one SVG with the bounded traces in a 3x3 grid plus a status line.
//!
//! Rendered once at the end of a run (not live); the traces are the last `MAX_POINTS`
//! frames of each series.

use plotters::{coord::Shift, prelude::*};

use std::{collections::VecDeque, error::Error, path::Path};

use crate::utils::metrics::{MAX_POINTS, Metrics};

/// Renders the dashboard to `path`.
pub fn render_dashboard(path: &Path, metrics: &Metrics, final_status: &str) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, (1280, 950)).into_drawing_area();
    root.fill(&WHITE)?;

    let (plot_area, status_area) = root.split_vertically(850);
    let areas = plot_area.split_evenly((3, 3));

    let series: [(&str, &VecDeque<f64>); 8] = [
        ("Speed (m/s)", &metrics.speed),
        ("Angular speed (rad/s)", &metrics.angular_speed),
        ("Tilt (deg)", &metrics.tilt),
        ("Altimeter (m)", &metrics.altitude),
        ("Status index", &metrics.status),
        ("Take-off output", &metrics.take_off_output),
        ("Torque correction", &metrics.torque_correction),
        ("Position correction", &metrics.position_correction),
    ];
    for (area, (title, data)) in areas.iter().zip(series.iter()) {
        plot_series(area, title, data)?;
    }

    let status_font = ("sans-serif", 18).into_font().color(&BLACK);
    let status_text = format!(
        "Final status: {} | Frames: {} | Steps: {} | Status changes: {} | Skipped corrections: {}",
        final_status, metrics.ticks, metrics.fixed_steps, metrics.status_changes, metrics.skipped_corrections
    );
    status_area.draw(&Text::new(status_text, (40, 30), status_font))?;

    root.present()?;
    Ok(())
}

fn plot_series(area: &DrawingArea<SVGBackend, Shift>, title: &str, data: &VecDeque<f64>) -> Result<(), Box<dyn Error>> {
    let (min_y, max_y) = if data.is_empty() { (0.0, 1.0) } else {
        let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max.max(min + 1e-6))
    };

    let mut chart = ChartBuilder::on(area).caption(title, ("sans-serif", 18)).margin(10)
        .x_label_area_size(20).y_label_area_size(40)
        .build_cartesian_2d(0..MAX_POINTS, min_y..max_y)?;
    chart.configure_mesh().disable_mesh().draw()?;
    chart.draw_series(LineSeries::new(data.iter().enumerate().map(|(i, v)| (i, *v)), &BLUE))?;
    Ok(())
}

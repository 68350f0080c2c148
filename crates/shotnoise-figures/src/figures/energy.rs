//! Energy time series from stored arrays
//!
//! Event statistics of the kinetic (`K`) and potential (`U`) energy series
//! and the power spectrum of the potential energy.

use std::path::Path;

use anyhow::{ensure, Context};
use shotnoise::io::{drop_warmup, head, read_npy};
use shotnoise::{
    conditional_average, stats, welch, ConditionalAverage, ConditionalConfig, WelchConfig,
};

use super::{spectrum_points, FigureFile, FigureOutput};
use crate::config::FiguresConfig;
use crate::plot::{ChartSpec, Panel, Series};

pub const KINETIC: &str = "K.npy";
pub const POTENTIAL: &str = "U.npy";
pub const TIME: &str = "K_time.npy";
pub const POTENTIAL_LONG: &str = "U_4e5.npy";
pub const TIME_LONG: &str = "K_time_4e5.npy";

pub const SPECTRUM_FILE: &str = "S_U_semilogy_4e5.png";
const MAX_FREQUENCY: f64 = 200.0;
const MIN_POWER: f64 = 1e-6;

fn load(data_dir: &Path, name: &str) -> anyhow::Result<Vec<f64>> {
    let path = data_dir.join(name);
    read_npy(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn scatter_file(
    file_name: String,
    x_label: &str,
    y_label: &str,
    points: Vec<(f64, f64)>,
) -> FigureFile {
    let series = vec![Series::scatter("events", points)];
    let spec = ChartSpec::new(&file_name, x_label, y_label)
        .fit_x(&series)
        .fit_y(&series);
    FigureFile::new(&file_name, vec![Panel::new(spec, series)])
}

fn event_files(tag: &str, events: &ConditionalAverage) -> [FigureFile; 2] {
    [
        scatter_file(format!("A_A+1_{tag}.png"), "A_n", "A_n+1", events.successive_peaks()),
        scatter_file(format!("A_tau_{tag}.png"), "A_n", "tau_w", events.peak_waiting_pairs()),
    ]
}

/// Conditional-average events of `K` and `U` after the warm-up is dropped.
pub fn build_events(cfg: &FiguresConfig, data_dir: &Path) -> anyhow::Result<FigureOutput> {
    let section = &cfg.energy;
    let mut kinetic = load(data_dir, KINETIC)?;
    let mut potential = load(data_dir, POTENTIAL)?;
    let mut time = load(data_dir, TIME)?;
    ensure!(
        kinetic.len() == time.len() && potential.len() == time.len(),
        "energy series lengths differ: K {}, U {}, time {}",
        kinetic.len(),
        potential.len(),
        time.len()
    );

    drop_warmup(&mut kinetic, section.warmup);
    drop_warmup(&mut potential, section.warmup);
    drop_warmup(&mut time, section.warmup);
    ensure!(
        time.len() >= 2,
        "fewer than two samples left after dropping {} warm-up samples",
        section.warmup
    );

    let mut output = FigureOutput::default();
    for (tag, series, threshold) in [
        ("K", &kinetic, section.kinetic_threshold),
        ("U", &potential, section.potential_threshold),
    ] {
        let config = ConditionalConfig {
            threshold,
            window: section.window,
            delta: section.delta,
        };
        let events = conditional_average(&stats::standardized(series), &time, &config)?;
        tracing::info!(series = tag, events = events.events, threshold, "conditional average");

        output.metric(format!("{tag}: events"), events.events as f64);
        if !events.peaks.is_empty() {
            output.metric(format!("{tag}: mean peak"), stats::mean(&events.peaks));
            output.metric(
                format!("{tag}: mean waiting time"),
                stats::mean(&events.waiting_times[1..]),
            );
        }
        output.files.extend(event_files(tag, &events));
    }
    Ok(output)
}

/// Welch spectrum of the leading samples of the long `U` record.
pub fn build_spectrum(cfg: &FiguresConfig, data_dir: &Path) -> anyhow::Result<FigureOutput> {
    let section = &cfg.energy;
    let potential = load(data_dir, POTENTIAL_LONG)?;
    let time = load(data_dir, TIME_LONG)?;
    let potential = head(&potential, section.spectrum_samples);
    let time = head(&time, section.spectrum_samples);
    ensure!(time.len() >= 2, "{TIME_LONG} needs at least two samples");
    ensure!(
        potential.len() == time.len(),
        "{POTENTIAL_LONG} has {} samples, {TIME_LONG} has {}",
        potential.len(),
        time.len()
    );

    let dt = time[1] - time[0];
    ensure!(dt > 0.0, "time axis must be increasing, got dt = {dt}");

    let standardized = stats::standardized(potential);
    let estimate = welch(
        &standardized,
        1.0 / dt,
        &WelchConfig::with_divisions(standardized.len(), section.spectrum_divisions),
    );

    let mut output = FigureOutput::default();
    output.metric("samples", standardized.len() as f64);
    output.metric("segments", estimate.segments as f64);
    output.metric("resolution", estimate.resolution);

    let peak = estimate.power.iter().copied().fold(0.0, f64::max);
    let top = if peak > MIN_POWER { 2.0 * peak } else { 1.0 };
    let spec = ChartSpec::new("Potential energy spectrum", "f", "S_U(f)")
        .x_range(0.0..MAX_FREQUENCY)
        .log_y(MIN_POWER..top);
    output.files.push(FigureFile::new(
        SPECTRUM_FILE,
        vec![Panel::new(spec, vec![Series::line("U", spectrum_points(&estimate))])],
    ));
    Ok(output)
}

//! Figure builders
//!
//! Each figure computes its curves first ([`FigureOutput`]) and only then
//! renders them, so the numerical part can be exercised without a plotting
//! backend.

pub mod amplitudes;
pub mod energy;
pub mod gamma_wait;
pub mod periodic_limit;

use std::path::Path;

use anyhow::Context;
use shotnoise::forcing::{Forcing, ForcingGenerator};
use shotnoise::{
    seeded_rng, Correlation, PointModel, PulseShape, Realization, RealizationBuilder,
    SpectralEstimate, TimeGrid,
};

use crate::config::FiguresConfig;
use crate::output::{write_curves_csv, RunSummary};
use crate::plot::{render_panels, Panel, Series};

/// One image file and the panels drawn into it
#[derive(Debug, Clone)]
pub struct FigureFile {
    pub file_name: String,
    pub panels: Vec<Panel>,
}

impl FigureFile {
    pub fn new(file_name: &str, panels: Vec<Panel>) -> Self {
        Self {
            file_name: file_name.to_string(),
            panels,
        }
    }

    /// All series, prefixed with the panel title when there are several panels.
    pub fn flattened_series(&self) -> Vec<Series> {
        let prefix = self.panels.len() > 1;
        self.panels
            .iter()
            .flat_map(|panel| {
                panel.series.iter().map(move |s| {
                    let mut s = s.clone();
                    if prefix {
                        s.label = format!("{}: {}", panel.spec.title, s.label);
                    }
                    s
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FigureOutput {
    pub files: Vec<FigureFile>,
    pub metrics: Vec<(String, f64)>,
}

impl FigureOutput {
    pub fn metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.push((name.into(), value));
    }
}

/// Render every file of `output` into `run_dir`, with a CSV of the plotted
/// data next to each image.
pub fn write_figure(
    run_dir: &Path,
    output: &FigureOutput,
    summary: &mut RunSummary,
) -> anyhow::Result<()> {
    for file in &output.files {
        let image = run_dir.join(&file.file_name);
        render_panels(&image, &file.panels)
            .with_context(|| format!("failed to render {}", image.display()))?;
        summary.record_output(&image);

        let csv = image.with_extension("csv");
        write_curves_csv(&csv, &file.flattened_series())?;
        summary.record_output(&csv);
        tracing::info!(path = %image.display(), "wrote figure");
    }
    for (name, value) in &output.metrics {
        summary.metric(name.clone(), *value);
    }
    Ok(())
}

/// Lorentz-pulse model on the configured grid.
pub(crate) fn point_model(
    cfg: &FiguresConfig,
    generator: ForcingGenerator,
) -> anyhow::Result<PointModel> {
    let sim = &cfg.simulation;
    let grid = TimeGrid::new(sim.duration, sim.dt)?;
    Ok(PointModel::new(grid, cfg.rate())
        .with_generator(generator)
        .with_builder(RealizationBuilder::new(PulseShape::Lorentz).with_tolerance(sim.tolerance)))
}

/// Realization number `stream` of `model`, seeded from the configured seed.
pub(crate) fn simulate(
    cfg: &FiguresConfig,
    model: &PointModel,
    stream: u64,
) -> anyhow::Result<(Realization, Forcing)> {
    let mut rng = seeded_rng(cfg.simulation.seed.wrapping_add(stream));
    let (signal, forcing) = model.make_realization(&mut rng)?;
    tracing::info!(
        stream,
        pulses = forcing.len(),
        samples = signal.len(),
        "simulated realization"
    );
    Ok((signal, forcing))
}

pub(crate) fn spectrum_points(estimate: &SpectralEstimate) -> Vec<(f64, f64)> {
    estimate
        .frequencies
        .iter()
        .copied()
        .zip(estimate.power.iter().copied())
        .collect()
}

/// Non-negative lags below `max_lag`.
pub(crate) fn correlation_points(corr: &Correlation, max_lag: f64) -> Vec<(f64, f64)> {
    corr.lags
        .iter()
        .copied()
        .zip(corr.values.iter().copied())
        .filter(|&(lag, _)| lag >= 0.0 && lag < max_lag)
        .collect()
}

/// `count` evenly spaced points on `[0, max_lag]`.
pub(crate) fn lag_axis(max_lag: f64, count: usize) -> Vec<f64> {
    let step = max_lag / (count.max(2) - 1) as f64;
    (0..count.max(2)).map(|i| i as f64 * step).collect()
}

pub mod config;
pub mod figures;
pub mod output;
pub mod plot;

use std::path::{Path, PathBuf};

use crate::config::FiguresConfig;
use crate::figures::{amplitudes, energy, gamma_wait, periodic_limit, write_figure};
use crate::output::{create_timestamped_run_dir, write_summary, RunSummary};

pub const SUMMARY_FILE: &str = "summary.json";

/// Figures the binary knows how to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    GammaWait,
    Amplitudes,
    PeriodicLimit,
    EnergyEvents { data_dir: PathBuf },
    EnergySpectrum { data_dir: PathBuf },
}

impl Figure {
    pub fn name(&self) -> &'static str {
        match self {
            Figure::GammaWait => "gamma-wait",
            Figure::Amplitudes => "amplitudes",
            Figure::PeriodicLimit => "periodic-limit",
            Figure::EnergyEvents { .. } => "energy-events",
            Figure::EnergySpectrum { .. } => "energy-spectrum",
        }
    }
}

/// Build `figure` and write its images, curve CSVs and `summary.json` into
/// a fresh run directory under `output_base`.
pub fn run_figure(
    figure: &Figure,
    cfg: &FiguresConfig,
    output_base: &Path,
) -> anyhow::Result<(PathBuf, RunSummary)> {
    cfg.validate()?;
    tracing::info!(figure = figure.name(), "building figure");

    let output = match figure {
        Figure::GammaWait => gamma_wait::build(cfg)?,
        Figure::Amplitudes => amplitudes::build(cfg)?,
        Figure::PeriodicLimit => periodic_limit::build(cfg)?,
        Figure::EnergyEvents { data_dir } => energy::build_events(cfg, data_dir)?,
        Figure::EnergySpectrum { data_dir } => energy::build_spectrum(cfg, data_dir)?,
    };

    let run_dir = create_timestamped_run_dir(output_base)?;
    let mut summary = RunSummary::new(figure.name(), cfg);
    write_figure(&run_dir, &output, &mut summary)?;

    let summary_path = run_dir.join(SUMMARY_FILE);
    write_summary(&summary_path, &summary)?;
    summary.record_output(&summary_path);
    Ok((run_dir, summary))
}

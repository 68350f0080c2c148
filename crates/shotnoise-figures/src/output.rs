use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;

use crate::config::FiguresConfig;
use crate::plot::Series;

/// One plotted point, tagged with its curve.
#[derive(Debug, Clone, Serialize)]
pub struct CurveRow<'a> {
    pub series: &'a str,
    pub x: f64,
    pub y: f64,
}

/// Manifest written next to the figures of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub figure: String,
    pub created_utc: String,
    pub config: FiguresConfig,
    pub outputs: Vec<PathBuf>,
    /// Scalar diagnostics (pulse counts, sample moments, ...)
    pub metrics: BTreeMap<String, f64>,
}

impl RunSummary {
    pub fn new(figure: &str, config: &FiguresConfig) -> Self {
        Self {
            figure: figure.to_string(),
            created_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            outputs: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn record_output(&mut self, path: &Path) {
        self.outputs.push(path.to_path_buf());
    }

    pub fn metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }
}

/// Create `<base>/<timestamp>` (with a numeric suffix if it already exists).
pub fn create_timestamped_run_dir(base_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(base_dir)
        .with_context(|| format!("failed to create output base directory {}", base_dir.display()))?;

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let mut run_dir = base_dir.join(&timestamp);
    let mut counter = 1_u32;
    while run_dir.exists() {
        run_dir = base_dir.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;
    Ok(run_dir)
}

pub fn write_curves_csv(path: &Path, series: &[Series]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open CSV path {}", path.display()))?;

    for curve in series {
        for &(x, y) in &curve.points {
            writer.serialize(CurveRow {
                series: &curve.label,
                x,
                y,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(summary)?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Series;

    #[test]
    fn test_run_dirs_are_unique() {
        let base = tempfile::tempdir().unwrap();
        let a = create_timestamped_run_dir(base.path()).unwrap();
        let b = create_timestamped_run_dir(base.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
    }

    #[test]
    fn test_curves_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.csv");
        let series = vec![
            Series::line("welch", vec![(0.0, 1.0), (0.5, 2.0)]),
            Series::reference("analytical", vec![(0.0, 1.5)]),
        ];
        write_curves_csv(&path, &series).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "series,x,y");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("analytical,"));
    }

    #[test]
    fn test_summary_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let mut summary = RunSummary::new("gamma-wait", &FiguresConfig::default());
        summary.metric("pulses", 20.0);
        summary.record_output(Path::new("gammawait.svg"));
        write_summary(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["figure"], "gamma-wait");
        assert_eq!(value["metrics"]["pulses"], 20.0);
        assert_eq!(value["config"]["simulation"]["waiting_time"], 5.0);
    }
}

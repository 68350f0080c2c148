use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Shared simulation settings for every synthetic figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    /// Sampling step
    pub dt: f64,
    /// Length of each realization
    pub duration: f64,
    /// Mean waiting time between pulses
    pub waiting_time: f64,
    /// Lorentz kernel truncation, relative to its peak
    pub tolerance: f64,
    /// RNG seed; each realization derives its own stream from it
    pub seed: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 100_000.0,
            waiting_time: 5.0,
            tolerance: 1e-5,
            seed: 42,
        }
    }
}

/// Gamma renewal spectra against the renewal prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaWaitSection {
    pub shapes: Vec<f64>,
    pub welch_divisions: usize,
    /// Largest plotted correlation lag
    pub max_lag: f64,
}

impl Default for GammaWaitSection {
    fn default() -> Self {
        Self {
            shapes: vec![1000.0, 100.0, 10.0],
            welch_divisions: 30,
            max_lag: 50.0,
        }
    }
}

/// Exponential vs asymmetric Laplace amplitudes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplitudesSection {
    pub welch_divisions: usize,
    pub max_lag: f64,
    /// Asymmetry of the Laplace amplitudes
    pub laplace_asymmetry: f64,
    /// Standard deviation of the Laplace amplitudes
    pub laplace_std: f64,
    /// Size of the independent sample used to estimate amplitude moments
    pub amplitude_sample: usize,
}

impl Default for AmplitudesSection {
    fn default() -> Self {
        Self {
            welch_divisions: 10,
            max_lag: 50.0,
            laplace_asymmetry: 0.5,
            laplace_std: 0.5,
            amplitude_sample: 10_000,
        }
    }
}

/// Gamma renewal spectra against the periodic-arrival limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicLimitSection {
    pub shapes: Vec<f64>,
    pub welch_divisions: usize,
    pub max_lag: f64,
}

impl Default for PeriodicLimitSection {
    fn default() -> Self {
        Self {
            shapes: vec![1000.0, 100.0, 10.0],
            welch_divisions: 30,
            max_lag: 50.0,
        }
    }
}

/// Energy time series read from array files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySection {
    /// Samples dropped from the start of the event series
    pub warmup: usize,
    pub kinetic_threshold: f64,
    pub potential_threshold: f64,
    pub window: bool,
    pub delta: f64,
    /// Samples kept for the spectrum
    pub spectrum_samples: usize,
    pub spectrum_divisions: usize,
}

impl Default for EnergySection {
    fn default() -> Self {
        Self {
            warmup: 600,
            kinetic_threshold: 2.5,
            potential_threshold: 0.0,
            window: true,
            delta: 0.08,
            spectrum_samples: 100_000,
            spectrum_divisions: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiguresConfig {
    pub simulation: SimulationSection,
    pub gamma_wait: GammaWaitSection,
    pub amplitudes: AmplitudesSection,
    pub periodic_limit: PeriodicLimitSection,
    pub energy: EnergySection,
}

impl FiguresConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let cfg: FiguresConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML config: {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `configs/default.toml` next to the working directory or the crate,
    /// if either exists.
    pub fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from("configs").join("default.toml");
        if local.exists() {
            return Some(local);
        }
        let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("configs")
            .join("default.toml");
        bundled.exists().then_some(bundled)
    }

    pub fn rate(&self) -> f64 {
        1.0 / self.simulation.waiting_time
    }

    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.dt > 0.0) {
            bail!("simulation.dt must be > 0");
        }
        if !(sim.duration > sim.dt) {
            bail!("simulation.duration must be > dt");
        }
        if !(sim.waiting_time > 0.0) {
            bail!("simulation.waiting_time must be > 0");
        }
        if !(sim.tolerance > 0.0 && sim.tolerance < 1.0) {
            bail!("simulation.tolerance must be in (0, 1)");
        }

        for (name, shapes) in [
            ("gamma_wait", &self.gamma_wait.shapes),
            ("periodic_limit", &self.periodic_limit.shapes),
        ] {
            if shapes.is_empty() {
                bail!("{name}.shapes must be non-empty");
            }
            if shapes.iter().any(|&b| !(b > 0.0)) {
                bail!("all entries in {name}.shapes must be > 0");
            }
        }

        for (name, divisions) in [
            ("gamma_wait.welch_divisions", self.gamma_wait.welch_divisions),
            ("amplitudes.welch_divisions", self.amplitudes.welch_divisions),
            ("periodic_limit.welch_divisions", self.periodic_limit.welch_divisions),
            ("energy.spectrum_divisions", self.energy.spectrum_divisions),
        ] {
            if divisions == 0 {
                bail!("{name} must be > 0");
            }
        }

        let amp = &self.amplitudes;
        if !(amp.laplace_asymmetry > 0.0 && amp.laplace_asymmetry < 1.0) {
            bail!("amplitudes.laplace_asymmetry must be in (0, 1)");
        }
        if !(amp.laplace_std > 0.0) {
            bail!("amplitudes.laplace_std must be > 0");
        }
        if amp.amplitude_sample < 2 {
            bail!("amplitudes.amplitude_sample must be at least 2");
        }
        if !(self.energy.delta > 0.0) {
            bail!("energy.delta must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = FiguresConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.rate() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: FiguresConfig = toml::from_str(
            r#"
            [simulation]
            duration = 2000.0

            [gamma_wait]
            shapes = [50.0]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.simulation.duration, 2000.0);
        assert_eq!(cfg.simulation.dt, 0.01);
        assert_eq!(cfg.gamma_wait.shapes, vec![50.0]);
        assert_eq!(cfg.gamma_wait.welch_divisions, 30);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut cfg = FiguresConfig::default();
        cfg.periodic_limit.shapes.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = FiguresConfig::default();
        cfg.energy.spectrum_divisions = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = FiguresConfig::default();
        cfg.simulation.waiting_time = -5.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/default.toml");
        let cfg = FiguresConfig::from_toml_file(&path).unwrap();
        let defaults = FiguresConfig::default();
        assert_eq!(
            serde_json::to_value(&cfg).unwrap(),
            serde_json::to_value(&defaults).unwrap()
        );
    }
}

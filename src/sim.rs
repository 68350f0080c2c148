//! Simulation harness
//!
//! Ties a time grid, a pulse rate, a forcing generator and a realization
//! builder together. Randomness is always supplied by the caller.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::forcing::{Forcing, ForcingGenerator};
use crate::grid::TimeGrid;
use crate::params::ProcessParams;
use crate::pulse_shape::PulseShape;
use crate::realization::{Realization, RealizationBuilder, DEFAULT_TOLERANCE};
use crate::{ensure_positive, Result};

/// Deterministic random state for reproducible runs.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt: f64,
    pub duration: f64,
    pub rate: f64,
    pub shape: PulseShape,
    pub tolerance: f64,
    pub generator: ForcingGenerator,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 1000.0,
            rate: 0.2,
            shape: PulseShape::Lorentz,
            tolerance: DEFAULT_TOLERANCE,
            generator: ForcingGenerator::default(),
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("duration", self.duration)?;
        ensure_positive("rate", self.rate)?;
        self.generator.amplitudes.validate()?;
        Ok(())
    }

    pub fn point_model(&self) -> Result<PointModel> {
        self.validate()?;
        let grid = TimeGrid::new(self.duration, self.dt)?;
        Ok(PointModel::new(grid, self.rate)
            .with_generator(self.generator)
            .with_builder(RealizationBuilder::new(self.shape).with_tolerance(self.tolerance)))
    }
}

/// Grid, rate, forcing generator and pulse shape of one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointModel {
    grid: TimeGrid,
    rate: f64,
    generator: ForcingGenerator,
    builder: RealizationBuilder,
}

impl PointModel {
    /// Model with Poisson arrivals, exponential amplitudes and Lorentz pulses.
    pub fn new(grid: TimeGrid, rate: f64) -> Self {
        Self {
            grid,
            rate,
            generator: ForcingGenerator::default(),
            builder: RealizationBuilder::default(),
        }
    }

    /// Model parameterized by the mean waiting time instead of the rate.
    pub fn with_waiting_time(grid: TimeGrid, waiting_time: f64) -> Self {
        Self::new(grid, 1.0 / waiting_time)
    }

    pub fn with_generator(mut self, generator: ForcingGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_builder(mut self, builder: RealizationBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_pulse_shape(mut self, shape: PulseShape, tolerance: f64) -> Self {
        self.builder = RealizationBuilder::new(shape).with_tolerance(tolerance);
        self
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn generator(&self) -> &ForcingGenerator {
        &self.generator
    }

    pub fn shape(&self) -> PulseShape {
        self.builder.shape()
    }

    /// Parameters implied by the configured distributions.
    pub fn process_params(&self) -> ProcessParams {
        ProcessParams::new(
            self.rate,
            self.generator.amplitudes.mean(),
            self.generator.amplitudes.std_dev(),
            self.generator.durations.mean(),
        )
    }

    /// Draw a forcing and superpose it. The forcing is returned alongside
    /// the signal.
    pub fn make_realization<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Realization, Forcing)> {
        let forcing = self.generator.generate(&self.grid, self.rate, rng)?;
        let realization = self.builder.build(&self.grid, &forcing);
        tracing::debug!(
            pulses = forcing.len(),
            samples = realization.len(),
            shape = self.builder.shape().name(),
            "built realization"
        );
        Ok((realization, forcing))
    }

    /// Superpose an externally supplied forcing on this model's grid.
    pub fn realize(&self, forcing: &Forcing) -> Realization {
        self.builder.build(&self.grid, forcing)
    }
}

/// Run one seeded simulation described by `config`.
pub fn run_simulation(config: &SimConfig) -> Result<(Realization, Forcing)> {
    let model = config.point_model()?;
    let mut rng = seeded_rng(config.seed);
    model.make_realization(&mut rng)
}

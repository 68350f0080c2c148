//! shotnoise - superposed pulse processes
//!
//! Simulation of filtered point processes (random pulses with random
//! arrival times and amplitudes superposed on a uniform time grid), the
//! empirical estimators used to analyse them (Welch power spectral density,
//! biased correlation, conditional averaging), and the closed-form spectral
//! and correlation predictions they are compared against.

pub mod analytical;
pub mod conditional;
pub mod correlation;
pub mod forcing;
pub mod grid;
pub mod io;
pub mod params;
pub mod pulse_shape;
pub mod realization;
pub mod sim;
pub mod spectral;
pub mod stats;

use thiserror::Error;

// Re-export main types
pub use analytical::ArrivalStatistics;
pub use conditional::{conditional_average, ConditionalAverage, ConditionalConfig};
pub use correlation::{autocorrelation_biased, correlate, Correlation, CorrelationConfig};
pub use forcing::{
    AmplitudeDistribution, ArrivalProcess, DurationDistribution, Forcing, ForcingGenerator, Pulse,
};
pub use grid::TimeGrid;
pub use params::ProcessParams;
pub use pulse_shape::PulseShape;
pub use realization::{Realization, RealizationBuilder};
pub use sim::{seeded_rng, PointModel};
pub use spectral::{welch, SpectralEstimate, WelchConfig};

#[derive(Debug, Error)]
pub enum ShotNoiseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed array file: {0}")]
    Format(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, ShotNoiseError>;

pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }

    Err(ShotNoiseError::InvalidParameter(format!(
        "{name} must be finite and > 0, got {value}"
    )))
}

pub(crate) fn ensure_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        return Ok(());
    }

    Err(ShotNoiseError::LengthMismatch {
        context,
        expected,
        got: actual,
    })
}

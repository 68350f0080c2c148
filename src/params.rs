//! Process parameters
//!
//! Parameters entering the closed-form spectral and correlation predictions

use serde::{Deserialize, Serialize};

use crate::{ensure_positive, Result, ShotNoiseError};

/// Parameters of a superposed pulse process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParams {
    /// Pulse rate gamma (inverse mean waiting time)
    pub rate: f64,
    /// Mean pulse amplitude <A>
    pub amplitude_mean: f64,
    /// Standard deviation of the pulse amplitude A_rms
    pub amplitude_rms: f64,
    /// Pulse duration time tau_d
    pub pulse_duration: f64,
}

impl ProcessParams {
    /// Create new process parameters
    pub fn new(rate: f64, amplitude_mean: f64, amplitude_rms: f64, pulse_duration: f64) -> Self {
        Self {
            rate,
            amplitude_mean,
            amplitude_rms,
            pulse_duration,
        }
    }

    /// Parameters with unit pulse duration
    pub fn with_unit_duration(rate: f64, amplitude_mean: f64, amplitude_rms: f64) -> Self {
        Self::new(rate, amplitude_mean, amplitude_rms, 1.0)
    }

    /// Mean waiting time between pulses
    pub fn waiting_time(&self) -> f64 {
        1.0 / self.rate
    }

    /// Second moment <A^2>
    pub fn amplitude_second_moment(&self) -> f64 {
        self.amplitude_rms * self.amplitude_rms + self.amplitude_mean * self.amplitude_mean
    }

    /// Intermittency parameter gamma * tau_d
    pub fn intermittency(&self) -> f64 {
        self.rate * self.pulse_duration
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("rate", self.rate)?;
        ensure_positive("pulse_duration", self.pulse_duration)?;
        if !self.amplitude_mean.is_finite() {
            return Err(ShotNoiseError::InvalidParameter(
                "amplitude_mean must be finite".to_string(),
            ));
        }
        if !self.amplitude_rms.is_finite() || self.amplitude_rms < 0.0 {
            return Err(ShotNoiseError::InvalidParameter(
                "amplitude_rms must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProcessParams {
    /// Exponentially distributed unit-mean amplitudes at rate 0.2
    fn default() -> Self {
        Self::with_unit_duration(0.2, 1.0, 1.0)
    }
}

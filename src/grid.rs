//! Uniform time grid
//!
//! Every realization and forcing is expressed against a grid of sample
//! times `t_i = i * dt` for `i` in `0..len`.

use crate::{ensure_positive, Result, ShotNoiseError};

/// Uniformly spaced, strictly increasing sample times starting at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    dt: f64,
    len: usize,
}

impl TimeGrid {
    /// Grid covering `[0, duration)` with spacing `dt`.
    pub fn new(duration: f64, dt: f64) -> Result<Self> {
        ensure_positive("dt", dt)?;
        ensure_positive("duration", duration)?;

        let len = (duration / dt).round() as usize;
        if len == 0 {
            return Err(ShotNoiseError::InvalidParameter(format!(
                "duration {duration} is shorter than one step of dt {dt}"
            )));
        }

        Ok(Self { dt, len })
    }

    /// Grid with an explicit number of samples.
    pub fn with_len(len: usize, dt: f64) -> Result<Self> {
        ensure_positive("dt", dt)?;
        if len == 0 {
            return Err(ShotNoiseError::InvalidParameter(
                "grid must contain at least one sample".to_string(),
            ));
        }
        Ok(Self { dt, len })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last_index(&self) -> usize {
        self.len - 1
    }

    /// Time of the last sample.
    pub fn end(&self) -> f64 {
        self.time_at(self.last_index())
    }

    /// Total covered duration, `len * dt`.
    pub fn duration(&self) -> f64 {
        self.len as f64 * self.dt
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.dt
    }

    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.dt
    }

    /// Nearest grid index for time `t`, clamped to the grid.
    pub fn index_of(&self, t: f64) -> usize {
        let idx = (t / self.dt).round();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.last_index())
        }
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.time_at(i)).collect()
    }
}

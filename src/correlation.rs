//! Empirical correlation
//!
//! Full-range cross-correlation computed through zero-padded FFTs, with the
//! biased (`1/n`) or unbiased (`1/(n - |k|)`) normalization.

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::{ensure_len, stats, Result};

/// Lag normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    /// Divide every lag by the sample count.
    #[default]
    Biased,
    /// Divide by the number of overlapping samples.
    Unbiased,
}

/// Correlation estimator options
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationConfig {
    pub bias: Bias,
    /// Remove the means and divide by both standard deviations.
    pub normalize: bool,
}

impl CorrelationConfig {
    pub fn unbiased() -> Self {
        Self {
            bias: Bias::Unbiased,
            normalize: false,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

/// Correlation values on symmetric lags `-(n-1) dt ..= (n-1) dt`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Correlation {
    pub lags: Vec<f64>,
    pub values: Vec<f64>,
}

impl Correlation {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at zero lag.
    pub fn at_zero(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        self.values.get(self.values.len() / 2).copied()
    }

    /// Copy divided by the largest value.
    pub fn normalized_by_max(&self) -> Self {
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let scale = if max.is_finite() && max != 0.0 { max } else { 1.0 };
        Self {
            lags: self.lags.clone(),
            values: self.values.iter().map(|v| v / scale).collect(),
        }
    }

    /// Points with `|lag| < max_lag`.
    pub fn within(&self, max_lag: f64) -> Self {
        let (lags, values) = self
            .lags
            .iter()
            .zip(&self.values)
            .filter(|(lag, _)| lag.abs() < max_lag)
            .map(|(&l, &v)| (l, v))
            .unzip();
        Self { lags, values }
    }
}

/// Cross-correlation `sum_i x[i + k] y[i]` for every lag `k`.
pub fn correlate(x: &[f64], y: &[f64], dt: f64, config: &CorrelationConfig) -> Result<Correlation> {
    ensure_len("correlation input", x.len(), y.len())?;
    let n = x.len();
    if n == 0 {
        return Ok(Correlation::default());
    }

    let (x, y) = if config.normalize {
        (stats::centered(x), stats::centered(y))
    } else {
        (x.to_vec(), y.to_vec())
    };

    let raw = fft_cross_correlation(&x, &y);

    let sigma = if config.normalize {
        let s = stats::std_dev(&x) * stats::std_dev(&y);
        if s > 0.0 {
            s
        } else {
            1.0
        }
    } else {
        1.0
    };

    let lags: Vec<f64> = (0..2 * n - 1)
        .map(|i| (i as f64 - (n - 1) as f64) * dt)
        .collect();
    let values = raw
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let lag = i.abs_diff(n - 1);
            let count = match config.bias {
                Bias::Biased => n,
                Bias::Unbiased => n - lag,
            };
            v / (count as f64 * sigma)
        })
        .collect();

    Ok(Correlation { lags, values })
}

/// Biased autocorrelation without mean removal.
pub fn autocorrelation_biased(x: &[f64], dt: f64) -> Correlation {
    let n = x.len();
    if n == 0 {
        return Correlation::default();
    }
    let raw = fft_autocorrelation(x);
    Correlation {
        lags: (0..2 * n - 1)
            .map(|i| (i as f64 - (n - 1) as f64) * dt)
            .collect(),
        values: raw.into_iter().map(|v| v / n as f64).collect(),
    }
}

/// Raw autocorrelation sums, using a single transform buffer.
fn fft_autocorrelation(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let size = (2 * n - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut buffer = vec![Complex64::new(0.0, 0.0); size];
    for (slot, &v) in buffer.iter_mut().zip(x) {
        *slot = Complex64::new(v, 0.0);
    }
    forward.process(&mut buffer);
    for value in buffer.iter_mut() {
        *value = Complex64::new(value.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    unwrap_lags(&buffer, n)
}

/// Raw correlation sums ordered from lag `-(n-1)` to `n-1`.
fn fft_cross_correlation(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let size = (2 * n - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut fx = vec![Complex64::new(0.0, 0.0); size];
    let mut fy = vec![Complex64::new(0.0, 0.0); size];
    for (slot, &v) in fx.iter_mut().zip(x) {
        *slot = Complex64::new(v, 0.0);
    }
    for (slot, &v) in fy.iter_mut().zip(y) {
        *slot = Complex64::new(v, 0.0);
    }
    forward.process(&mut fx);
    forward.process(&mut fy);

    let mut product: Vec<Complex64> = fx.iter().zip(&fy).map(|(a, b)| a * b.conj()).collect();
    inverse.process(&mut product);

    unwrap_lags(&product, n)
}

/// Reorder a circular correlation of length `size` into lags `-(n-1) ..= n-1`.
fn unwrap_lags(circular: &[Complex64], n: usize) -> Vec<f64> {
    let size = circular.len();
    let scale = 1.0 / size as f64;
    // Negative lags wrap to the end of the circular result.
    (0..2 * n - 1)
        .map(|i| {
            let idx = if i + 1 >= n { i + 1 - n } else { size + i + 1 - n };
            circular[idx].re * scale
        })
        .collect()
}

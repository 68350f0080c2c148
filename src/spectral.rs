//! Welch PSD — power spectral density via averaged periodograms
//!
//! The signal is cut into overlapping segments, each segment is detrended
//! and windowed, and the squared FFT magnitudes are averaged. Output is
//! one-sided: every bin except DC (and Nyquist for even segment lengths)
//! carries the power of its negative-frequency twin.
//!
//! ## Example
//!
//! ```rust
//! use shotnoise::spectral::{welch, WelchConfig};
//!
//! let signal: Vec<f64> = (0..4096).map(|i| (0.1 * i as f64).sin()).collect();
//! let config = WelchConfig::with_divisions(signal.len(), 8);
//! let estimate = welch(&signal, 100.0, &config);
//! assert_eq!(estimate.frequencies.len(), config.segment_len / 2 + 1);
//! assert!(estimate.segments > 0);
//! ```

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// PSD scaling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Power per unit frequency.
    Density,
    /// Power per bin.
    Spectrum,
}

/// Detrending mode per segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detrend {
    None,
    /// Remove the segment mean.
    Constant,
    /// Remove a least-squares line.
    Linear,
}

/// Window function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Hann,
    Hamming,
    Rectangular,
}

impl Window {
    /// Periodic window coefficients of length `size`.
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        let pi = std::f64::consts::PI;
        (0..size)
            .map(|i| {
                let x = i as f64 / size as f64;
                match self {
                    Window::Hann => 0.5 - 0.5 * (2.0 * pi * x).cos(),
                    Window::Hamming => 0.54 - 0.46 * (2.0 * pi * x).cos(),
                    Window::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// Welch estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Samples per segment.
    pub segment_len: usize,
    /// Overlap between consecutive segments, as a fraction of `segment_len`.
    pub overlap_fraction: f64,
    pub window: Window,
    pub detrend: Detrend,
    pub scaling: Scaling,
}

impl WelchConfig {
    pub fn new(segment_len: usize) -> Self {
        Self {
            segment_len,
            overlap_fraction: 0.5,
            window: Window::Hann,
            detrend: Detrend::Constant,
            scaling: Scaling::Density,
        }
    }

    /// Segments of `signal_len / divisions` samples.
    ///
    /// Smaller `divisions` gives finer frequency resolution and a noisier
    /// estimate.
    pub fn with_divisions(signal_len: usize, divisions: usize) -> Self {
        Self::new(signal_len / divisions.max(1))
    }

    pub fn with_detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }

    pub fn with_window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    pub fn with_overlap(mut self, overlap_fraction: f64) -> Self {
        self.overlap_fraction = overlap_fraction;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }
}

/// Averaged periodogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpectralEstimate {
    /// Frequencies in cycles per unit time, `0 ..= fs / 2`.
    pub frequencies: Vec<f64>,
    /// One-sided power at each frequency.
    pub power: Vec<f64>,
    /// Number of averaged segments.
    pub segments: usize,
    /// Bin spacing.
    pub resolution: f64,
}

impl SpectralEstimate {
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Index of the bin closest to `frequency`.
    pub fn nearest_bin(&self, frequency: f64) -> Option<usize> {
        if self.is_empty() || self.resolution <= 0.0 {
            return None;
        }
        let idx = (frequency / self.resolution).round().max(0.0) as usize;
        Some(idx.min(self.frequencies.len() - 1))
    }

    /// `(frequency, power)` pairs with `lo <= frequency <= hi`.
    pub fn band(&self, lo: f64, hi: f64) -> Vec<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(self.power.iter())
            .filter(|(f, _)| **f >= lo && **f <= hi)
            .map(|(&f, &p)| (f, p))
            .collect()
    }

    /// Integral of the power over frequency (total variance for density scaling).
    pub fn total_power(&self) -> f64 {
        self.power.iter().sum::<f64>() * self.resolution
    }
}

/// Welch estimate of the one-sided PSD of `signal` sampled at `sample_rate`.
///
/// An empty signal or a zero segment length yields an empty estimate; a
/// signal shorter than one segment is analysed as a single segment.
pub fn welch(signal: &[f64], sample_rate: f64, config: &WelchConfig) -> SpectralEstimate {
    if signal.is_empty() || config.segment_len == 0 || !(sample_rate > 0.0) {
        return SpectralEstimate::default();
    }

    let n = if signal.len() < config.segment_len {
        tracing::debug!(
            requested = config.segment_len,
            available = signal.len(),
            "welch segment longer than signal, using the whole signal"
        );
        signal.len()
    } else {
        config.segment_len
    };

    let overlap = ((n as f64 * config.overlap_fraction.clamp(0.0, 0.99)) as usize).min(n - 1);
    let step = n - overlap;
    let num_segments = (signal.len() - n) / step + 1;

    let window = config.window.coefficients(n);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let window_sum: f64 = window.iter().sum();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];

    let bins = n / 2 + 1;
    let mut accum = vec![0.0f64; bins];

    for seg in 0..num_segments {
        let offset = seg * step;
        let segment = detrend(&signal[offset..offset + n], config.detrend);

        for ((slot, &x), &w) in buffer.iter_mut().zip(segment.iter()).zip(window.iter()) {
            *slot = Complex64::new(x * w, 0.0);
        }
        fft.process_with_scratch(&mut buffer, &mut scratch);

        for (acc, x) in accum.iter_mut().zip(buffer.iter()) {
            *acc += x.norm_sqr();
        }
    }

    let scale = match config.scaling {
        Scaling::Density => 1.0 / (sample_rate * window_power),
        Scaling::Spectrum => 1.0 / (window_sum * window_sum),
    } / num_segments as f64;

    let nyquist_bin = if n % 2 == 0 { Some(n / 2) } else { None };
    let power = accum
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let doubled = k != 0 && Some(k) != nyquist_bin;
            if doubled {
                2.0 * p * scale
            } else {
                p * scale
            }
        })
        .collect();

    let resolution = sample_rate / n as f64;
    SpectralEstimate {
        frequencies: (0..bins).map(|k| k as f64 * resolution).collect(),
        power,
        segments: num_segments,
        resolution,
    }
}

fn detrend(segment: &[f64], mode: Detrend) -> Vec<f64> {
    match mode {
        Detrend::None => segment.to_vec(),
        Detrend::Constant => crate::stats::centered(segment),
        Detrend::Linear => {
            let n = segment.len() as f64;
            if segment.len() < 2 {
                return crate::stats::centered(segment);
            }
            let x_mean = (n - 1.0) / 2.0;
            let y_mean = crate::stats::mean(segment);
            let mut sxy = 0.0;
            let mut sxx = 0.0;
            for (i, &y) in segment.iter().enumerate() {
                let dx = i as f64 - x_mean;
                sxy += dx * (y - y_mean);
                sxx += dx * dx;
            }
            let slope = sxy / sxx;
            segment
                .iter()
                .enumerate()
                .map(|(i, &y)| y - y_mean - slope * (i as f64 - x_mean))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::seeded_rng;
    use rand_distr::{Distribution, Normal};

    fn white_noise(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = seeded_rng(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn test_white_noise_level() {
        let fs = 100.0;
        let sigma = 2.0;
        let signal = white_noise(200_000, sigma, 1);
        let est = welch(&signal, fs, &WelchConfig::new(1024));

        // One-sided density of white noise is 2 sigma^2 / fs.
        let expected = 2.0 * sigma * sigma / fs;
        let interior = &est.power[1..est.power.len() - 1];
        let mean_level = interior.iter().sum::<f64>() / interior.len() as f64;
        assert!((mean_level / expected - 1.0).abs() < 0.02, "level {mean_level}");
    }

    #[test]
    fn test_total_power_matches_variance() {
        let signal = white_noise(65_536, 1.5, 2);
        let est = welch(&signal, 10.0, &WelchConfig::new(512));
        let variance = crate::stats::std_dev(&signal).powi(2);
        assert!((est.total_power() / variance - 1.0).abs() < 0.03);
    }

    #[test]
    fn test_tone_peak_bin() {
        let fs = 64.0;
        let signal: Vec<f64> = (0..4096)
            .map(|i| (2.0 * std::f64::consts::PI * 8.0 * i as f64 / fs).sin())
            .collect();
        let est = welch(&signal, fs, &WelchConfig::new(256));
        let peak = est
            .power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((est.frequencies[peak] - 8.0).abs() < 1e-9);
        assert_eq!(est.nearest_bin(8.1), Some(peak));
    }

    #[test]
    fn test_segment_count_and_axis() {
        let signal = vec![1.0; 1000];
        let est = welch(&signal, 1.0, &WelchConfig::new(100));
        // step 50: (1000 - 100) / 50 + 1
        assert_eq!(est.segments, 19);
        assert_eq!(est.frequencies.len(), 51);
        assert!((est.resolution - 0.01).abs() < 1e-12);
        assert!((est.frequencies[50] - 0.5).abs() < 1e-12);
        // Constant detrending removes a DC signal entirely.
        assert!(est.power.iter().all(|&p| p.abs() < 1e-20));
    }

    #[test]
    fn test_divisions() {
        let config = WelchConfig::with_divisions(100_000, 30);
        assert_eq!(config.segment_len, 3333);
        assert_eq!(WelchConfig::with_divisions(10, 0).segment_len, 10);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(welch(&[], 1.0, &WelchConfig::new(16)).is_empty());
        assert!(welch(&[1.0, 2.0], 1.0, &WelchConfig::new(0)).is_empty());

        let short = welch(&[1.0, -1.0, 1.0, -1.0], 1.0, &WelchConfig::new(64));
        assert_eq!(short.segments, 1);
        assert_eq!(short.frequencies.len(), 3);

        let flat = welch(&vec![0.0; 256], 1.0, &WelchConfig::new(64));
        assert!(flat.power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_linear_detrend_removes_ramp() {
        let ramp: Vec<f64> = (0..128).map(|i| 3.0 + 0.5 * i as f64).collect();
        let residual = detrend(&ramp, Detrend::Linear);
        assert!(residual.iter().all(|r| r.abs() < 1e-9));
    }
}

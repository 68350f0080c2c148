//! Conditional averaging
//!
//! Locates large-amplitude events in a signal and averages the waveform in
//! a fixed window centred on each event peak. Events are the maxima of
//! contiguous excursions above a threshold; with the window filter enabled
//! a maximum only counts if nothing larger lies within half a window of it.

use serde::{Deserialize, Serialize};

use crate::{ensure_len, ensure_positive, Result, ShotNoiseError};

/// Conditional averaging options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionalConfig {
    /// Excursion threshold, in units of the signal.
    pub threshold: f64,
    /// Keep only peaks that dominate their own window.
    pub window: bool,
    /// Full window length in time units.
    pub delta: f64,
}

impl ConditionalConfig {
    pub fn new(threshold: f64, delta: f64) -> Self {
        Self {
            threshold,
            window: true,
            delta,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("delta", self.delta)?;
        if !self.threshold.is_finite() {
            return Err(ShotNoiseError::InvalidParameter(
                "threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConditionalConfig {
    fn default() -> Self {
        Self::new(2.5, 0.08)
    }
}

/// Result of a conditional average
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionalAverage {
    /// Mean waveform centred on the peaks.
    pub average: Vec<f64>,
    /// Conditional variance `1 - <s>^2 / <s^2>` per lag.
    pub variance: Vec<f64>,
    pub time_lags: Vec<f64>,
    pub peaks: Vec<f64>,
    pub peak_times: Vec<f64>,
    /// Time from the start of the record to the first peak, then between
    /// consecutive peaks.
    pub waiting_times: Vec<f64>,
    /// Number of averaged events.
    pub events: usize,
}

impl ConditionalAverage {
    /// Average divided by its maximum.
    pub fn normalized_average(&self) -> Vec<f64> {
        let max = self.average.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(max.is_finite() && max != 0.0) {
            return self.average.clone();
        }
        self.average.iter().map(|v| v / max).collect()
    }

    /// Consecutive peak pairs `(A_n, A_{n+1})`.
    pub fn successive_peaks(&self) -> Vec<(f64, f64)> {
        self.peaks.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Each peak paired with the waiting time until the next one.
    pub fn peak_waiting_pairs(&self) -> Vec<(f64, f64)> {
        self.peaks
            .iter()
            .zip(self.waiting_times.iter().skip(1))
            .map(|(&a, &w)| (a, w))
            .collect()
    }
}

pub fn conditional_average(
    signal: &[f64],
    time: &[f64],
    config: &ConditionalConfig,
) -> Result<ConditionalAverage> {
    config.validate()?;
    ensure_len("conditional average time axis", signal.len(), time.len())?;
    let n = signal.len();
    if n < 2 {
        return Ok(ConditionalAverage::default());
    }

    let dt = (time[n - 1] - time[0]) / (n - 1) as f64;
    ensure_positive("time step", dt)?;
    let half = (0.5 * config.delta / dt).round() as usize;

    let candidates = excursion_maxima(signal, config.threshold);
    let mut dropped = 0usize;
    let peaks_idx: Vec<usize> = candidates
        .into_iter()
        .filter(|&i| {
            let fits = i >= half && i + half < n;
            if !fits {
                dropped += 1;
                return false;
            }
            !config.window
                || signal[i - half..=i + half]
                    .iter()
                    .all(|&v| v <= signal[i])
        })
        .collect();
    if dropped > 0 {
        tracing::debug!(dropped, "events too close to the record edge");
    }

    let width = 2 * half + 1;
    let mut sum = vec![0.0; width];
    let mut sum_sq = vec![0.0; width];
    for &i in &peaks_idx {
        for (k, &v) in signal[i - half..=i + half].iter().enumerate() {
            sum[k] += v;
            sum_sq[k] += v * v;
        }
    }

    let events = peaks_idx.len();
    let (average, variance) = if events == 0 {
        (Vec::new(), Vec::new())
    } else {
        let count = events as f64;
        let average: Vec<f64> = sum.iter().map(|s| s / count).collect();
        let variance = average
            .iter()
            .zip(&sum_sq)
            .map(|(m, s2)| {
                let second = s2 / count;
                if second > 0.0 {
                    1.0 - m * m / second
                } else {
                    0.0
                }
            })
            .collect();
        (average, variance)
    };

    let peak_times: Vec<f64> = peaks_idx.iter().map(|&i| time[i]).collect();
    let mut waiting_times = Vec::with_capacity(events);
    if let Some(&first) = peak_times.first() {
        waiting_times.push(first - time[0]);
        waiting_times.extend(peak_times.windows(2).map(|w| w[1] - w[0]));
    }

    Ok(ConditionalAverage {
        time_lags: if events == 0 {
            Vec::new()
        } else {
            (0..width).map(|k| (k as f64 - half as f64) * dt).collect()
        },
        average,
        variance,
        peaks: peaks_idx.iter().map(|&i| signal[i]).collect(),
        peak_times,
        waiting_times,
        events,
    })
}

/// Index of the maximum of every contiguous run above `threshold`.
fn excursion_maxima(signal: &[f64], threshold: f64) -> Vec<usize> {
    let mut maxima = Vec::new();
    let mut current: Option<usize> = None;
    for (i, &v) in signal.iter().enumerate() {
        if v > threshold {
            current = match current {
                Some(best) if signal[best] >= v => Some(best),
                _ => Some(i),
            };
        } else if let Some(best) = current.take() {
            maxima.push(best);
        }
    }
    if let Some(best) = current {
        maxima.push(best);
    }
    maxima
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::{Forcing, Pulse};
    use crate::grid::TimeGrid;
    use crate::pulse_shape::PulseShape;
    use crate::realization::RealizationBuilder;

    #[test]
    fn test_excursion_maxima() {
        let s = [0.0, 3.0, 4.0, 1.0, 0.0, 5.0, 0.0, 2.0, 6.0];
        assert_eq!(excursion_maxima(&s, 1.5), vec![2, 5, 8]);
        assert!(excursion_maxima(&s, 10.0).is_empty());
    }

    #[test]
    fn test_isolated_pulse_train() {
        let grid = TimeGrid::new(100.0, 0.01).unwrap();
        let arrivals = [10.0, 25.0, 47.0, 80.0];
        let amplitudes = [3.0, 5.0, 4.0, 6.0];
        let forcing = Forcing::new(
            arrivals
                .iter()
                .zip(amplitudes)
                .map(|(&t, a)| Pulse {
                    arrival_time: t,
                    amplitude: a,
                    duration: 0.5,
                })
                .collect(),
        );
        let signal = RealizationBuilder::new(PulseShape::Exponential).build(&grid, &forcing);

        let config = ConditionalConfig::new(1.0, 2.0);
        let result = conditional_average(signal.values(), &grid.times(), &config).unwrap();

        assert_eq!(result.events, 4);
        for (peak, a) in result.peaks.iter().zip(amplitudes) {
            assert!((peak - a).abs() < 1e-9);
        }
        for (t, expected) in result.peak_times.iter().zip(arrivals) {
            assert!((t - expected).abs() < 1e-9);
        }
        let waits: Vec<f64> = result.waiting_times.iter().skip(1).copied().collect();
        for (w, expected) in waits.iter().zip([15.0, 22.0, 33.0]) {
            assert!((w - expected).abs() < 1e-9);
        }
        assert!((result.waiting_times[0] - 10.0).abs() < 1e-9);

        assert_eq!(result.average.len(), 201);
        assert_eq!(result.time_lags.len(), 201);
        assert!(result.time_lags[100].abs() < 1e-12);
        assert!((result.average[100] - 4.5).abs() < 1e-9);
        // Peak values differ, so the variance at the peak is positive.
        assert!(result.variance[100] > 0.0);
        assert!((result.normalized_average()[100] - 1.0).abs() < 1e-12);
        assert_eq!(result.successive_peaks().len(), 3);
        assert_eq!(result.peak_waiting_pairs()[0], (3.0, waits[0]));
    }

    #[test]
    fn test_window_filter_keeps_dominant_peak() {
        let time: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut signal = vec![0.0; 20];
        signal[8] = 3.0;
        signal[10] = 5.0;

        let with_window = ConditionalConfig::new(1.0, 6.0);
        let result = conditional_average(&signal, &time, &with_window).unwrap();
        assert_eq!(result.peak_times, vec![10.0]);

        let without = ConditionalConfig {
            window: false,
            ..with_window
        };
        let result = conditional_average(&signal, &time, &without).unwrap();
        assert_eq!(result.peak_times, vec![8.0, 10.0]);
    }

    #[test]
    fn test_edge_events_dropped() {
        let time: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let mut signal = vec![0.0; 10];
        signal[1] = 4.0;
        signal[5] = 2.0;
        let result =
            conditional_average(&signal, &time, &ConditionalConfig::new(1.0, 4.0)).unwrap();
        assert_eq!(result.events, 1);
        assert_eq!(result.peaks, vec![2.0]);
    }

    #[test]
    fn test_invalid_arguments() {
        let config = ConditionalConfig::new(0.0, 0.0);
        assert!(conditional_average(&[1.0, 2.0], &[0.0, 1.0], &config).is_err());
        let config = ConditionalConfig::default();
        assert!(conditional_average(&[1.0, 2.0], &[0.0], &config).is_err());

        let empty = conditional_average(&[], &[], &config).unwrap();
        assert_eq!(empty.events, 0);
    }
}

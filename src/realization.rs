//! Realization builder
//!
//! Superposes one shifted and scaled kernel per pulse onto the time grid.
//! Kernels with infinite support are truncated where they fall below a
//! fraction `tolerance` of their peak.

use crate::forcing::Forcing;
use crate::grid::TimeGrid;
use crate::pulse_shape::PulseShape;
use crate::stats;

/// Default kernel truncation, relative to the kernel peak
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Dense signal sampled on a [`TimeGrid`]
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    grid: TimeGrid,
    values: Vec<f64>,
}

impl Realization {
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn times(&self) -> Vec<f64> {
        self.grid.times()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.values)
    }

    pub fn std_dev(&self) -> f64 {
        stats::std_dev(&self.values)
    }

    /// Signal with its sample mean removed.
    pub fn centered(&self) -> Vec<f64> {
        stats::centered(&self.values)
    }

    /// Signal with zero mean and unit standard deviation.
    pub fn standardized(&self) -> Vec<f64> {
        stats::standardized(&self.values)
    }
}

/// Builds realizations from a forcing and a pulse shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizationBuilder {
    shape: PulseShape,
    tolerance: f64,
}

impl RealizationBuilder {
    pub fn new(shape: PulseShape) -> Self {
        Self {
            shape,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Truncation tolerance; zero evaluates every kernel over the whole grid.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    pub fn shape(&self) -> PulseShape {
        self.shape
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn build(&self, grid: &TimeGrid, forcing: &Forcing) -> Realization {
        let mut values = vec![0.0; grid.len()];
        let dt = grid.dt();
        let last = grid.last_index() as f64;
        let (theta_min, theta_max) = self.shape.support(self.tolerance);

        for pulse in forcing.pulses() {
            let tau = pulse.duration;
            if !(tau > 0.0) || pulse.amplitude == 0.0 {
                continue;
            }

            // Window of grid indices where the kernel exceeds the tolerance.
            let lo = ((pulse.arrival_time + theta_min * tau) / dt).floor().max(0.0);
            let hi = ((pulse.arrival_time + theta_max * tau) / dt).ceil().min(last);
            if hi < lo {
                continue;
            }

            let (lo, hi) = (lo as usize, hi as usize);
            for (offset, value) in values[lo..=hi].iter_mut().enumerate() {
                let t = grid.time_at(lo + offset);
                *value += pulse.amplitude * self.shape.evaluate((t - pulse.arrival_time) / tau);
            }
        }

        Realization {
            grid: *grid,
            values,
        }
    }
}

impl Default for RealizationBuilder {
    fn default() -> Self {
        Self::new(PulseShape::Lorentz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::{ForcingGenerator, Pulse};
    use crate::sim::seeded_rng;

    #[test]
    fn test_single_pulse_matches_kernel() {
        let grid = TimeGrid::new(20.0, 0.01).unwrap();
        let forcing = Forcing::new(vec![Pulse {
            arrival_time: 10.0,
            amplitude: 2.0,
            duration: 1.0,
        }]);
        let signal = RealizationBuilder::new(PulseShape::Exponential)
            .with_tolerance(0.0)
            .build(&grid, &forcing);

        assert_eq!(signal.len(), grid.len());
        for (i, &v) in signal.values().iter().enumerate() {
            let expected = 2.0 * PulseShape::Exponential.evaluate(grid.time_at(i) - 10.0);
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_truncation_error_bounded_by_tolerance() {
        let grid = TimeGrid::new(2000.0, 0.01).unwrap();
        let forcing = Forcing::new(vec![Pulse {
            arrival_time: 1000.0,
            amplitude: 1.0,
            duration: 1.0,
        }]);
        let full = RealizationBuilder::new(PulseShape::Lorentz)
            .with_tolerance(0.0)
            .build(&grid, &forcing);
        let short = RealizationBuilder::new(PulseShape::Lorentz)
            .with_tolerance(1e-5)
            .build(&grid, &forcing);

        let bound = 1e-5 * PulseShape::Lorentz.peak();
        for (a, b) in full.values().iter().zip(short.values()) {
            assert!((a - b).abs() <= bound * 1.0001);
        }
        assert!(short.values().iter().filter(|&&v| v == 0.0).count() > 0);
    }

    #[test]
    fn test_superposition_is_additive() {
        let grid = TimeGrid::new(50.0, 0.05).unwrap();
        let a = Pulse {
            arrival_time: 10.0,
            amplitude: 1.5,
            duration: 1.0,
        };
        let b = Pulse {
            arrival_time: 11.0,
            amplitude: -0.5,
            duration: 2.0,
        };
        let builder = RealizationBuilder::new(PulseShape::Lorentz);
        let both = builder.build(&grid, &Forcing::new(vec![a, b]));
        let only_a = builder.build(&grid, &Forcing::new(vec![a]));
        let only_b = builder.build(&grid, &Forcing::new(vec![b]));

        for i in 0..grid.len() {
            let sum = only_a.values()[i] + only_b.values()[i];
            assert!((both.values()[i] - sum).abs() < 1e-12);
        }
    }

    #[test]
    fn test_amplitude_scaling_is_linear() {
        let grid = TimeGrid::new(500.0, 0.01).unwrap();
        let mut rng = seeded_rng(21);
        let forcing = ForcingGenerator::default()
            .generate(&grid, 0.5, &mut rng)
            .unwrap();
        let builder = RealizationBuilder::new(PulseShape::Lorentz);
        let base = builder.build(&grid, &forcing);
        let scaled = builder.build(&grid, &forcing.with_scaled_amplitudes(3.5));

        for (b, s) in base.values().iter().zip(scaled.values()) {
            assert!((s - 3.5 * b).abs() <= 1e-9 * (1.0 + b.abs()));
        }
    }

    #[test]
    fn test_empty_forcing_gives_flat_signal() {
        let grid = TimeGrid::new(10.0, 0.1).unwrap();
        let signal = RealizationBuilder::default().build(&grid, &Forcing::empty());
        assert!(signal.values().iter().all(|&v| v == 0.0));
        assert_eq!(signal.std_dev(), 0.0);
    }

    #[test]
    fn test_mean_converges_to_campbell_value() {
        // <Phi> = rate * tau_d * <A> for a unit-area kernel.
        let grid = TimeGrid::new(2000.0, 0.05).unwrap();
        let mut rng = seeded_rng(17);
        let rate = 50.0;
        let forcing = ForcingGenerator::default()
            .generate(&grid, rate, &mut rng)
            .unwrap();
        let signal = RealizationBuilder::new(PulseShape::Exponential).build(&grid, &forcing);

        let expected = rate * PulseShape::Exponential.area() * 1.0;
        let relative = (signal.mean() - expected).abs() / expected;
        assert!(relative < 0.02, "mean {} vs {}", signal.mean(), expected);
    }
}

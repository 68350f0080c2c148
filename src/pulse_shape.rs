//! Pulse shapes
//!
//! Unit-area kernels `phi(theta)` evaluated at the normalized time
//! `theta = (t - t_k) / tau_k`, together with their energy spectra and
//! autocorrelation functions used by the closed-form predictions.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Pulse kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseShape {
    /// `1 / (pi (1 + theta^2))`
    Lorentz,
    /// `exp(-theta)` for `theta >= 0`, zero before the arrival
    Exponential,
}

impl PulseShape {
    pub fn name(&self) -> &'static str {
        match self {
            PulseShape::Lorentz => "lorentz",
            PulseShape::Exponential => "exponential",
        }
    }

    pub fn evaluate(&self, theta: f64) -> f64 {
        match self {
            PulseShape::Lorentz => 1.0 / (PI * (1.0 + theta * theta)),
            PulseShape::Exponential => {
                if theta >= 0.0 {
                    (-theta).exp()
                } else {
                    0.0
                }
            }
        }
    }

    /// Maximum of the kernel.
    pub fn peak(&self) -> f64 {
        match self {
            PulseShape::Lorentz => 1.0 / PI,
            PulseShape::Exponential => 1.0,
        }
    }

    /// Integral of the kernel over all time.
    pub fn area(&self) -> f64 {
        1.0
    }

    /// Normalized-time interval where `phi >= tolerance * peak`.
    ///
    /// A tolerance outside `(0, 1)` means infinite support.
    pub fn support(&self, tolerance: f64) -> (f64, f64) {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return (f64::NEG_INFINITY, f64::INFINITY);
        }
        match self {
            PulseShape::Lorentz => {
                let half_width = (1.0 / tolerance - 1.0).sqrt();
                (-half_width, half_width)
            }
            PulseShape::Exponential => (0.0, -tolerance.ln()),
        }
    }

    /// `|phi_hat(omega)|^2`, with `phi_hat(omega) = int phi(theta) exp(-i omega theta) dtheta`.
    pub fn energy_spectrum(&self, omega: f64) -> f64 {
        match self {
            PulseShape::Lorentz => (-2.0 * omega.abs()).exp(),
            PulseShape::Exponential => 1.0 / (1.0 + omega * omega),
        }
    }

    /// Angular frequency beyond which the energy spectrum stays below
    /// `tolerance` (relative to its value at zero).
    pub fn spectral_cutoff(&self, tolerance: f64) -> f64 {
        let tolerance = tolerance.clamp(f64::MIN_POSITIVE, 1.0);
        match self {
            PulseShape::Lorentz => -tolerance.ln() / 2.0,
            PulseShape::Exponential => (1.0 / tolerance - 1.0).max(0.0).sqrt(),
        }
    }

    /// `int phi(s) phi(s + t) ds`.
    pub fn autocorrelation(&self, t: f64) -> f64 {
        match self {
            PulseShape::Lorentz => 2.0 / (PI * (4.0 + t * t)),
            PulseShape::Exponential => 0.5 * (-t.abs()).exp(),
        }
    }

    /// Kernel autocorrelation divided by its value at zero lag.
    pub fn normalized_autocorrelation(&self, t: f64) -> f64 {
        match self {
            PulseShape::Lorentz => 4.0 / (4.0 + t * t),
            PulseShape::Exponential => (-t.abs()).exp(),
        }
    }

    /// `sum_k autocorrelation(t - k * period)` over all integers `k`.
    pub fn periodic_autocorrelation(&self, t: f64, period: f64) -> f64 {
        match self {
            PulseShape::Lorentz => {
                // Poisson summation of a Cauchy density with half width 2.
                let a = 2.0 * PI * 2.0 / period;
                let phase = 2.0 * PI * t / period;
                if a > 700.0 {
                    return 1.0 / period;
                }
                a.sinh() / (period * (a.cosh() - phase.cos()))
            }
            PulseShape::Exponential => {
                let reduced = t.abs().rem_euclid(period);
                let half = 0.5 * period;
                0.5 * (half - reduced).cosh() / half.sinh()
            }
        }
    }
}

impl Default for PulseShape {
    fn default() -> Self {
        PulseShape::Lorentz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrate(shape: PulseShape, lo: f64, hi: f64, steps: usize) -> f64 {
        let h = (hi - lo) / steps as f64;
        (0..steps)
            .map(|i| shape.evaluate(lo + (i as f64 + 0.5) * h) * h)
            .sum()
    }

    #[test]
    fn test_unit_area() {
        let exp_area = integrate(PulseShape::Exponential, 0.0, 50.0, 200_000);
        assert!((exp_area - 1.0).abs() < 1e-6);

        // Lorentz tails: 1 - (2/pi) atan(L) of the mass sits inside [-L, L].
        let lorentz_area = integrate(PulseShape::Lorentz, -1000.0, 1000.0, 2_000_000);
        let expected = 2.0 / PI * 1000.0_f64.atan();
        assert!((lorentz_area - expected).abs() < 1e-6);
    }

    #[test]
    fn test_support_matches_tolerance() {
        let tol = 1e-5;
        let (lo, hi) = PulseShape::Lorentz.support(tol);
        let relative = PulseShape::Lorentz.evaluate(hi) / PulseShape::Lorentz.peak();
        assert!((relative - tol).abs() < 1e-12);
        assert!((lo + hi).abs() < 1e-12);

        let (lo, hi) = PulseShape::Exponential.support(tol);
        assert_eq!(lo, 0.0);
        assert!((PulseShape::Exponential.evaluate(hi) - tol).abs() < 1e-12);

        let (lo, hi) = PulseShape::Lorentz.support(0.0);
        assert!(lo.is_infinite() && hi.is_infinite());
    }

    #[test]
    fn test_autocorrelation_at_zero_is_energy() {
        // Parseval: int phi^2 = (1 / 2 pi) int |phi_hat|^2 = 1/(2 pi) for Lorentz.
        assert!((PulseShape::Lorentz.autocorrelation(0.0) - 1.0 / (2.0 * PI)).abs() < 1e-12);
        assert!((PulseShape::Exponential.autocorrelation(0.0) - 0.5).abs() < 1e-12);
        assert_eq!(PulseShape::Lorentz.normalized_autocorrelation(0.0), 1.0);
    }

    #[test]
    fn test_periodic_autocorrelation_matches_direct_sum() {
        let period = 5.0;
        for shape in [PulseShape::Lorentz, PulseShape::Exponential] {
            for &t in &[0.0, 0.7, 2.5, 4.9, 12.3] {
                let direct: f64 = (-20_000..=20_000)
                    .map(|k| shape.autocorrelation(t - k as f64 * period))
                    .sum();
                let closed = shape.periodic_autocorrelation(t, period);
                // Truncating the Lorentz sum at |k| = 20000 leaves ~3e-6.
                assert!(
                    (direct - closed).abs() < 1e-5,
                    "{} t={t}: direct={direct} closed={closed}",
                    shape.name()
                );
            }
        }
    }

    #[test]
    fn test_spectral_cutoff() {
        let w = PulseShape::Lorentz.spectral_cutoff(1e-12);
        assert!((PulseShape::Lorentz.energy_spectrum(w) - 1e-12).abs() < 1e-20);
        let w = PulseShape::Exponential.spectral_cutoff(1e-4);
        assert!((PulseShape::Exponential.energy_spectrum(w) - 1e-4).abs() < 1e-10);
    }
}

//! Closed-form predictions
//!
//! One-sided power spectral density and autocovariance of the mean-removed
//! process for Poisson, gamma renewal and periodic arrivals.
//!
//! For a renewal process with gamma distributed waiting times the spectrum
//! carries the factor
//!
//! ```text
//! C_beta(omega) = Re[(1 + chi) / (1 - chi)],  chi = (1 - i omega / (gamma beta))^(-beta)
//! ```
//!
//! which is identically 1 for `beta = 1` (Poisson) and vanishes away from
//! the harmonics `omega = 2 pi k gamma` as `beta` grows (periodic).

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::forcing::ArrivalProcess;
use crate::params::ProcessParams;
use crate::pulse_shape::PulseShape;
use crate::{ensure_positive, Result, ShotNoiseError};

/// Relative level of `|phi_hat|^2` where the renewal integral is cut off.
const SPECTRAL_TOLERANCE: f64 = 1e-8;

/// Upper bound on quadrature nodes for the renewal autocovariance.
const MAX_INTEGRATION_POINTS: usize = 4_000_000;

/// Arrival statistics entering the closed forms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrivalStatistics {
    Poisson,
    /// Gamma distributed waiting times with shape `beta`
    GammaRenewal { shape: f64 },
    /// Fixed spacing `1 / rate`
    Periodic,
}

impl ArrivalStatistics {
    pub fn validate(&self) -> Result<()> {
        if let ArrivalStatistics::GammaRenewal { shape } = self {
            ensure_positive("gamma shape", *shape)?;
        }
        Ok(())
    }

    /// Renewal factor `C(omega)` at angular frequency `omega`.
    pub fn correction(&self, omega: f64, rate: f64) -> f64 {
        match self {
            ArrivalStatistics::Poisson => 1.0,
            ArrivalStatistics::GammaRenewal { shape } => renewal_correction(omega, rate, *shape),
            ArrivalStatistics::Periodic => 0.0,
        }
    }
}

impl From<&ArrivalProcess> for ArrivalStatistics {
    fn from(process: &ArrivalProcess) -> Self {
        match process {
            ArrivalProcess::Poisson { .. } => ArrivalStatistics::Poisson,
            ArrivalProcess::GammaRenewal { shape } => {
                ArrivalStatistics::GammaRenewal { shape: *shape }
            }
            ArrivalProcess::Periodic => ArrivalStatistics::Periodic,
        }
    }
}

/// `Re[(1 + chi) / (1 - chi)]` for gamma waiting times of shape `beta`
/// and rate `rate`. At `omega = 0` the limit `1 / beta` is returned.
pub fn renewal_correction(omega: f64, rate: f64, beta: f64) -> f64 {
    let x = omega / (rate * beta);
    if x == 0.0 {
        return 1.0 / beta;
    }

    // chi = r exp(i theta)
    let log_r = -0.5 * beta * (x * x).ln_1p();
    let theta = beta * x.atan();
    let r = log_r.exp();
    let one_minus_r = -log_r.exp_m1();

    // Re[(1 + chi)/(1 - chi)] = (1 - r^2) / |1 - chi|^2
    let half_sin = (0.5 * theta).sin();
    let denom = one_minus_r * one_minus_r + 4.0 * r * half_sin * half_sin;
    if denom == 0.0 {
        return f64::INFINITY;
    }
    one_minus_r * (1.0 + r) / denom
}

/// One-sided PSD at `frequencies` (cycles per time unit).
///
/// `S(f) = 2 gamma tau_d^2 |phi_hat(2 pi f tau_d)|^2 [A_rms^2 + <A>^2 C(2 pi f)]`.
/// Delta peaks of periodic arrivals are not represented.
pub fn power_spectral_density(
    frequencies: &[f64],
    shape: PulseShape,
    params: &ProcessParams,
    arrivals: ArrivalStatistics,
) -> Vec<f64> {
    let tau = params.pulse_duration;
    let rate = params.rate;
    let rms2 = params.amplitude_rms * params.amplitude_rms;
    let mean2 = params.amplitude_mean * params.amplitude_mean;

    frequencies
        .iter()
        .map(|&f| {
            let omega = 2.0 * PI * f;
            let energy = shape.energy_spectrum(omega * tau);
            2.0 * rate * tau * tau * energy * (rms2 + mean2 * arrivals.correction(omega, rate))
        })
        .collect()
}

/// Autocovariance of the mean-removed process at `lags`.
pub fn autocorrelation(
    lags: &[f64],
    shape: PulseShape,
    params: &ProcessParams,
    arrivals: ArrivalStatistics,
) -> Result<Vec<f64>> {
    params.validate()?;
    arrivals.validate()?;

    let tau = params.pulse_duration;
    let intermittency = params.intermittency();
    let rms2 = params.amplitude_rms * params.amplitude_rms;
    let mean2 = params.amplitude_mean * params.amplitude_mean;

    match arrivals {
        ArrivalStatistics::Poisson => Ok(lags
            .iter()
            .map(|&t| intermittency * (rms2 + mean2) * shape.autocorrelation(t / tau))
            .collect()),
        ArrivalStatistics::Periodic => {
            let period = 1.0 / intermittency;
            Ok(lags
                .iter()
                .map(|&t| {
                    let theta = t / tau;
                    intermittency * rms2 * shape.autocorrelation(theta)
                        + mean2
                            * (intermittency * shape.periodic_autocorrelation(theta, period)
                                - intermittency * intermittency)
                })
                .collect())
        }
        ArrivalStatistics::GammaRenewal { shape: beta } => {
            let correction = renewal_autocorrelation_correction(lags, shape, params, beta)?;
            Ok(lags
                .iter()
                .zip(correction)
                .map(|(&t, c)| intermittency * (rms2 + mean2) * shape.autocorrelation(t / tau) + c)
                .collect())
        }
    }
}

/// Autocorrelation divided by its value at zero lag.
pub fn normalized_autocorrelation(
    lags: &[f64],
    shape: PulseShape,
    params: &ProcessParams,
    arrivals: ArrivalStatistics,
) -> Result<Vec<f64>> {
    let zero = autocorrelation(&[0.0], shape, params, arrivals)?;
    let variance = zero.first().copied().unwrap_or(0.0);
    if !(variance > 0.0) {
        return Err(ShotNoiseError::InvalidParameter(
            "process has zero variance".to_string(),
        ));
    }
    Ok(autocorrelation(lags, shape, params, arrivals)?
        .into_iter()
        .map(|v| v / variance)
        .collect())
}

/// `(1/pi) int_0^inf gamma tau^2 |phi_hat(omega tau)|^2 <A>^2 (C(omega) - 1) cos(omega t) domega`
/// by the trapezoidal rule.
fn renewal_autocorrelation_correction(
    lags: &[f64],
    shape: PulseShape,
    params: &ProcessParams,
    beta: f64,
) -> Result<Vec<f64>> {
    let rate = params.rate;
    let tau = params.pulse_duration;
    let mean2 = params.amplitude_mean * params.amplitude_mean;
    if mean2 == 0.0 || beta == 1.0 {
        return Ok(vec![0.0; lags.len()]);
    }

    // Harmonic peaks near omega = 2 pi k rate have width ~ 2 pi^2 rate k^2 / beta.
    let step = (rate * PI / 32.0).min(rate * 2.0 * PI * PI / beta / 8.0);
    // Past the kernel cutoff, or where the gamma characteristic function
    // `r = (1 + x^2)^(-beta/2)` drops below tolerance and `C - 1` vanishes.
    let kernel_max = shape.spectral_cutoff(SPECTRAL_TOLERANCE) / tau;
    let renewal_max = rate * beta * (SPECTRAL_TOLERANCE.powf(-2.0 / beta) - 1.0).sqrt();
    let omega_max = if renewal_max.is_finite() {
        kernel_max.min(renewal_max)
    } else {
        kernel_max
    };
    let nodes = (omega_max / step).ceil() as usize + 1;
    if nodes > MAX_INTEGRATION_POINTS {
        return Err(ShotNoiseError::InvalidParameter(format!(
            "renewal autocorrelation needs {nodes} quadrature nodes (shape {beta}), \
             limit is {MAX_INTEGRATION_POINTS}"
        )));
    }
    tracing::debug!(nodes, step, omega_max, "renewal autocorrelation quadrature");

    let weights: Vec<(f64, f64)> = (0..nodes)
        .map(|k| {
            let omega = k as f64 * step;
            let edge = if k == 0 || k == nodes - 1 { 0.5 } else { 1.0 };
            let density = rate
                * tau
                * tau
                * shape.energy_spectrum(omega * tau)
                * mean2
                * (renewal_correction(omega, rate, beta) - 1.0);
            (omega, edge * density * step / PI)
        })
        .collect();

    Ok(lags
        .iter()
        .map(|&t| weights.iter().map(|&(omega, w)| w * (omega * t).cos()).sum())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_params() -> ProcessParams {
        ProcessParams::with_unit_duration(0.2, 1.0, 1.0)
    }

    #[test]
    fn test_renewal_correction_limits() {
        assert!((renewal_correction(0.0, 0.2, 10.0) - 0.1).abs() < 1e-15);
        // Continuous through zero
        assert!((renewal_correction(1e-9, 0.2, 10.0) - 0.1).abs() < 1e-6);
        for &omega in &[1e-3, 0.5, 3.0, 40.0] {
            assert!((renewal_correction(omega, 0.2, 1.0) - 1.0).abs() < 1e-10);
        }
        // Large omega: chi -> 0
        assert!((renewal_correction(1e4, 0.2, 10.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_one_psd_equals_poisson() {
        let freqs: Vec<f64> = (0..200).map(|i| i as f64 * 0.01).collect();
        for shape in [PulseShape::Lorentz, PulseShape::Exponential] {
            let poisson =
                power_spectral_density(&freqs, shape, &exp_params(), ArrivalStatistics::Poisson);
            let renewal = power_spectral_density(
                &freqs,
                shape,
                &exp_params(),
                ArrivalStatistics::GammaRenewal { shape: 1.0 },
            );
            for (p, r) in poisson.iter().zip(&renewal) {
                assert!((p - r).abs() <= 1e-10 * p.abs());
            }
        }
    }

    #[test]
    fn test_large_shape_psd_approaches_periodic() {
        let params = exp_params();
        // Midway between harmonics of the 0.2 rate
        let freqs: Vec<f64> = (0..5).map(|k| (k as f64 + 0.5) * params.rate).collect();
        let periodic = power_spectral_density(
            &freqs,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Periodic,
        );
        let renewal = power_spectral_density(
            &freqs,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::GammaRenewal { shape: 1e7 },
        );
        for (p, r) in periodic.iter().zip(&renewal) {
            assert!(((r - p) / p).abs() < 1e-3, "{r} vs {p}");
        }
    }

    #[test]
    fn test_psd_zero_frequency() {
        let params = exp_params();
        let s = power_spectral_density(
            &[0.0],
            PulseShape::Exponential,
            &params,
            ArrivalStatistics::GammaRenewal { shape: 4.0 },
        );
        // 2 gamma (A_rms^2 + <A>^2 / beta)
        assert!((s[0] - 2.0 * 0.2 * (1.0 + 0.25)).abs() < 1e-12);

        let poisson = power_spectral_density(
            &[0.0],
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Poisson,
        );
        assert!((poisson[0] - 2.0 * 0.2 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_poisson_autocorrelation_variance() {
        // Var = gamma tau_d <A^2> int phi^2
        let acf = autocorrelation(
            &[0.0, 1.0],
            PulseShape::Exponential,
            &exp_params(),
            ArrivalStatistics::Poisson,
        )
        .unwrap();
        assert!((acf[0] - 0.2 * 2.0 * 0.5).abs() < 1e-12);
        assert!((acf[1] / acf[0] - (-1.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_shape_one_autocorrelation_equals_poisson() {
        let lags: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let poisson =
            autocorrelation(&lags, PulseShape::Lorentz, &exp_params(), ArrivalStatistics::Poisson)
                .unwrap();
        let renewal = autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &exp_params(),
            ArrivalStatistics::GammaRenewal { shape: 1.0 },
        )
        .unwrap();
        for (p, r) in poisson.iter().zip(&renewal) {
            assert!((p - r).abs() < 1e-12);
        }
    }

    #[test]
    fn test_large_shape_autocorrelation_approaches_periodic() {
        let params = exp_params();
        let lags = [0.0, 2.5];
        let periodic =
            autocorrelation(&lags, PulseShape::Lorentz, &params, ArrivalStatistics::Periodic)
                .unwrap();
        let renewal = autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::GammaRenewal { shape: 1e4 },
        )
        .unwrap();
        for (p, r) in periodic.iter().zip(&renewal) {
            assert!(((r - p) / p).abs() < 0.02, "{r} vs {p}");
        }
    }

    #[test]
    fn test_large_shape_exponential_kernel_approaches_periodic() {
        let params = exp_params();
        let lags = [0.0, 2.5];
        let periodic = autocorrelation(
            &lags,
            PulseShape::Exponential,
            &params,
            ArrivalStatistics::Periodic,
        )
        .unwrap();
        let renewal = autocorrelation(
            &lags,
            PulseShape::Exponential,
            &params,
            ArrivalStatistics::GammaRenewal { shape: 1000.0 },
        )
        .unwrap();
        for (p, r) in periodic.iter().zip(&renewal) {
            assert!(((r - p) / p).abs() < 0.02, "{r} vs {p}");
        }
    }

    #[test]
    fn test_periodic_constant_amplitudes_variance() {
        // Constant amplitudes, period 5, unit Lorentz pulses
        let params = ProcessParams::with_unit_duration(0.2, 1.0, 0.0);
        let acf =
            autocorrelation(&[0.0], PulseShape::Lorentz, &params, ArrivalStatistics::Periodic)
                .unwrap();
        let period = 5.0;
        let direct: f64 = (-20_000..=20_000)
            .map(|k| PulseShape::Lorentz.autocorrelation(k as f64 * period))
            .sum();
        let expected = 0.2 * direct - 0.04;
        assert!((acf[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_normalized_autocorrelation() {
        let lags = [0.0, 2.0];
        let norm = normalized_autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &exp_params(),
            ArrivalStatistics::Poisson,
        )
        .unwrap();
        assert!((norm[0] - 1.0).abs() < 1e-12);
        assert!((norm[1] - 0.5).abs() < 1e-12);

        let flat = ProcessParams::with_unit_duration(0.2, 0.0, 0.0);
        let flat_norm = normalized_autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &flat,
            ArrivalStatistics::Poisson,
        );
        assert!(flat_norm.is_err());
    }

    #[test]
    fn test_invalid_renewal_shape() {
        let result = autocorrelation(
            &[0.0],
            PulseShape::Lorentz,
            &exp_params(),
            ArrivalStatistics::GammaRenewal { shape: 0.0 },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_arrival_process() {
        let stats = ArrivalStatistics::from(&ArrivalProcess::GammaRenewal { shape: 3.0 });
        assert_eq!(stats, ArrivalStatistics::GammaRenewal { shape: 3.0 });
        assert_eq!(
            ArrivalStatistics::from(&ArrivalProcess::Periodic),
            ArrivalStatistics::Periodic
        );
    }
}

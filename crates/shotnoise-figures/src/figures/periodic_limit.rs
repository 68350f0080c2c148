//! Gamma renewal trains approaching periodic arrivals
//!
//! Standardized signals for several gamma shapes against the
//! periodic-arrival spectrum and autocorrelation.

use shotnoise::analytical::{self, ArrivalStatistics};
use shotnoise::forcing::{AmplitudeDistribution, ArrivalProcess, ForcingGenerator};
use shotnoise::{autocorrelation_biased, stats, welch, ProcessParams, PulseShape, WelchConfig};

use super::{correlation_points, lag_axis, point_model, simulate, spectrum_points};
use super::{FigureFile, FigureOutput};
use crate::config::FiguresConfig;
use crate::plot::{ChartSpec, Panel, Series};

pub const PSD_FILE: &str = "PSD_different_gamma.svg";
pub const AC_FILE: &str = "AC_different_gamma.svg";

pub fn build(cfg: &FiguresConfig) -> anyhow::Result<FigureOutput> {
    let section = &cfg.periodic_limit;
    let mut output = FigureOutput::default();
    let mut psd_series = Vec::new();
    let mut ac_series = Vec::new();
    let mut reference = None;

    for (i, &beta) in section.shapes.iter().enumerate() {
        let generator = ForcingGenerator::default()
            .with_arrivals(ArrivalProcess::GammaRenewal { shape: beta })
            .with_amplitudes(AmplitudeDistribution::Exponential { mean: 1.0 });
        let model = point_model(cfg, generator)?;
        let (signal, forcing) = simulate(cfg, &model, i as u64)?;
        output.metric(format!("pulses_beta_{beta}"), forcing.len() as f64);

        let standardized = signal.standardized();
        let estimate = welch(
            &standardized,
            model.grid().sample_rate(),
            &WelchConfig::with_divisions(standardized.len(), section.welch_divisions),
        );
        let corr = autocorrelation_biased(&standardized, model.grid().dt());

        let label = format!("beta = {beta}");
        psd_series.push(Series::line(label.clone(), spectrum_points(&estimate)));
        ac_series.push(Series::line(label, correlation_points(&corr, section.max_lag)));

        // The prediction uses the moments of the last realization's amplitudes.
        let amplitudes = forcing.amplitudes();
        let params = ProcessParams::with_unit_duration(
            model.rate(),
            stats::mean(&amplitudes),
            stats::std_dev(&amplitudes),
        );
        reference = Some((estimate.frequencies, params, signal.std_dev().powi(2)));
    }

    if let Some((frequencies, params, variance)) = reference {
        let scale = if variance > 0.0 { variance } else { 1.0 };
        let predicted = analytical::power_spectral_density(
            &frequencies,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Periodic,
        );
        psd_series.push(Series::reference(
            "S(f), periodic arrivals",
            frequencies
                .iter()
                .zip(predicted)
                .map(|(&f, s)| (f, s / scale))
                .collect(),
        ));

        let lags = lag_axis(section.max_lag, 1000);
        let predicted_ac = analytical::normalized_autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Periodic,
        )?;
        ac_series.push(Series::reference(
            "R(t), periodic arrivals",
            lags.into_iter().zip(predicted_ac).collect(),
        ));
    }

    let psd = ChartSpec::new("Power spectral density", "f", "S(f)")
        .x_range(0.0..1.0)
        .log_y(1e-4..1e2);
    let ac = ChartSpec::new("Autocorrelation", "t", "R(t)")
        .x_range(0.0..section.max_lag)
        .fit_y(&ac_series);

    output.files.push(FigureFile::new(PSD_FILE, vec![Panel::new(psd, psd_series)]));
    output.files.push(FigureFile::new(AC_FILE, vec![Panel::new(ac, ac_series)]));
    Ok(output)
}

//! Spectra and correlations of gamma renewal pulse trains
//!
//! Mean-removed signals for several gamma shapes, overlaid with the renewal
//! PSD for each shape and the kernel autocorrelation `4 / (4 + t^2)`.

use shotnoise::analytical::{self, ArrivalStatistics};
use shotnoise::forcing::{AmplitudeDistribution, ArrivalProcess, ForcingGenerator};
use shotnoise::{autocorrelation_biased, welch, PulseShape, WelchConfig};

use super::{correlation_points, lag_axis, point_model, simulate, spectrum_points};
use super::{FigureFile, FigureOutput};
use crate::config::FiguresConfig;
use crate::plot::{ChartSpec, Panel, Series};

pub const FILE_NAME: &str = "gammawait.svg";

pub fn build(cfg: &FiguresConfig) -> anyhow::Result<FigureOutput> {
    let section = &cfg.gamma_wait;
    let mut output = FigureOutput::default();
    let mut psd_series = Vec::new();
    let mut ac_series = Vec::new();
    let mut frequencies = Vec::new();
    let mut params = None;

    for (i, &beta) in section.shapes.iter().enumerate() {
        let generator = ForcingGenerator::default()
            .with_arrivals(ArrivalProcess::GammaRenewal { shape: beta })
            .with_amplitudes(AmplitudeDistribution::Exponential { mean: 1.0 });
        let model = point_model(cfg, generator)?;
        let (signal, forcing) = simulate(cfg, &model, i as u64)?;
        output.metric(format!("pulses_beta_{beta}"), forcing.len() as f64);

        let centered = signal.centered();
        let estimate = welch(
            &centered,
            model.grid().sample_rate(),
            &WelchConfig::with_divisions(centered.len(), section.welch_divisions),
        );
        let corr = autocorrelation_biased(&centered, model.grid().dt())
            .within(section.max_lag)
            .normalized_by_max();

        let label = format!("beta = {beta}");
        psd_series.push(Series::line(label.clone(), spectrum_points(&estimate)));
        ac_series.push(Series::line(label, correlation_points(&corr, section.max_lag)));

        frequencies = estimate.frequencies;
        params = Some(model.process_params());
    }

    if let Some(params) = params {
        for &beta in &section.shapes {
            let predicted = analytical::power_spectral_density(
                &frequencies,
                PulseShape::Lorentz,
                &params,
                ArrivalStatistics::GammaRenewal { shape: beta },
            );
            psd_series.push(Series::reference(
                format!("renewal PSD, beta = {beta}"),
                frequencies.iter().copied().zip(predicted).collect(),
            ));
        }
    }

    let lags = lag_axis(section.max_lag, 1000);
    ac_series.push(Series::reference(
        "4 / (4 + t^2)",
        lags.iter()
            .map(|&t| (t, PulseShape::Lorentz.normalized_autocorrelation(t)))
            .collect(),
    ));

    let psd = ChartSpec::new("Power spectral density", "tau_d f", "S(tau_d f)")
        .x_range(0.0..1.0)
        .log_y(1e-5..1e1);
    let ac = ChartSpec::new("Autocorrelation", "t / tau_d", "R(t / tau_d)")
        .x_range(0.0..section.max_lag)
        .fit_y(&ac_series);

    output.files.push(FigureFile::new(
        FILE_NAME,
        vec![Panel::new(psd, psd_series), Panel::new(ac, ac_series)],
    ));
    Ok(output)
}

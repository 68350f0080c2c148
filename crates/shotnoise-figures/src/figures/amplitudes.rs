//! Exponential versus asymmetric Laplace amplitudes
//!
//! Periodic arrivals with exponential amplitudes (non-zero mean) and uniform
//! arrivals with zero-mean Laplace amplitudes. Both signals are standardized
//! and compared with the periodic-arrival prediction, using amplitude
//! moments estimated from an independent sample.

use shotnoise::analytical::{self, ArrivalStatistics};
use shotnoise::forcing::{AmplitudeDistribution, ArrivalProcess, ForcingGenerator};
use shotnoise::{
    autocorrelation_biased, seeded_rng, stats, welch, ProcessParams, PulseShape, WelchConfig,
};

use super::{correlation_points, lag_axis, point_model, simulate, spectrum_points};
use super::{FigureFile, FigureOutput};
use crate::config::FiguresConfig;
use crate::plot::{ChartSpec, Panel, Series};

pub const PSD_FILE: &str = "PSD_exp_lap.svg";
pub const AC_FILE: &str = "AC_exp_lap.svg";

struct Case {
    name: &'static str,
    generator: ForcingGenerator,
}

fn cases(cfg: &FiguresConfig) -> [Case; 2] {
    let section = &cfg.amplitudes;
    let kappa = section.laplace_asymmetry;
    let scale = section.laplace_std / (1.0 - 2.0 * kappa * (1.0 - kappa)).sqrt();
    [
        Case {
            name: "A ~ Exp",
            generator: ForcingGenerator::default()
                .with_arrivals(ArrivalProcess::Periodic)
                .with_amplitudes(AmplitudeDistribution::Exponential { mean: 1.0 }),
        },
        Case {
            name: "A ~ Laplace",
            generator: ForcingGenerator::default()
                .with_arrivals(ArrivalProcess::Poisson {
                    sample_count: false,
                })
                .with_amplitudes(AmplitudeDistribution::AsymmetricLaplace {
                    scale,
                    asymmetry: kappa,
                }),
        },
    ]
}

pub fn build(cfg: &FiguresConfig) -> anyhow::Result<FigureOutput> {
    let section = &cfg.amplitudes;
    let mut output = FigureOutput::default();
    let mut psd_series = Vec::new();
    let mut ac_series = Vec::new();
    let lags = lag_axis(section.max_lag, 1000);

    for (i, case) in cases(cfg).into_iter().enumerate() {
        let model = point_model(cfg, case.generator)?;
        let (signal, forcing) = simulate(cfg, &model, i as u64)?;

        let mut rng = seeded_rng(cfg.simulation.seed.wrapping_add(100 + i as u64));
        let sample = case
            .generator
            .amplitudes
            .sample_n(section.amplitude_sample, &mut rng)?;
        let params = ProcessParams::with_unit_duration(
            model.rate(),
            stats::mean(&sample),
            stats::std_dev(&sample),
        );
        output.metric(format!("{}: pulses", case.name), forcing.len() as f64);
        output.metric(format!("{}: sample mean", case.name), params.amplitude_mean);
        output.metric(format!("{}: sample rms", case.name), params.amplitude_rms);

        let variance = signal.std_dev().powi(2);
        let standardized = signal.standardized();
        let estimate = welch(
            &standardized,
            model.grid().sample_rate(),
            &WelchConfig::with_divisions(standardized.len(), section.welch_divisions),
        );
        let corr = autocorrelation_biased(&standardized, model.grid().dt());

        psd_series.push(Series::line(case.name, spectrum_points(&estimate)));
        ac_series.push(Series::line(case.name, correlation_points(&corr, section.max_lag)));

        let predicted = analytical::power_spectral_density(
            &estimate.frequencies,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Periodic,
        );
        let scale = if variance > 0.0 { variance } else { 1.0 };
        psd_series.push(Series::reference(
            format!("S(f), {}", case.name),
            estimate
                .frequencies
                .iter()
                .zip(predicted)
                .map(|(&f, s)| (f, s / scale))
                .collect(),
        ));

        let predicted_ac = analytical::normalized_autocorrelation(
            &lags,
            PulseShape::Lorentz,
            &params,
            ArrivalStatistics::Periodic,
        )?;
        ac_series.push(Series::reference(
            format!("R(t), {}", case.name),
            lags.iter().copied().zip(predicted_ac).collect(),
        ));
    }

    let psd = ChartSpec::new("Power spectral density", "f", "S(f)")
        .x_range(0.0..1.0)
        .log_y(1e-4..1e3);
    let ac = ChartSpec::new("Autocorrelation", "t", "R(t)")
        .x_range(0.0..section.max_lag)
        .fit_y(&ac_series);

    output.files.push(FigureFile::new(PSD_FILE, vec![Panel::new(psd, psd_series)]));
    output.files.push(FigureFile::new(AC_FILE, vec![Panel::new(ac, ac_series)]));
    Ok(output)
}

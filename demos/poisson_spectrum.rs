//! Poisson Spectrum Example
//!
//! Simulates a Lorentz pulse train with Poisson arrivals and compares its
//! Welch spectrum and autocorrelation with the closed-form predictions

use shotnoise::analytical::{self, ArrivalStatistics};
use shotnoise::sim::{run_simulation, SimConfig};
use shotnoise::{autocorrelation_biased, welch, ProcessParams, PulseShape, WelchConfig};
use std::fs::{self, File};
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Running Poisson shot-noise simulation...\n");

    fs::create_dir_all("out")?;

    let config = SimConfig {
        dt: 0.01,
        duration: 1000.0,
        rate: 0.2,
        shape: PulseShape::Lorentz,
        ..Default::default()
    };

    println!("Configuration:");
    println!("  Time step: {}", config.dt);
    println!("  Duration: {}", config.duration);
    println!("  Pulse rate: {} (waiting time {})", config.rate, 1.0 / config.rate);
    println!("  Pulse shape: {}", config.shape.name());
    println!("  Seed: {}", config.seed);
    println!();

    let (signal, forcing) = run_simulation(&config)?;
    let params = ProcessParams::with_unit_duration(config.rate, 1.0, 1.0);

    println!("Realization:");
    println!("  Samples: {}", signal.len());
    println!("  Pulses: {}", forcing.len());
    println!("  Mean: {:.6} (expected {:.6})", signal.mean(), params.rate * params.amplitude_mean);
    println!("  Std:  {:.6}", signal.std_dev());

    let estimate = welch(
        signal.values(),
        1.0 / config.dt,
        &WelchConfig::with_divisions(signal.len(), 10),
    );
    let predicted = analytical::power_spectral_density(
        &estimate.frequencies,
        config.shape,
        &params,
        ArrivalStatistics::Poisson,
    );

    println!("\nPSD (Welch vs analytical):");
    println!("  {:>10} {:>14} {:>14}", "f", "welch", "analytical");
    for k in [1, 2, 5, 10, 20, 50] {
        if k < estimate.frequencies.len() {
            println!(
                "  {:>10.4} {:>14.6e} {:>14.6e}",
                estimate.frequencies[k], estimate.power[k], predicted[k]
            );
        }
    }

    let corr = autocorrelation_biased(&signal.standardized(), config.dt).within(10.0);
    let model = analytical::normalized_autocorrelation(
        &corr.lags,
        config.shape,
        &params,
        ArrivalStatistics::Poisson,
    )?;

    println!("\nAutocorrelation at selected lags:");
    for lag in [0.0, 1.0, 2.0, 5.0] {
        if let Some(i) = corr.lags.iter().position(|&l| (l - lag).abs() < 0.5 * config.dt) {
            println!("  t={:<4} empirical {:.4}  analytical {:.4}", lag, corr.values[i], model[i]);
        }
    }

    let csv_path = "out/poisson_spectrum.csv";
    let mut file = File::create(csv_path)?;
    writeln!(file, "f,welch,analytical")?;
    for ((f, p), s) in estimate.frequencies.iter().zip(&estimate.power).zip(&predicted) {
        writeln!(file, "{:.6},{:.6e},{:.6e}", f, p, s)?;
    }

    println!("\nCSV output written to: {}", csv_path);
    println!("Done!");

    Ok(())
}

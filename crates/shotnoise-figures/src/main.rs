use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shotnoise_figures::config::FiguresConfig;
use shotnoise_figures::{run_figure, Figure};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Simulated shot-noise spectra and correlations against closed-form predictions"
)]
struct Cli {
    /// TOML configuration (defaults to configs/default.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output base directory; each run gets a timestamped subdirectory
    #[arg(long, global = true, default_value = "output-shotnoise-figures")]
    output: PathBuf,

    /// Random seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Realization length in time units
    #[arg(long, global = true)]
    duration: Option<f64>,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Gamma renewal spectra and correlations for several shapes
    GammaWait,
    /// Exponential and asymmetric Laplace amplitudes
    Amplitudes,
    /// Gamma renewal trains against the periodic-arrival limit
    PeriodicLimit,
    /// Peak statistics of the stored energy series
    EnergyEvents {
        /// Directory holding K.npy, U.npy and K_time.npy
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
    /// Welch spectrum of the stored potential energy
    EnergySpectrum {
        /// Directory holding U_4e5.npy and K_time_4e5.npy
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
}

impl Command {
    fn into_figure(self) -> Figure {
        match self {
            Command::GammaWait => Figure::GammaWait,
            Command::Amplitudes => Figure::Amplitudes,
            Command::PeriodicLimit => Figure::PeriodicLimit,
            Command::EnergyEvents { data_dir } => Figure::EnergyEvents { data_dir },
            Command::EnergySpectrum { data_dir } => Figure::EnergySpectrum { data_dir },
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<FiguresConfig> {
    let mut cfg = match cli.config.clone().or_else(FiguresConfig::default_path) {
        Some(path) => FiguresConfig::from_toml_file(&path)?,
        None => FiguresConfig::default(),
    };
    if let Some(v) = cli.seed {
        cfg.simulation.seed = v;
    }
    if let Some(v) = cli.duration {
        cfg.simulation.duration = v;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let cfg = load_config(&cli)?;
    let figure = cli.command.into_figure();
    let (run_dir, summary) = run_figure(&figure, &cfg, &cli.output)?;

    println!("Figure complete: {}", figure.name());
    println!("Run directory: {}", run_dir.display());
    for path in &summary.outputs {
        println!("Output: {}", path.display());
    }
    for (name, value) in &summary.metrics {
        println!("{name}: {value:.4}");
    }

    Ok(())
}

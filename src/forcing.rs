//! Forcing generation
//!
//! A forcing is the sparse list of pulses (arrival time, amplitude,
//! duration) that drives a realization. The arrival process, amplitude
//! distribution and duration distribution are chosen independently and
//! dispatched through [`ForcingGenerator::generate`].

use rand::distributions::Open01;
use rand::Rng;
use rand_distr::{Distribution, Exp, Gamma, Poisson};
use serde::{Deserialize, Serialize};

use crate::grid::TimeGrid;
use crate::{ensure_positive, Result, ShotNoiseError};

/// A single pulse of the forcing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pulse {
    pub arrival_time: f64,
    pub amplitude: f64,
    pub duration: f64,
}

/// Pulses driving one realization, ordered by arrival time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forcing {
    pulses: Vec<Pulse>,
}

impl Forcing {
    pub fn new(mut pulses: Vec<Pulse>) -> Self {
        pulses.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        Self { pulses }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn arrival_times(&self) -> Vec<f64> {
        self.pulses.iter().map(|p| p.arrival_time).collect()
    }

    pub fn amplitudes(&self) -> Vec<f64> {
        self.pulses.iter().map(|p| p.amplitude).collect()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.pulses.iter().map(|p| p.duration).collect()
    }

    /// Differences between consecutive arrival times.
    pub fn waiting_times(&self) -> Vec<f64> {
        self.pulses
            .windows(2)
            .map(|pair| pair[1].arrival_time - pair[0].arrival_time)
            .collect()
    }

    /// Same arrivals and durations with every amplitude multiplied by `factor`.
    pub fn with_scaled_amplitudes(&self, factor: f64) -> Self {
        Self {
            pulses: self
                .pulses
                .iter()
                .map(|p| Pulse {
                    amplitude: p.amplitude * factor,
                    ..*p
                })
                .collect(),
        }
    }
}

/// How pulse arrival times are distributed on the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrivalProcess {
    /// Uniform arrivals. The pulse count is `floor(rate * T)`, or drawn from
    /// a Poisson distribution with that mean when `sample_count` is set.
    Poisson {
        #[serde(default)]
        sample_count: bool,
    },
    /// Renewal process with gamma distributed waiting times of shape `shape`
    /// and mean `1 / rate`, snapped to the grid.
    GammaRenewal { shape: f64 },
    /// One arrival every `1 / rate`, starting at zero, snapped to the grid.
    Periodic,
}

impl Default for ArrivalProcess {
    fn default() -> Self {
        ArrivalProcess::Poisson {
            sample_count: false,
        }
    }
}

/// Distribution of pulse amplitudes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmplitudeDistribution {
    Exponential { mean: f64 },
    /// Laplace distribution with scale `scale` and asymmetry `asymmetry`
    /// (kappa). A fraction `1 - kappa` of the amplitudes is positive.
    AsymmetricLaplace { scale: f64, asymmetry: f64 },
    Constant { value: f64 },
}

impl AmplitudeDistribution {
    /// Asymmetric Laplace amplitudes with unit variance.
    pub fn unit_variance_laplace(asymmetry: f64) -> Self {
        let kappa = asymmetry;
        AmplitudeDistribution::AsymmetricLaplace {
            scale: 1.0 / (1.0 - 2.0 * kappa * (1.0 - kappa)).sqrt(),
            asymmetry,
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            AmplitudeDistribution::Exponential { mean } => mean,
            AmplitudeDistribution::AsymmetricLaplace { scale, asymmetry } => {
                scale * (1.0 - 2.0 * asymmetry)
            }
            AmplitudeDistribution::Constant { value } => value,
        }
    }

    pub fn std_dev(&self) -> f64 {
        match *self {
            AmplitudeDistribution::Exponential { mean } => mean,
            AmplitudeDistribution::AsymmetricLaplace { scale, asymmetry } => {
                scale * (1.0 - 2.0 * asymmetry * (1.0 - asymmetry)).sqrt()
            }
            AmplitudeDistribution::Constant { .. } => 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            AmplitudeDistribution::Exponential { mean } => {
                ensure_positive("amplitude mean", mean)
            }
            AmplitudeDistribution::AsymmetricLaplace { scale, asymmetry } => {
                ensure_positive("laplace scale", scale)?;
                if !(0.0..=1.0).contains(&asymmetry) {
                    return Err(ShotNoiseError::InvalidParameter(format!(
                        "laplace asymmetry must be in [0, 1], got {asymmetry}"
                    )));
                }
                Ok(())
            }
            AmplitudeDistribution::Constant { value } => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(ShotNoiseError::InvalidParameter(
                        "constant amplitude must be finite".to_string(),
                    ))
                }
            }
        }
    }

    /// Draw `count` i.i.d. amplitudes.
    pub fn sample_n<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<f64>> {
        self.validate()?;
        let amplitudes = match *self {
            AmplitudeDistribution::Exponential { mean } => {
                let exp = Exp::new(1.0 / mean).map_err(|e| {
                    ShotNoiseError::InvalidParameter(format!("exponential amplitudes: {e}"))
                })?;
                (0..count).map(|_| exp.sample(rng)).collect()
            }
            AmplitudeDistribution::AsymmetricLaplace { scale, asymmetry } => (0..count)
                .map(|_| sample_asymmetric_laplace(scale, asymmetry, rng))
                .collect(),
            AmplitudeDistribution::Constant { value } => vec![value; count],
        };
        Ok(amplitudes)
    }
}

impl Default for AmplitudeDistribution {
    fn default() -> Self {
        AmplitudeDistribution::Exponential { mean: 1.0 }
    }
}

/// Inverse-CDF draw from the asymmetric Laplace distribution.
pub fn sample_asymmetric_laplace<R: Rng + ?Sized>(scale: f64, asymmetry: f64, rng: &mut R) -> f64 {
    let u: f64 = Open01.sample(rng);
    if u > asymmetry {
        -scale * (1.0 - asymmetry) * ((1.0 - u) / (1.0 - asymmetry)).ln()
    } else {
        scale * asymmetry * (u / asymmetry).ln()
    }
}

/// Distribution of pulse durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationDistribution {
    Constant { value: f64 },
    Exponential { mean: f64 },
}

impl DurationDistribution {
    pub fn mean(&self) -> f64 {
        match *self {
            DurationDistribution::Constant { value } => value,
            DurationDistribution::Exponential { mean } => mean,
        }
    }

    pub fn sample_n<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<f64>> {
        match *self {
            DurationDistribution::Constant { value } => {
                ensure_positive("pulse duration", value)?;
                Ok(vec![value; count])
            }
            DurationDistribution::Exponential { mean } => {
                ensure_positive("mean pulse duration", mean)?;
                let exp = Exp::new(1.0 / mean).map_err(|e| {
                    ShotNoiseError::InvalidParameter(format!("exponential durations: {e}"))
                })?;
                Ok((0..count).map(|_| exp.sample(rng)).collect())
            }
        }
    }
}

impl Default for DurationDistribution {
    fn default() -> Self {
        DurationDistribution::Constant { value: 1.0 }
    }
}

/// Draws forcings for a given grid and pulse rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForcingGenerator {
    #[serde(default)]
    pub arrivals: ArrivalProcess,
    #[serde(default)]
    pub amplitudes: AmplitudeDistribution,
    #[serde(default)]
    pub durations: DurationDistribution,
}

impl ForcingGenerator {
    pub fn new(
        arrivals: ArrivalProcess,
        amplitudes: AmplitudeDistribution,
        durations: DurationDistribution,
    ) -> Self {
        Self {
            arrivals,
            amplitudes,
            durations,
        }
    }

    pub fn with_arrivals(mut self, arrivals: ArrivalProcess) -> Self {
        self.arrivals = arrivals;
        self
    }

    pub fn with_amplitudes(mut self, amplitudes: AmplitudeDistribution) -> Self {
        self.amplitudes = amplitudes;
        self
    }

    pub fn with_durations(mut self, durations: DurationDistribution) -> Self {
        self.durations = durations;
        self
    }

    /// Generate a forcing on `grid` with pulse rate `rate` (inverse mean
    /// waiting time).
    ///
    /// The returned pulse count may be smaller than `rate * T` for renewal
    /// arrivals, whose overshooting arrivals are discarded.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        grid: &TimeGrid,
        rate: f64,
        rng: &mut R,
    ) -> Result<Forcing> {
        ensure_positive("rate", rate)?;
        self.amplitudes.validate()?;

        let arrival_times = match self.arrivals {
            ArrivalProcess::Poisson { sample_count } => {
                poisson_arrivals(grid, rate, sample_count, rng)?
            }
            ArrivalProcess::GammaRenewal { shape } => {
                gamma_renewal_arrivals(grid, rate, shape, rng)?
            }
            ArrivalProcess::Periodic => periodic_arrivals(grid, rate),
        };

        let count = arrival_times.len();
        let amplitudes = self.amplitudes.sample_n(count, rng)?;
        let durations = self.durations.sample_n(count, rng)?;

        let pulses = arrival_times
            .into_iter()
            .zip(amplitudes)
            .zip(durations)
            .map(|((arrival_time, amplitude), duration)| Pulse {
                arrival_time,
                amplitude,
                duration,
            })
            .collect();

        Ok(Forcing::new(pulses))
    }
}

fn poisson_arrivals<R: Rng + ?Sized>(
    grid: &TimeGrid,
    rate: f64,
    sample_count: bool,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let end = grid.end();
    let expected = rate * end;

    let count = if sample_count && expected > 0.0 {
        let poisson = Poisson::new(expected)
            .map_err(|e| ShotNoiseError::InvalidParameter(format!("pulse count: {e}")))?;
        let drawn: f64 = poisson.sample(rng);
        drawn as usize
    } else {
        expected.floor() as usize
    };

    if count == 0 || end <= 0.0 {
        return Ok(Vec::new());
    }

    let mut times: Vec<f64> = (0..count).map(|_| rng.gen_range(0.0..end)).collect();
    times.sort_by(|a, b| a.total_cmp(b));
    Ok(times)
}

/// Grid indices of a gamma renewal process started at index zero.
///
/// Arrivals rounding beyond the last grid index are dropped.
pub fn gamma_renewal_indices<R: Rng + ?Sized>(
    grid: &TimeGrid,
    rate: f64,
    shape: f64,
    rng: &mut R,
) -> Result<Vec<usize>> {
    ensure_positive("rate", rate)?;
    ensure_positive("gamma shape", shape)?;

    let requested = (grid.end() * rate).floor() as usize;
    if requested == 0 {
        return Ok(Vec::new());
    }

    let waiting = Gamma::new(shape, 1.0 / (rate * shape))
        .map_err(|e| ShotNoiseError::InvalidParameter(format!("gamma waiting times: {e}")))?;

    let dt = grid.dt();
    let last = grid.last_index() as f64;
    let mut cumulative = 0.0;
    let mut first: Option<f64> = None;
    let mut indices = Vec::with_capacity(requested);

    for _ in 0..requested {
        cumulative += waiting.sample(rng);
        let idx = (cumulative / dt).round();
        let origin = *first.get_or_insert(idx);
        let shifted = idx - origin;
        if shifted > last {
            break;
        }
        indices.push(shifted as usize);
    }

    let discarded = requested - indices.len();
    if discarded > 0 {
        tracing::debug!(
            requested,
            kept = indices.len(),
            discarded,
            "renewal arrivals beyond the grid were discarded"
        );
    }

    Ok(indices)
}

fn gamma_renewal_arrivals<R: Rng + ?Sized>(
    grid: &TimeGrid,
    rate: f64,
    shape: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let indices = gamma_renewal_indices(grid, rate, shape, rng)?;
    Ok(indices.into_iter().map(|i| grid.time_at(i)).collect())
}

fn periodic_arrivals(grid: &TimeGrid, rate: f64) -> Vec<f64> {
    let period = 1.0 / rate;
    let end = grid.end();
    if (end * rate).floor() < 1.0 {
        return Vec::new();
    }
    let mut times = Vec::new();
    let mut k = 0usize;
    loop {
        let t = k as f64 * period;
        if t > end {
            break;
        }
        times.push(grid.time_at(grid.index_of(t)));
        k += 1;
    }
    times
}

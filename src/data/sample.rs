//! Synthetic spectra from known circuit parameters.
//!
//! Used by `eis sample`, and by tests that need a spectrum with a known answer.

use num_complex::Complex64;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CIRCUIT_PARAMS, N_PARAMS, Spectrum};
use crate::error::{EngineError, EngineResult};
use crate::models::predict;

/// A plausible lithium-ion cell, in fit order.
pub const DEMO_PARAMS: [f64; N_PARAMS] = [0.02, 0.03, 0.005, 0.85, 0.06, 0.05, 0.75, 50.0, 80.0];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub params: [f64; N_PARAMS],
    pub f_min: f64,
    pub f_max: f64,
    pub points: usize,
    /// Relative standard deviation of Gaussian noise applied to `Re Z` and `Im Z`.
    pub noise: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            params: DEMO_PARAMS,
            f_min: 0.01,
            f_max: 1e5,
            points: 71,
            noise: 0.0,
            seed: 42,
        }
    }
}

/// `n` frequencies evenly spaced in `log10`, high to low (the usual sweep order).
pub fn log_spaced(f_min: f64, f_max: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![f_max];
    }
    let (a, b) = (f_max.log10(), f_min.log10());
    (0..n)
        .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n as f64 - 1.0)))
        .collect()
}

/// Evaluate the circuit on a log-spaced sweep and add seeded relative noise.
pub fn generate_spectrum(config: &SampleConfig) -> EngineResult<Spectrum> {
    if config.points == 0 {
        return Err(EngineError::invalid("sample point count must be > 0"));
    }
    if !(config.f_min.is_finite() && config.f_max.is_finite() && config.f_min > 0.0 && config.f_max > config.f_min) {
        return Err(EngineError::invalid(format!(
            "invalid frequency range [{}, {}]",
            config.f_min, config.f_max
        )));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(EngineError::invalid(format!("noise must be >= 0, got {}", config.noise)));
    }
    for (spec, &v) in CIRCUIT_PARAMS.iter().zip(config.params.iter()) {
        if !spec.contains(v) {
            return Err(EngineError::invalid(format!(
                "{} = {v} outside [{}, {}]",
                spec.id, spec.min, spec.max
            )));
        }
    }

    let frequencies = log_spaced(config.f_min, config.f_max, config.points);
    let mut impedances = predict(&config.params, &frequencies);

    if config.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let normal = Normal::new(0.0, config.noise)
            .map_err(|e| EngineError::invalid(format!("noise distribution error: {e}")))?;
        for z in &mut impedances {
            let re = z.re * (1.0 + normal.sample(&mut rng));
            let im = z.im * (1.0 + normal.sample(&mut rng));
            *z = Complex64::new(re, im);
        }
    }

    log::debug!(
        "generated {} samples over [{}, {}] Hz (noise={}, seed={})",
        frequencies.len(),
        config.f_min,
        config.f_max,
        config.noise,
        config.seed
    );
    Spectrum::new(frequencies, impedances)
}

/// Parse `--params`: exactly nine comma-separated numbers.
pub fn parse_params(raw: &str) -> EngineResult<[f64; N_PARAMS]> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| EngineError::invalid(format!("not a number in parameter list: '{}'", s.trim())))
        })
        .collect::<EngineResult<_>>()?;

    values
        .try_into()
        .map_err(|v: Vec<f64>| EngineError::invalid(format!("expected {N_PARAMS} parameters, got {}", v.len())))
}

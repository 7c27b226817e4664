//! Equivalent-circuit fitting for a single spectrum.
//!
//! Given:
//! - frequencies `f_i` and measured impedances `Z_i`
//! - a starting parameter vector (the fixed initial guess unless the caller supplies one)
//! - the static per-parameter bounds
//!
//! we minimize
//!
//! ```text
//! Σ (Re Z_model(ω_i) − Re Z_i)² + (Im Z_model(ω_i) − Im Z_i)²
//! ```
//!
//! by stacking the real differences above the imaginary ones into a `2N` real
//! residual vector and handing it to the bounded Levenberg–Marquardt solver.
//!
//! Resistances, CPE magnitudes and Warburg parameters span several decades, so the
//! solver works on `ln(p)` for those and on `p` itself for the CPE exponents. The
//! bounds are transformed the same way, which keeps the box constraints exact.

use crate::domain::{CIRCUIT_PARAMS, FitQuality, FitResult, N_PARAMS, Spectrum};
use crate::error::{EngineError, EngineResult};
use crate::math::{LmOptions, minimize};
use crate::models::predict;

/// Fixed starting point, in fit order.
pub const INITIAL_GUESS: [f64; N_PARAMS] = [0.01, 0.02, 0.01, 0.8, 0.05, 0.01, 0.8, 100.0, 100.0];

/// Minimum number of samples; fewer cannot determine nine parameters.
pub const MIN_SAMPLES: usize = N_PARAMS;

/// Options that affect how the circuit is calibrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Iteration cap for the solver. Reaching it is reported as a fit error.
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        let lm = LmOptions::default();
        Self {
            max_iterations: lm.max_iterations,
            ftol: lm.ftol,
            xtol: lm.xtol,
            gtol: lm.gtol,
        }
    }
}

impl FitOptions {
    fn lm_options(&self) -> LmOptions {
        LmOptions {
            max_iterations: self.max_iterations,
            ftol: self.ftol,
            xtol: self.xtol,
            gtol: self.gtol,
            ..LmOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coord {
    Log,
    Linear,
}

/// CPE exponents (`CPE1_1`, `CPE2_1`) live on a narrow linear range; everything else is a scale.
const COORDS: [Coord; N_PARAMS] = [
    Coord::Log,
    Coord::Log,
    Coord::Log,
    Coord::Linear,
    Coord::Log,
    Coord::Log,
    Coord::Linear,
    Coord::Log,
    Coord::Log,
];

fn to_solver(values: &[f64; N_PARAMS]) -> Vec<f64> {
    values
        .iter()
        .zip(COORDS.iter())
        .map(|(&v, coord)| match coord {
            Coord::Log => v.ln(),
            Coord::Linear => v,
        })
        .collect()
}

fn from_solver(u: &[f64]) -> [f64; N_PARAMS] {
    let mut out = [0.0; N_PARAMS];
    for (i, (&ui, coord)) in u.iter().zip(COORDS.iter()).enumerate() {
        out[i] = match coord {
            Coord::Log => ui.exp(),
            Coord::Linear => ui,
        };
    }
    out
}

fn solver_bounds() -> (Vec<f64>, Vec<f64>) {
    let lower: [f64; N_PARAMS] = std::array::from_fn(|i| CIRCUIT_PARAMS[i].min);
    let upper: [f64; N_PARAMS] = std::array::from_fn(|i| CIRCUIT_PARAMS[i].max);
    (to_solver(&lower), to_solver(&upper))
}

/// Stacked residual vector `[Re(model − data); Im(model − data)]`.
pub fn stacked_residuals(params: &[f64; N_PARAMS], spectrum: &Spectrum) -> Vec<f64> {
    let model = predict(params, spectrum.frequencies());
    let n = model.len();
    let mut out = vec![0.0; 2 * n];
    for (i, (zm, zd)) in model.iter().zip(spectrum.impedances()).enumerate() {
        let diff = zm - zd;
        out[i] = diff.re;
        out[n + i] = diff.im;
    }
    out
}

/// Fit the circuit from the fixed initial guess.
pub fn fit_circuit(spectrum: &Spectrum, opts: &FitOptions) -> EngineResult<FitResult> {
    fit_circuit_from(spectrum, &INITIAL_GUESS, opts)
}

/// Fit the circuit from a caller-supplied starting point.
///
/// The guess is clamped into the parameter bounds before solving.
pub fn fit_circuit_from(spectrum: &Spectrum, guess: &[f64], opts: &FitOptions) -> EngineResult<FitResult> {
    if guess.len() != N_PARAMS {
        return Err(EngineError::invalid(format!(
            "initial guess needs {N_PARAMS} values, got {}",
            guess.len()
        )));
    }
    if guess.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::invalid("initial guess must be finite"));
    }

    let n = spectrum.len();
    if n < MIN_SAMPLES {
        return Err(EngineError::fit(format!(
            "need at least {MIN_SAMPLES} samples to fit {N_PARAMS} parameters, got {n}"
        )));
    }

    let start: [f64; N_PARAMS] = std::array::from_fn(|i| CIRCUIT_PARAMS[i].clamp(guess[i]));
    let (lower, upper) = solver_bounds();

    log::debug!("fitting {} samples from guess {:?}", n, start);

    let residuals = |u: &[f64]| stacked_residuals(&from_solver(u), spectrum);
    let solution = minimize(residuals, &to_solver(&start), &lower, &upper, &opts.lm_options())
        .map_err(|e| EngineError::fit(e.to_string()))?;

    // exp(ln(bound)) can land one ulp outside the bound.
    let fitted = from_solver(&solution.x);
    let values: [f64; N_PARAMS] = std::array::from_fn(|i| CIRCUIT_PARAMS[i].clamp(fitted[i]));

    let sse: f64 = stacked_residuals(&values, spectrum).iter().map(|r| r * r).sum();
    if !sse.is_finite() {
        return Err(EngineError::fit("non-finite residuals at the fitted parameters"));
    }

    let quality = FitQuality {
        sse,
        rmse: (sse / (2 * n) as f64).sqrt(),
        iterations: solution.iterations,
        n_points: n,
    };

    log::info!(
        "circuit fit converged: sse={:.4e} rmse={:.4e} iterations={} evaluations={} ({:?})",
        quality.sse,
        quality.rmse,
        quality.iterations,
        solution.evaluations,
        solution.termination
    );
    log::debug!("solver sse before clamping: {:.6e}", solution.sse);

    Ok(FitResult { values, quality })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn log_spaced(f_min: f64, f_max: f64, n: usize) -> Vec<f64> {
        let (a, b) = (f_min.log10(), f_max.log10());
        (0..n)
            .map(|i| 10f64.powf(a + (b - a) * i as f64 / (n as f64 - 1.0)))
            .collect()
    }

    fn synthetic(params: &[f64; N_PARAMS], freqs: Vec<f64>) -> Spectrum {
        let z = predict(params, &freqs);
        Spectrum::new(freqs, z).unwrap()
    }

    #[test]
    fn coordinate_transform_round_trips() {
        let u = to_solver(&INITIAL_GUESS);
        let back = from_solver(&u);
        for (a, b) in back.iter().zip(INITIAL_GUESS.iter()) {
            assert!((a - b).abs() <= 1e-12 * b.abs());
        }
    }

    #[test]
    fn residuals_vanish_at_the_generating_parameters() {
        let spectrum = synthetic(&INITIAL_GUESS, log_spaced(0.1, 1e4, 20));
        let r = stacked_residuals(&INITIAL_GUESS, &spectrum);
        assert_eq!(r.len(), 40);
        assert!(r.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn too_few_samples_is_a_fit_error() {
        let spectrum = synthetic(&INITIAL_GUESS, log_spaced(1.0, 100.0, 5));
        let err = fit_circuit(&spectrum, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Fit(_)));

        let err = fit_circuit(&Spectrum::empty(), &FitOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Fit(_)));
    }

    #[test]
    fn wrong_guess_length_is_invalid_input() {
        let spectrum = synthetic(&INITIAL_GUESS, log_spaced(0.1, 1e4, 30));
        let err = fit_circuit_from(&spectrum, &[0.01, 0.02], &FitOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn fit_starting_at_the_truth_stays_there() {
        let spectrum = synthetic(&INITIAL_GUESS, log_spaced(0.01, 1e5, 50));
        let fit = fit_circuit(&spectrum, &FitOptions::default()).unwrap();
        for (i, (a, b)) in fit.values.iter().zip(INITIAL_GUESS.iter()).enumerate() {
            assert!((a - b).abs() <= 1e-6 * b.abs(), "{} = {a}, expected {b}", CIRCUIT_PARAMS[i].id);
        }
        assert!(fit.quality.sse < 1e-20);
    }

    #[test]
    fn fitted_values_stay_within_bounds_on_noisy_data() {
        // A plain resistor-like spectrum pushes several parameters onto their bounds.
        let freqs = log_spaced(0.1, 1e4, 30);
        let z: Vec<Complex64> = freqs
            .iter()
            .enumerate()
            .map(|(i, _)| Complex64::new(0.8 + 0.01 * (i % 3) as f64, -0.001 * (i % 2) as f64))
            .collect();
        let spectrum = Spectrum::new(freqs, z).unwrap();

        match fit_circuit(&spectrum, &FitOptions::default()) {
            Ok(fit) => {
                for (spec, v) in CIRCUIT_PARAMS.iter().zip(fit.values.iter()) {
                    assert!(spec.contains(*v), "{} = {v} outside [{}, {}]", spec.id, spec.min, spec.max);
                }
            }
            Err(e) => assert!(matches!(e, EngineError::Fit(_))),
        }
    }

    #[test]
    fn iteration_cap_surfaces_as_fit_error() {
        let truth = [0.02, 0.03, 0.005, 0.85, 0.06, 0.05, 0.75, 5.0, 10.0];
        let spectrum = synthetic(&truth, log_spaced(0.01, 1e5, 40));
        let opts = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let err = fit_circuit(&spectrum, &opts).unwrap_err();
        assert!(matches!(err, EngineError::Fit(_)));
    }
}

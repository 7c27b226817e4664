//! Box-constrained Levenberg–Marquardt for small nonlinear least-squares problems.
//!
//! We minimize `‖r(x)‖²` subject to `lower ≤ x ≤ upper`, where `r` maps `n`
//! parameters to `m ≥ n` residuals.
//!
//! Each iteration:
//! - builds a central-difference Jacobian (one-sided next to a bound)
//! - freezes parameters sitting on a bound whose gradient points outward
//! - solves the damped step `[J; √λ·D] δ = [−r; 0]` by SVD (Marquardt scaling `D`)
//! - projects `x + δ` back onto the box and accepts it if the gain ratio is positive
//!
//! Termination follows the MINPACK tests (relative reduction, relative step,
//! gradient/residual cosine). Hitting the iteration cap is an error, not a result.
//! The procedure is deterministic: identical inputs give identical outputs.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::math::solve_least_squares;

/// Relative finite-difference step, roughly `cbrt(f64::EPSILON)` for central differences.
const FD_STEP: f64 = 6e-6;

/// Minimum gain ratio for a step to be accepted.
const MIN_GAIN: f64 = 1e-4;

/// Damping limits; past `LAMBDA_MAX` no step can make progress.
const LAMBDA_MIN: f64 = 1e-20;
const LAMBDA_MAX: f64 = 1e30;

/// Rejected steps tolerated in a row before giving up on an iteration.
const MAX_REJECTIONS: usize = 64;

/// Solver options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    /// Maximum number of Jacobian evaluations.
    pub max_iterations: usize,
    /// Relative reduction tolerance on the sum of squares.
    pub ftol: f64,
    /// Relative step tolerance on the parameters.
    pub xtol: f64,
    /// Tolerance on the cosine between the residual and any Jacobian column.
    pub gtol: f64,
    /// Starting damping factor.
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

/// Why the solver stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ZeroResidual,
    SmallReduction,
    SmallStep,
    SmallGradient,
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub x: Vec<f64>,
    /// Final sum of squared residuals.
    pub sse: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LmError {
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
    #[error("residuals are not finite at the starting point")]
    NonFiniteStart,
    #[error("Jacobian is not finite at iteration {0}")]
    NonFiniteJacobian(usize),
    #[error("damped step could not be solved at iteration {0}")]
    SingularStep(usize),
    #[error("no convergence after {iterations} iterations (sse={sse:.3e})")]
    MaxIterations { iterations: usize, sse: f64 },
}

/// Minimize `‖f(x)‖²` within `[lower, upper]`, starting from `x0` (clamped into the box).
pub fn minimize<F>(
    f: F,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = x0.len();
    if n == 0 {
        return Err(LmError::InvalidProblem("no parameters".to_string()));
    }
    if lower.len() != n || upper.len() != n {
        return Err(LmError::InvalidProblem(format!(
            "bounds length mismatch: {} parameters, {} lower, {} upper",
            n,
            lower.len(),
            upper.len()
        )));
    }
    if lower.iter().zip(upper).any(|(lo, hi)| !(lo.is_finite() && hi.is_finite() && lo <= hi)) {
        return Err(LmError::InvalidProblem("bounds must be finite with lower <= upper".to_string()));
    }

    let mut x = project(x0, lower, upper);
    let mut r = f(&x);
    let mut evaluations = 1usize;
    if r.len() < n {
        return Err(LmError::InvalidProblem(format!(
            "{} residuals cannot determine {} parameters",
            r.len(),
            n
        )));
    }
    if !all_finite(&r) {
        return Err(LmError::NonFiniteStart);
    }

    let m = r.len();
    let mut sse = sum_sq(&r);
    if sse == 0.0 {
        return Ok(LmSolution {
            x,
            sse,
            iterations: 0,
            evaluations,
            termination: Termination::ZeroResidual,
        });
    }

    let mut lambda = opts.initial_lambda.max(LAMBDA_MIN);
    let mut nu = 2.0;
    let mut scale = vec![0.0_f64; n];

    for iter in 1..=opts.max_iterations {
        let jac = jacobian(&f, &x, &r, lower, upper);
        evaluations += 2 * n;
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(LmError::NonFiniteJacobian(iter));
        }

        let rv = DVector::from_column_slice(&r);
        let grad = jac.transpose() * &rv;

        let col_norms: Vec<f64> = (0..n).map(|j| jac.column(j).norm()).collect();
        for j in 0..n {
            scale[j] = scale[j].max(col_norms[j]);
        }

        let free: Vec<bool> = (0..n)
            .map(|j| {
                let pinned_low = x[j] <= lower[j] && grad[j] > 0.0;
                let pinned_high = x[j] >= upper[j] && grad[j] < 0.0;
                !(pinned_low || pinned_high)
            })
            .collect();

        // Largest cosine between the residual vector and a free Jacobian column.
        let r_norm = sse.sqrt();
        let g_cos = (0..n)
            .filter(|&j| free[j] && col_norms[j] > 0.0)
            .map(|j| grad[j].abs() / (col_norms[j] * r_norm))
            .fold(0.0_f64, f64::max);
        if g_cos <= opts.gtol {
            log::debug!("lm: gradient test met at iteration {iter} (cos={g_cos:.3e})");
            return Ok(LmSolution {
                x,
                sse,
                iterations: iter,
                evaluations,
                termination: Termination::SmallGradient,
            });
        }

        let x_norm = norm(&x);
        let mut rejections = 0usize;
        loop {
            let delta =
                damped_step(&jac, &rv, &scale, &free, lambda).ok_or(LmError::SingularStep(iter))?;

            let candidate: Vec<f64> = x.iter().zip(delta.iter()).map(|(xi, di)| xi + di).collect();
            let candidate = project(&candidate, lower, upper);
            let step: Vec<f64> = candidate.iter().zip(&x).map(|(c, xi)| c - xi).collect();
            let step_norm = norm(&step);

            let r_new = f(&candidate);
            evaluations += 1;
            let sse_new = if r_new.len() == m && all_finite(&r_new) {
                sum_sq(&r_new)
            } else {
                f64::INFINITY
            };

            // Linear model of the residual along the projected step.
            let linear = &rv + &jac * DVector::from_column_slice(&step);
            let predicted = sse - linear.norm_squared();
            let actual = sse - sse_new;

            if predicted > 0.0 && actual > 0.0 && actual / predicted > MIN_GAIN {
                let rho = actual / predicted;
                let sse_old = sse;
                x = candidate;
                r = r_new;
                sse = sse_new;
                lambda = (lambda * (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3))).max(LAMBDA_MIN);
                nu = 2.0;

                log::trace!("lm: iter={iter} sse={sse:.6e} lambda={lambda:.3e} rho={rho:.3}");

                let termination = if sse == 0.0 {
                    Some(Termination::ZeroResidual)
                } else if actual <= opts.ftol * sse_old && predicted <= opts.ftol * sse_old {
                    Some(Termination::SmallReduction)
                } else if step_norm <= opts.xtol * (x_norm + opts.xtol) {
                    Some(Termination::SmallStep)
                } else {
                    None
                };
                if let Some(termination) = termination {
                    return Ok(LmSolution {
                        x,
                        sse,
                        iterations: iter,
                        evaluations,
                        termination,
                    });
                }
                break;
            }

            lambda *= nu;
            nu *= 2.0;
            rejections += 1;

            if step_norm <= opts.xtol * (x_norm + opts.xtol)
                || lambda > LAMBDA_MAX
                || rejections >= MAX_REJECTIONS
            {
                log::debug!("lm: no further progress at iteration {iter} (sse={sse:.6e})");
                return Ok(LmSolution {
                    x,
                    sse,
                    iterations: iter,
                    evaluations,
                    termination: Termination::SmallStep,
                });
            }
        }
    }

    Err(LmError::MaxIterations {
        iterations: opts.max_iterations,
        sse,
    })
}

/// Solve `[J; √λ·D] δ = [−r; 0]`, with frozen parameters forced to `δ_j = 0`.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    scale: &[f64],
    free: &[bool],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + n, n);
    let mut b = DVector::<f64>::zeros(m + n);
    let sqrt_lambda = lambda.sqrt();

    for j in 0..n {
        if free[j] {
            for i in 0..m {
                a[(i, j)] = jac[(i, j)];
            }
            let d = if scale[j] > 0.0 { scale[j] } else { 1.0 };
            a[(m + j, j)] = sqrt_lambda * d;
        } else {
            a[(m + j, j)] = 1.0;
        }
    }
    for i in 0..m {
        b[i] = -r[i];
    }

    solve_least_squares(&a, &b)
}

fn jacobian<F>(f: &F, x: &[f64], r0: &[f64], lower: &[f64], upper: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = x.len();
    let m = r0.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut probe = x.to_vec();

    for j in 0..n {
        let h = FD_STEP * x[j].abs().max(1.0);
        let can_up = x[j] + h <= upper[j];
        let can_down = x[j] - h >= lower[j];

        let (r_hi, r_lo, width) = match (can_up, can_down) {
            (true, true) => {
                probe[j] = x[j] + h;
                let hi = f(&probe);
                probe[j] = x[j] - h;
                let lo = f(&probe);
                (hi, lo, 2.0 * h)
            }
            (true, false) => {
                probe[j] = x[j] + h;
                (f(&probe), r0.to_vec(), h)
            }
            (false, true) => {
                probe[j] = x[j] - h;
                (r0.to_vec(), f(&probe), h)
            }
            // The box is narrower than one step; leave the column at zero.
            (false, false) => {
                probe[j] = x[j];
                continue;
            }
        };
        probe[j] = x[j];

        if r_hi.len() != m || r_lo.len() != m {
            for i in 0..m {
                jac[(i, j)] = f64::NAN;
            }
            continue;
        }
        for i in 0..m {
            jac[(i, j)] = (r_hi[i] - r_lo[i]) / width;
        }
    }

    jac
}

fn project(x: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi))
        .collect()
}

fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

fn norm(v: &[f64]) -> f64 {
    sum_sq(v).sqrt()
}

fn all_finite(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite())
}

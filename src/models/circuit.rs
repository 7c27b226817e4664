//! Closed-form impedance of the fixed equivalent circuit `R0-p(R1,CPE1)-p(R2,CPE2)-Wo0`.
//!
//! The fitter relies on two primitive operations:
//! - evaluate `Z(ω)` for a parameter vector (for residuals)
//! - evaluate it over a whole spectrum (for residuals/plots)
//!
//! Element impedances are implemented as small, pure functions so they can be
//! tested on their own.

use std::f64::consts::FRAC_PI_2;

use num_complex::Complex64;

use crate::domain::N_PARAMS;

/// Below this `|s|` the Warburg ratio `tanh(s)/s` is evaluated from its series.
const WARBURG_SERIES_S: f64 = 1e-3;

/// Constant-phase element: `1 / (Q·(iω)^n)`.
pub fn cpe(q: f64, n: f64, omega: f64) -> Complex64 {
    let iw_n = Complex64::from_polar(omega.powf(n), n * FRAC_PI_2);
    (iw_n * q).inv()
}

/// Resistor in parallel with a CPE: `R / (1 + R·Q·(iω)^n)`.
///
/// Algebraically equal to `R·Z_cpe / (R + Z_cpe)` but stays finite as `ω → 0`.
pub fn parallel_r_cpe(r: f64, q: f64, n: f64, omega: f64) -> Complex64 {
    let iw_n = Complex64::from_polar(omega.powf(n), n * FRAC_PI_2);
    Complex64::new(r, 0.0) / (Complex64::new(1.0, 0.0) + iw_n * (r * q))
}

/// Bounded-diffusion Warburg element: `W · tanh(√(iωτ)) / √(iωτ)`.
pub fn warburg(w: f64, tau: f64, omega: f64) -> Complex64 {
    let s = Complex64::new(0.0, omega * tau).sqrt();
    if s.norm() < WARBURG_SERIES_S {
        // tanh(s)/s = 1 - s²/3 + 2s⁴/15 - ...
        let s2 = s * s;
        return (Complex64::new(1.0, 0.0) - s2 / 3.0 + s2 * s2 * (2.0 / 15.0)) * w;
    }
    stable_tanh(s) / s * w
}

/// `tanh` that does not overflow for large real parts.
///
/// `num_complex`'s `tanh` divides `sinh(2x)` by `cosh(2x)`, which is `inf/inf`
/// once `|x|` passes ~355. At high frequency `√(iωτ)` gets there easily.
fn stable_tanh(z: Complex64) -> Complex64 {
    if z.re < 0.0 {
        return -stable_tanh(-z);
    }
    let e = (z * -2.0).exp();
    (Complex64::new(1.0, 0.0) - e) / (Complex64::new(1.0, 0.0) + e)
}

/// Total modelled impedance at angular frequency `omega`.
///
/// `params` is in fit order: `R0, R1, CPE1_0, CPE1_1, R2, CPE2_0, CPE2_1, Wo0_0, Wo0_1`.
pub fn impedance(params: &[f64; N_PARAMS], omega: f64) -> Complex64 {
    let [r0, r1, q1, n1, r2, q2, n2, w, tau] = *params;
    Complex64::new(r0, 0.0)
        + parallel_r_cpe(r1, q1, n1, omega)
        + parallel_r_cpe(r2, q2, n2, omega)
        + warburg(w, tau, omega)
}

/// Evaluate the circuit at each frequency (Hz), preserving order.
pub fn predict(params: &[f64; N_PARAMS], frequencies: &[f64]) -> Vec<Complex64> {
    frequencies
        .iter()
        .map(|&f| impedance(params, 2.0 * std::f64::consts::PI * f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, b: Complex64, tol: f64) -> bool {
        (a - b).norm() <= tol * b.norm().max(1e-300)
    }

    #[test]
    fn cpe_with_unit_exponent_is_a_capacitor() {
        let (q, omega) = (0.01, 250.0);
        let expected = Complex64::new(0.0, -1.0 / (omega * q));
        assert!(close(cpe(q, 1.0, omega), expected, 1e-12));
    }

    #[test]
    fn parallel_block_matches_textbook_form() {
        let (r, q, n, omega) = (0.03, 0.005, 0.85, 1200.0);
        let z_cpe = cpe(q, n, omega);
        let zr = Complex64::new(r, 0.0);
        let expected = zr * z_cpe / (zr + z_cpe);
        assert!(close(parallel_r_cpe(r, q, n, omega), expected, 1e-12));
    }

    #[test]
    fn parallel_block_limits() {
        let low = parallel_r_cpe(0.05, 0.01, 0.8, 1e-9);
        assert!((low.re - 0.05).abs() < 1e-6 && low.im.abs() < 1e-6);
        let high = parallel_r_cpe(0.05, 0.01, 0.8, 1e12);
        assert!(high.norm() < 1e-6);
    }

    #[test]
    fn warburg_limits() {
        let (w, tau) = (50.0, 40.0);
        let dc = warburg(w, tau, 1e-12);
        assert!((dc.re - w).abs() < 1e-6, "dc limit should be W, got {dc}");

        // High frequency: tanh(s) → 1, so Z ≈ W / √(iωτ), a 45° line.
        let omega = 1e8;
        let z = warburg(w, tau, omega);
        let expected = Complex64::new(0.0, omega * tau).sqrt().inv() * w;
        assert!(z.re.is_finite() && z.im.is_finite());
        assert!(close(z, expected, 1e-9));
        assert!((z.re + z.im).abs() < 1e-9 * z.norm());
    }

    #[test]
    fn impedance_is_finite_across_the_bounds() {
        let lower = [0.001, 0.001, 1e-6, 0.5, 0.001, 1e-6, 0.5, 1.0, 1.0];
        let upper = [0.5, 0.5, 0.1, 1.0, 0.5, 0.1, 1.0, 1000.0, 1000.0];
        for params in [lower, upper] {
            for &f in &[1e-4, 1e-2, 1.0, 1e3, 1e6] {
                let z = impedance(&params, 2.0 * std::f64::consts::PI * f);
                assert!(z.re.is_finite() && z.im.is_finite(), "non-finite Z at f={f}");
            }
        }
    }

    #[test]
    fn high_frequency_tends_to_r0() {
        let params = [0.02, 0.03, 0.005, 0.85, 0.06, 0.05, 0.75, 5.0, 10.0];
        let z = predict(&params, &[1e12])[0];
        assert!((z.re - 0.02).abs() < 1e-3);
        assert!(z.im <= 0.0);
    }
}

//! State-of-Health scoring from the fitted bulk resistance.
//!
//! `SoH = clamp((1 − R0/rb_max)·100, 0, 100)`: a fresh cell with negligible `R0`
//! scores 100, a cell at or beyond the end-of-life resistance scores 0.

use crate::domain::{FitResult, SohResult};
use crate::error::{EngineError, EngineResult};

/// Clamped linear score. `rb_max` must be finite and positive (see `state_of_health`).
pub fn soh_percentage(rb_current: f64, rb_max: f64) -> f64 {
    ((1.0 - rb_current / rb_max) * 100.0).clamp(0.0, 100.0)
}

/// Score a fitted circuit against the end-of-life resistance `rb_max` (Ω).
pub fn state_of_health(fit: &FitResult, rb_max: f64) -> EngineResult<SohResult> {
    if !(rb_max.is_finite() && rb_max > 0.0) {
        return Err(EngineError::invalid(format!("rb_max must be a finite value > 0, got {rb_max}")));
    }

    let rb_current = fit.r0();
    let soh = SohResult {
        soh_percentage: soh_percentage(rb_current, rb_max),
        rb_current,
        rb_max,
    };
    log::debug!("SoH {:.2}% (R0={rb_current:.6} Ω, rb_max={rb_max} Ω)", soh.soh_percentage);
    Ok(soh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitQuality;
    use proptest::prelude::*;

    fn fit_with_r0(r0: f64) -> FitResult {
        FitResult {
            values: [r0, 0.03, 0.01, 0.8, 0.05, 0.01, 0.8, 100.0, 100.0],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                iterations: 0,
                n_points: 9,
            },
        }
    }

    #[test]
    fn linear_region_and_clamps() {
        assert_eq!(soh_percentage(0.0, 0.1), 100.0);
        assert!((soh_percentage(0.02, 0.1) - 80.0).abs() < 1e-9);
        assert_eq!(soh_percentage(0.1, 0.1), 0.0);
        assert_eq!(soh_percentage(0.3, 0.1), 0.0);
    }

    #[test]
    fn result_carries_inputs() {
        let soh = state_of_health(&fit_with_r0(0.025), 0.1).unwrap();
        assert_eq!(soh.rb_current, 0.025);
        assert_eq!(soh.rb_max, 0.1);
        assert!((soh.soh_percentage - 75.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_or_non_finite_rb_max_is_rejected() {
        for rb_max in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let err = state_of_health(&fit_with_r0(0.02), rb_max).unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)), "rb_max={rb_max}");
        }
    }

    proptest! {
        #[test]
        fn soh_is_bounded_and_non_increasing(
            rb_max in 1e-4f64..10.0,
            a in 0.0f64..20.0,
            b in 0.0f64..20.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let s_lo = soh_percentage(lo, rb_max);
            let s_hi = soh_percentage(hi, rb_max);
            prop_assert!((0.0..=100.0).contains(&s_lo));
            prop_assert!((0.0..=100.0).contains(&s_hi));
            prop_assert!(s_hi <= s_lo);
        }
    }
}

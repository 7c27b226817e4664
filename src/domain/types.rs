//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable (where it makes
//! sense) so they can be:
//!
//! - used in-memory during loading and fitting
//! - handed back to a surrounding service for persistence
//! - exported to JSON/CSV

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Fixed topology of the equivalent circuit, in the usual circuit-string notation.
pub const CIRCUIT_STRING: &str = "R0-p(R1,CPE1)-p(R2,CPE2)-Wo0";

/// Number of free parameters in the equivalent circuit.
pub const N_PARAMS: usize = 9;

/// A measured impedance spectrum.
///
/// Frequencies are in Hz, impedances in Ω. Sample order is the order the rows
/// appeared in the input; it is not sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    frequencies: Vec<f64>,
    impedances: Vec<Complex64>,
}

impl Spectrum {
    pub fn new(frequencies: Vec<f64>, impedances: Vec<Complex64>) -> EngineResult<Self> {
        if frequencies.len() != impedances.len() {
            return Err(EngineError::parse(format!(
                "frequency/impedance length mismatch: {} vs {}",
                frequencies.len(),
                impedances.len()
            )));
        }
        Ok(Self {
            frequencies,
            impedances,
        })
    }

    /// A present spectrum with no samples (e.g. everything was filtered out).
    pub fn empty() -> Self {
        Self {
            frequencies: Vec::new(),
            impedances: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn impedances(&self) -> &[Complex64] {
        &self.impedances
    }

    /// `ω = 2πf` for every sample.
    pub fn angular_frequencies(&self) -> Vec<f64> {
        self.frequencies
            .iter()
            .map(|f| 2.0 * std::f64::consts::PI * f)
            .collect()
    }

    pub fn real(&self) -> Vec<f64> {
        self.impedances.iter().map(|z| z.re).collect()
    }

    pub fn imag(&self) -> Vec<f64> {
        self.impedances.iter().map(|z| z.im).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, Complex64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.impedances.iter().copied())
    }

    /// Frequency range `(min, max)` or `None` when empty.
    pub fn frequency_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &f in &self.frequencies {
            lo = lo.min(f);
            hi = hi.max(f);
        }
        if lo.is_finite() && hi.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }
}

/// Static description of one equivalent-circuit parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Identifier in circuit-string notation (e.g. `CPE1_0`).
    pub id: &'static str,
    /// Friendly name shown to users (e.g. `R_SEI`).
    pub display_name: &'static str,
    pub unit: &'static str,
    pub explanation: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ParamSpec {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Parameter table in fit order: `R0, R1, CPE1_0, CPE1_1, R2, CPE2_0, CPE2_1, Wo0_0, Wo0_1`.
pub const CIRCUIT_PARAMS: [ParamSpec; N_PARAMS] = [
    ParamSpec {
        id: "R0",
        display_name: "Rb",
        unit: "Ω",
        explanation: "Electrolyte resistance",
        min: 0.001,
        max: 0.5,
    },
    ParamSpec {
        id: "R1",
        display_name: "R_SEI",
        unit: "Ω",
        explanation: "Resistance due to SEI layer",
        min: 0.001,
        max: 0.5,
    },
    ParamSpec {
        id: "CPE1_0",
        display_name: "CPE_SEI",
        unit: "F·s^(n-1)",
        explanation: "Capacitance due to SEI layer",
        min: 1e-6,
        max: 0.1,
    },
    ParamSpec {
        id: "CPE1_1",
        display_name: "CPE_SEI_n",
        unit: "",
        explanation: "SEI CPE exponent",
        min: 0.5,
        max: 1.0,
    },
    ParamSpec {
        id: "R2",
        display_name: "R_CT",
        unit: "Ω",
        explanation: "Charge-transfer resistance that models the voltage drop over the electrode-electrolyte interface due to a load",
        min: 0.001,
        max: 0.5,
    },
    ParamSpec {
        id: "CPE2_0",
        display_name: "CPE_DL",
        unit: "F·s^(n-1)",
        explanation: "Double-layer capacitance that models the effect of charges building up in the electrolyte at the electrode surface",
        min: 1e-6,
        max: 0.1,
    },
    ParamSpec {
        id: "CPE2_1",
        display_name: "CPE_DL_n",
        unit: "",
        explanation: "Double-layer CPE exponent",
        min: 0.5,
        max: 1.0,
    },
    ParamSpec {
        id: "Wo0_0",
        display_name: "W_Warburg",
        unit: "Ω·s^(-1/2)",
        explanation: "Frequency-dependent Warburg impedance models diffusion of lithium ions in the electrodes",
        min: 1.0,
        max: 1000.0,
    },
    ParamSpec {
        id: "Wo0_1",
        display_name: "W_tau",
        unit: "s",
        explanation: "Warburg time constant",
        min: 1.0,
        max: 1000.0,
    },
];

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared residuals over real and imaginary parts.
    pub sse: f64,
    /// `sqrt(sse / 2N)`.
    pub rmse: f64,
    pub iterations: usize,
    pub n_points: usize,
}

/// A successful equivalent-circuit fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub values: [f64; N_PARAMS],
    pub quality: FitQuality,
}

impl FitResult {
    /// Fitted bulk/electrolyte resistance `R0`.
    pub fn r0(&self) -> f64 {
        self.values[0]
    }

    pub fn circuit_string(&self) -> &'static str {
        CIRCUIT_STRING
    }

    /// Annotate the fitted values with the static parameter metadata.
    pub fn report(&self) -> FitReport {
        let parameters = CIRCUIT_PARAMS
            .iter()
            .zip(self.values.iter())
            .map(|(spec, &value)| FitParameter {
                name: spec.display_name.to_string(),
                value,
                unit: spec.unit.to_string(),
                explanation: spec.explanation.to_string(),
                min_value: spec.min,
                max_value: spec.max,
            })
            .collect();

        FitReport {
            parameters,
            circuit_string: CIRCUIT_STRING.to_string(),
        }
    }
}

/// One fitted parameter as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameter {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub explanation: String,
    pub min_value: f64,
    pub max_value: f64,
}

/// Caller-facing fit output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub parameters: Vec<FitParameter>,
    pub circuit_string: String,
}

/// Magnitude/phase view of a spectrum, one entry per sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BodeData {
    pub frequencies: Vec<f64>,
    pub magnitude: Vec<f64>,
    /// Phase in degrees.
    pub phase: Vec<f64>,
}

/// Nyquist view: `Re Z` against `-Im Z`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NyquistData {
    pub real: Vec<f64>,
    pub neg_imag: Vec<f64>,
}

/// State-of-Health score derived from the fitted `R0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SohResult {
    pub soh_percentage: f64,
    pub rb_current: f64,
    pub rb_max: f64,
}

/// How the loader mapped input columns to `(frequency, real, imag)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnStrategy {
    /// First header token was numeric: the file has no header row.
    Headerless,
    /// Every role matched a column name.
    Named,
    /// Columns 0, 1, 2 assumed after name matching failed.
    Positional,
}

/// Row accounting for a single load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub strategy: ColumnStrategy,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
}

/// Fitted circuit plus solver diagnostics, as written to report files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSection {
    #[serde(flatten)]
    pub report: FitReport,
    pub quality: FitQuality,
}

/// Portable JSON representation of one analysis run.
///
/// `fit` and `soh` are absent when the fit failed; the Bode table is still useful on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    /// RFC 3339 timestamp of the run.
    pub analyzed_at: String,
    pub source: String,
    pub n_points: usize,
    pub bode: BodeData,
    pub fit: Option<FitSection>,
    pub soh: Option<SohResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_rejects_length_mismatch() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![Complex64::new(1.0, -1.0)]).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn spectrum_accessors_keep_sample_order() {
        let s = Spectrum::new(
            vec![100.0, 1.0, 10.0],
            vec![Complex64::new(0.1, -0.2), Complex64::new(0.3, -0.4), Complex64::new(0.5, 0.6)],
        )
        .unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.real(), vec![0.1, 0.3, 0.5]);
        assert_eq!(s.imag(), vec![-0.2, -0.4, 0.6]);
        assert!((s.angular_frequencies()[1] - std::f64::consts::TAU).abs() < 1e-12);
        assert_eq!(s.frequency_range(), Some((1.0, 100.0)));
        assert_eq!(Spectrum::empty().frequency_range(), None);
    }

    #[test]
    fn param_table_is_ordered_and_bounded() {
        let ids: Vec<&str> = CIRCUIT_PARAMS.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            ["R0", "R1", "CPE1_0", "CPE1_1", "R2", "CPE2_0", "CPE2_1", "Wo0_0", "Wo0_1"]
        );
        for p in &CIRCUIT_PARAMS {
            assert!(p.min < p.max, "{} has an empty range", p.id);
        }
    }

    #[test]
    fn report_uses_display_names_and_circuit_string() {
        let fit = FitResult {
            values: [0.02, 0.03, 0.01, 0.8, 0.05, 0.01, 0.8, 100.0, 100.0],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                iterations: 1,
                n_points: 10,
            },
        };
        let report = fit.report();
        assert_eq!(report.circuit_string, "R0-p(R1,CPE1)-p(R2,CPE2)-Wo0");
        assert_eq!(report.parameters.len(), N_PARAMS);
        assert_eq!(report.parameters[0].name, "Rb");
        assert_eq!(report.parameters[0].unit, "Ω");
        assert!((report.parameters[0].value - 0.02).abs() < 1e-15);
        assert_eq!(report.parameters[8].max_value, 1000.0);
        assert_eq!(fit.circuit_string(), report.circuit_string);
    }
}

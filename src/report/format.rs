//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use std::path::Path;

use crate::app::pipeline::AnalysisRun;
use crate::domain::{FitReport, SohResult};
use crate::error::AppError;

/// Format the full run summary (dataset stats + fit diagnostics + parameters + SoH).
pub fn format_run_summary(run: &AnalysisRun) -> String {
    let mut out = String::new();

    out.push_str("=== eis - Impedance Analysis ===\n");
    out.push_str(&format!("Source: {}\n", run.source));
    out.push_str(&format!(
        "Rows: read={} used={} dropped={} | columns={:?}\n",
        run.stats.rows_read, run.stats.rows_used, run.stats.rows_dropped, run.stats.strategy
    ));
    match run.spectrum.frequency_range() {
        Some((f_min, f_max)) => out.push_str(&format!(
            "Points: n={} | f=[{}, {}] Hz\n",
            run.spectrum.len(),
            fmt_value(f_min),
            fmt_value(f_max)
        )),
        None => out.push_str(&format!("Points: n={}\n", run.spectrum.len())),
    }

    let q = &run.fit.quality;
    out.push_str("\nFit diagnostics:\n");
    out.push_str(&format!(
        "  SSE={:.4e} RMSE={:.4e}Ω iterations={}\n",
        q.sse, q.rmse, q.iterations
    ));

    let report = run.fit.report();
    out.push_str(&format!("\nCircuit: {}\n", report.circuit_string));
    out.push_str(&format_parameter_table(&report));

    out.push('\n');
    out.push_str(&format_soh(&run.soh));
    out.push('\n');

    out
}

/// Format the fitted parameters as a fixed-width table.
pub fn format_parameter_table(report: &FitReport) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>12} {:<12} {:>21} {:<32}\n",
            "name", "value", "unit", "bounds", "explanation"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<21} {:-<32}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for p in &report.parameters {
        let bounds = format!("[{}, {}]", fmt_value(p.min_value), fmt_value(p.max_value));
        out.push_str(
            format!(
                "{:<10} {:>12} {:<12} {:>21} {:<32}\n",
                truncate(&p.name, 10),
                fmt_value(p.value),
                truncate(&p.unit, 12),
                bounds,
                truncate(&p.explanation, 32),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

pub fn format_soh(soh: &SohResult) -> String {
    format!(
        "SoH: {:.1}% (Rb={} Ω, Rb_max={} Ω)",
        soh.soh_percentage,
        fmt_value(soh.rb_current),
        fmt_value(soh.rb_max)
    )
}

/// One line per file for `eis batch`.
pub fn format_batch_line(path: &Path, result: &Result<AnalysisRun, AppError>) -> String {
    match result {
        Ok(run) => format!(
            "{}: n={} Rb={} Ω SoH={:.1}% RMSE={:.3e}",
            path.display(),
            run.spectrum.len(),
            fmt_value(run.soh.rb_current),
            run.soh.soh_percentage,
            run.fit.quality.rmse
        ),
        Err(err) => format!("{}: error: {err}", path.display()),
    }
}

/// Plain decimals for moderate magnitudes, scientific notation otherwise.
fn fmt_value(v: f64) -> String {
    let a = v.abs();
    if a == 0.0 || (1e-3..1e4).contains(&a) {
        format!("{v:.6}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        format!("{v:.4e}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

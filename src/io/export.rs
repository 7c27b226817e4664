//! Export analysis results to JSON and CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitResult, FitSection, ReportFile, SohResult, Spectrum};
use crate::error::AppError;
use crate::models::predict;
use crate::report::bode;

/// Assemble the JSON report for one run, stamped with the current UTC time.
pub fn build_report(source: &str, spectrum: &Spectrum, fit: Option<&FitResult>, soh: Option<SohResult>) -> ReportFile {
    ReportFile {
        tool: "eis".to_string(),
        analyzed_at: chrono::Utc::now().to_rfc3339(),
        source: source.to_string(),
        n_points: spectrum.len(),
        bode: bode(spectrum),
        fit: fit.map(|f| FitSection {
            report: f.report(),
            quality: f.quality,
        }),
        soh,
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Write the per-sample table: measured impedance, Bode view, and the fitted model when present.
pub fn write_spectrum_csv(path: &Path, spectrum: &Spectrum, fit: Option<&FitResult>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["frequency_hz", "z_real", "z_imag", "magnitude", "phase_deg"];
    if fit.is_some() {
        header.extend(["fit_real", "fit_imag"]);
    }
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let table = bode(spectrum);
    let model = fit.map(|f| predict(&f.values, spectrum.frequencies()));

    for (i, (f, z)) in spectrum.iter().enumerate() {
        let mut row = vec![
            format!("{f}"),
            format!("{:.10e}", z.re),
            format!("{:.10e}", z.im),
            format!("{:.10e}", table.magnitude[i]),
            format!("{:.6}", table.phase[i]),
        ];
        if let Some(model) = &model {
            row.push(format!("{:.10e}", model[i].re));
            row.push(format!("{:.10e}", model[i].im));
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

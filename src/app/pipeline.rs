//! Shared "analysis pipeline" logic used by the `analyze` and `batch` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> Bode transform -> circuit fit -> SoH
//!
//! The commands can then focus on presentation (summary vs one-liners, plots, exports).

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::domain::{BodeData, FitResult, LoadStats, SohResult, Spectrum};
use crate::error::{AppError, EngineError};
use crate::session::AnalysisSession;

/// All computed outputs of a single analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub source: String,
    pub stats: LoadStats,
    pub spectrum: Spectrum,
    pub bode: BodeData,
    pub fit: FitResult,
    pub soh: SohResult,
}

/// A run that got as far as loading but failed to fit.
///
/// The spectrum is kept so the caller can still export the Bode table.
#[derive(Debug)]
pub struct FailedRun {
    pub spectrum: Option<Spectrum>,
    pub error: AppError,
}

impl From<AppError> for FailedRun {
    fn from(error: AppError) -> Self {
        Self { spectrum: None, error }
    }
}

/// Run the full analysis over raw CSV bytes.
pub fn run_analysis_bytes(source: &str, raw: &[u8], config: &EngineConfig) -> Result<AnalysisRun, FailedRun> {
    let mut session = AnalysisSession::with_config(*config);

    // 1) Load and normalize.
    let spectrum = session.load_spectrum(raw).map_err(AppError::from)?.clone();
    let stats = session.load_stats().copied().ok_or(EngineError::NotLoaded).map_err(AppError::from)?;

    // 2) Frequency-domain view.
    let bode = session.bode_plot().map_err(AppError::from)?;

    // 3) Fit; keep the spectrum on failure.
    if let Err(err) = session.fit_circuit() {
        return Err(FailedRun {
            spectrum: Some(spectrum),
            error: err.into(),
        });
    }
    let fit = session.fit_result().cloned().ok_or(EngineError::NotFitted).map_err(AppError::from)?;

    // 4) Score.
    let soh = session.calculate_default_soh().map_err(AppError::from)?;

    Ok(AnalysisRun {
        source: source.to_string(),
        stats,
        spectrum,
        bode,
        fit,
        soh,
    })
}

/// Read a file and run the full analysis.
pub fn run_analysis(path: &Path, config: &EngineConfig) -> Result<AnalysisRun, FailedRun> {
    let raw = std::fs::read(path)
        .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))?;
    log::info!("analyzing {} ({} bytes)", path.display(), raw.len());
    run_analysis_bytes(&path.display().to_string(), &raw, config)
}

/// Analyze many files in parallel; results come back in input order.
pub fn run_batch(paths: &[PathBuf], config: &EngineConfig) -> Vec<(PathBuf, Result<AnalysisRun, AppError>)> {
    paths
        .par_iter()
        .map(|path| {
            let result = run_analysis(path, config).map_err(|failed| failed.error);
            (path.clone(), result)
        })
        .collect()
}

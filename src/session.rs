//! Analysis session: the current spectrum and the current fit.
//!
//! A session holds at most one spectrum and at most one fit result. Loading a new
//! spectrum discards the fit; a failed load or a failed fit leaves the session as
//! it was. The API takes `&mut self` and does no locking, so a surrounding service
//! keeps one session per cell (or per request) and serializes access itself.

use crate::config::EngineConfig;
use crate::domain::{BodeData, FitReport, FitResult, LoadStats, NyquistData, SohResult, Spectrum};
use crate::error::{EngineError, EngineResult};
use crate::fit::{fit_circuit, fit_circuit_from};
use crate::io::ingest::load_spectrum;
use crate::report::{bode, nyquist, state_of_health};

#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    config: EngineConfig,
    spectrum: Option<Spectrum>,
    load_stats: Option<LoadStats>,
    fit: Option<FitResult>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse raw CSV bytes and install the result as the current spectrum.
    pub fn load_spectrum(&mut self, raw: &[u8]) -> EngineResult<&Spectrum> {
        let loaded = load_spectrum(raw, &self.config.loader)?;
        if self.fit.take().is_some() {
            log::debug!("new spectrum loaded; previous fit discarded");
        }
        self.load_stats = Some(loaded.stats);
        Ok(self.spectrum.insert(loaded.spectrum))
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn load_stats(&self) -> Option<&LoadStats> {
        self.load_stats.as_ref()
    }

    pub fn fit_result(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    pub fn bode_plot(&self) -> EngineResult<BodeData> {
        Ok(bode(self.loaded()?))
    }

    pub fn nyquist_plot(&self) -> EngineResult<NyquistData> {
        Ok(nyquist(self.loaded()?))
    }

    /// Fit the equivalent circuit to the current spectrum from the fixed initial guess.
    pub fn fit_circuit(&mut self) -> EngineResult<FitReport> {
        let fit = fit_circuit(self.loaded()?, &self.config.fit)?;
        Ok(self.fit.insert(fit).report())
    }

    /// Fit from a caller-supplied starting point (clamped into the bounds).
    pub fn fit_circuit_with_guess(&mut self, guess: &[f64]) -> EngineResult<FitReport> {
        let fit = fit_circuit_from(self.loaded()?, guess, &self.config.fit)?;
        Ok(self.fit.insert(fit).report())
    }

    /// Score the current fit against the end-of-life resistance `rb_max` (Ω).
    pub fn calculate_soh(&self, rb_max: f64) -> EngineResult<SohResult> {
        let fit = self.fit.as_ref().ok_or(EngineError::NotFitted)?;
        state_of_health(fit, rb_max)
    }

    /// `calculate_soh` with the configured `rb_max`.
    pub fn calculate_default_soh(&self) -> EngineResult<SohResult> {
        self.calculate_soh(self.config.rb_max)
    }

    fn loaded(&self) -> EngineResult<&Spectrum> {
        self.spectrum.as_ref().ok_or(EngineError::NotLoaded)
    }
}

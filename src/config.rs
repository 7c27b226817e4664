//! Engine configuration.
//!
//! Defaults cover the common case. A service (or the CLI) can override them from
//! the environment, optionally seeded from a `.env` file:
//!
//! | variable | field | default |
//! |----------|-------|---------|
//! | `EIS_MIN_FREQUENCY` | `loader.min_frequency` | `0.0` Hz |
//! | `EIS_DROP_INDUCTIVE` | `loader.drop_inductive` | `true` |
//! | `EIS_MAX_ITERATIONS` | `fit.max_iterations` | `1000` |
//! | `EIS_RB_MAX` | `rb_max` | `0.1` Ω |

use crate::error::{EngineError, EngineResult};
use crate::fit::FitOptions;
use crate::io::ingest::LoaderOptions;

/// Bulk resistance (Ω) treated as end of life when the caller does not supply one.
pub const DEFAULT_RB_MAX: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub loader: LoaderOptions,
    pub fit: FitOptions,
    pub rb_max: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loader: LoaderOptions::default(),
            fit: FitOptions::default(),
            rb_max: DEFAULT_RB_MAX,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `EIS_*` variables from the process environment (and `.env`).
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `EIS_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("EIS_MIN_FREQUENCY") {
            let v = parse_f64("EIS_MIN_FREQUENCY", &raw)?;
            if v < 0.0 {
                return Err(EngineError::invalid(format!("EIS_MIN_FREQUENCY must be >= 0, got {v}")));
            }
            config.loader.min_frequency = v;
        }
        if let Some(raw) = lookup("EIS_DROP_INDUCTIVE") {
            config.loader.drop_inductive = parse_bool("EIS_DROP_INDUCTIVE", &raw)?;
        }
        if let Some(raw) = lookup("EIS_MAX_ITERATIONS") {
            let v: usize = raw
                .trim()
                .parse()
                .map_err(|_| EngineError::invalid(format!("EIS_MAX_ITERATIONS is not an integer: '{raw}'")))?;
            if v == 0 {
                return Err(EngineError::invalid("EIS_MAX_ITERATIONS must be > 0"));
            }
            config.fit.max_iterations = v;
        }
        if let Some(raw) = lookup("EIS_RB_MAX") {
            let v = parse_f64("EIS_RB_MAX", &raw)?;
            if v <= 0.0 {
                return Err(EngineError::invalid(format!("EIS_RB_MAX must be > 0, got {v}")));
            }
            config.rb_max = v;
        }

        log::debug!("engine config: {config:?}");
        Ok(config)
    }
}

fn parse_f64(key: &str, raw: &str) -> EngineResult<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(EngineError::invalid(format!("{key} is not a finite number: '{raw}'"))),
    }
}

fn parse_bool(key: &str, raw: &str) -> EngineResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(EngineError::invalid(format!("{key} is not a boolean: '{raw}'"))),
    }
}

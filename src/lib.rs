//! `eis-health` library crate.
//!
//! Impedance analysis for battery cells: load an EIS spectrum, view it in the
//! frequency domain, fit the `R0-p(R1,CPE1)-p(R2,CPE2)-Wo0` equivalent circuit,
//! and score State-of-Health from the fitted bulk resistance.
//!
//! The binary (`eis`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - a surrounding service can hold an [`session::AnalysisSession`] per cell directly

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod session;

pub use config::EngineConfig;
pub use domain::{BodeData, FitReport, FitResult, NyquistData, SohResult, Spectrum};
pub use error::{AppError, EngineError, EngineResult};
pub use session::AnalysisSession;

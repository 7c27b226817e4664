//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the canonical impedance `Spectrum`
//! - the static equivalent-circuit parameter table (`CIRCUIT_PARAMS`)
//! - fit, Bode/Nyquist and State-of-Health outputs

pub mod types;

pub use types::*;

//! Equivalent-circuit fitting.
//!
//! Responsibilities:
//!
//! - map the circuit parameters to solver coordinates and bounds
//! - build the stacked real/imaginary residual vector
//! - run the bounded solver and annotate the outcome with fit diagnostics

pub mod fitter;

pub use fitter::*;

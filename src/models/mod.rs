//! Equivalent-circuit model implementation.
//!
//! The model is implemented as small, pure functions so that fitting code can
//! stay generic over the parameter vector.

pub mod circuit;

pub use circuit::*;

//! Reporting: frequency-domain views, State-of-Health scoring, and terminal formatting.

pub mod bode;
pub mod format;
pub mod soh;

pub use bode::{bode, nyquist};
pub use format::*;
pub use soh::{soh_percentage, state_of_health};

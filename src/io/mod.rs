//! Input/output helpers.
//!
//! - CSV spectrum ingest + column resolution (`ingest`)
//! - report exports (JSON/CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;

//! Command-line parsing for the EIS battery health analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "eis", version, about = "EIS battery impedance analyzer (equivalent-circuit fit + SoH)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a spectrum CSV, fit the circuit, score SoH, and optionally plot/export.
    Analyze(AnalyzeArgs),
    /// Analyze many CSV files in parallel, one summary line each.
    Batch(BatchArgs),
    /// Write a synthetic spectrum CSV from known circuit parameters.
    Sample(SampleArgs),
}

/// Which terminal plot(s) to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotKind {
    Bode,
    Nyquist,
    Both,
}

/// Loader and solver overrides shared by `analyze` and `batch`.
///
/// Unset flags fall back to `EIS_*` environment variables, then to built-in defaults.
#[derive(Debug, Parser, Clone)]
pub struct EngineArgs {
    /// End-of-life bulk resistance Rb_max (Ω) used for the SoH score.
    #[arg(long)]
    pub rb_max: Option<f64>,

    /// Drop samples at or below this frequency (Hz).
    #[arg(long)]
    pub min_frequency: Option<f64>,

    /// Keep inductive samples (Im Z >= 0) instead of dropping them.
    #[arg(long)]
    pub keep_inductive: bool,

    /// Solver iteration cap.
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Spectrum CSV (frequency, real, imaginary).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Plot(s) to render in the terminal.
    #[arg(long, value_enum, default_value_t = PlotKind::Both)]
    pub plot: PlotKind,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the analysis report (Bode table, fit, SoH) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export the per-sample table (measured, Bode, fitted) to CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct BatchArgs {
    /// Spectrum CSV files.
    #[arg(value_name = "CSV", required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,

    /// Number of frequencies (log-spaced).
    #[arg(long, default_value_t = 71)]
    pub points: usize,

    /// Lowest frequency (Hz).
    #[arg(long, default_value_t = 0.01)]
    pub f_min: f64,

    /// Highest frequency (Hz).
    #[arg(long, default_value_t = 1e5)]
    pub f_max: f64,

    /// Relative Gaussian noise on Re Z and Im Z (0 = exact model values).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Nine comma-separated circuit parameters in fit order (R0,R1,CPE1_0,CPE1_1,R2,CPE2_0,CPE2_1,Wo0_0,Wo0_1).
    #[arg(long)]
    pub params: Option<String>,
}

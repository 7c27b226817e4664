//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves engine configuration (flags over `EIS_*` environment over defaults)
//! - runs the analysis pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, BatchArgs, Command, EngineArgs, PlotKind, SampleArgs};
use crate::config::EngineConfig;
use crate::data::{SampleConfig, generate_spectrum, parse_params};
use crate::error::{AppError, EngineError};

pub mod pipeline;

/// Entry point for the `eis` binary.
pub fn run() -> Result<(), AppError> {
    // `eis cell.csv` is shorthand for `eis analyze cell.csv`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Batch(args) => handle_batch(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = engine_config_from_args(&args.engine)?;

    let run = match pipeline::run_analysis(&args.input, &config) {
        Ok(run) => run,
        Err(failed) => {
            // Still hand back the Bode table when only the fit failed.
            if let (Some(path), Some(spectrum)) = (&args.export_json, &failed.spectrum) {
                let source = args.input.display().to_string();
                let report = crate::io::build_report(&source, spectrum, None, None);
                crate::io::write_report_json(path, &report)?;
            }
            return Err(failed.error);
        }
    };

    println!("{}", crate::report::format_run_summary(&run));

    if !args.no_plot {
        if matches!(args.plot, PlotKind::Bode | PlotKind::Both) {
            println!(
                "{}",
                crate::plot::render_bode_plot(&run.spectrum, Some(&run.fit), args.width, args.height)
            );
        }
        if matches!(args.plot, PlotKind::Nyquist | PlotKind::Both) {
            println!(
                "{}",
                crate::plot::render_nyquist_plot(&run.spectrum, Some(&run.fit), args.width, args.height)
            );
        }
    }

    // Optional exports.
    if let Some(path) = &args.export_json {
        let report = crate::io::build_report(&run.source, &run.spectrum, Some(&run.fit), Some(run.soh));
        crate::io::write_report_json(path, &report)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::write_spectrum_csv(path, &run.spectrum, Some(&run.fit))?;
    }

    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = engine_config_from_args(&args.engine)?;
    let results = pipeline::run_batch(&args.inputs, &config);

    let mut first_error: Option<u8> = None;
    for (path, result) in &results {
        println!("{}", crate::report::format_batch_line(path, result));
        if let Err(err) = result {
            first_error.get_or_insert(err.exit_code());
        }
    }

    match first_error {
        None => Ok(()),
        Some(code) => {
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            Err(AppError::new(
                code,
                format!("{failed} of {} files failed", results.len()),
            ))
        }
    }
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let mut config = SampleConfig {
        f_min: args.f_min,
        f_max: args.f_max,
        points: args.points,
        noise: args.noise,
        seed: args.seed,
        ..SampleConfig::default()
    };
    if let Some(raw) = &args.params {
        config.params = parse_params(raw)?;
    }

    let spectrum = generate_spectrum(&config)?;
    crate::io::write_spectrum_csv(&args.out, &spectrum, None)?;
    println!("Wrote {} samples to {}", spectrum.len(), args.out.display());
    Ok(())
}

/// Environment/`.env` configuration with command-line overrides applied.
pub fn engine_config_from_args(args: &EngineArgs) -> Result<EngineConfig, AppError> {
    let base = EngineConfig::from_env()?;
    apply_overrides(base, args).map_err(AppError::from)
}

fn apply_overrides(mut config: EngineConfig, args: &EngineArgs) -> Result<EngineConfig, EngineError> {
    if let Some(rb_max) = args.rb_max {
        if !(rb_max.is_finite() && rb_max > 0.0) {
            return Err(EngineError::invalid(format!("--rb-max must be > 0, got {rb_max}")));
        }
        config.rb_max = rb_max;
    }
    if let Some(f) = args.min_frequency {
        if !(f.is_finite() && f >= 0.0) {
            return Err(EngineError::invalid(format!("--min-frequency must be >= 0, got {f}")));
        }
        config.loader.min_frequency = f;
    }
    if args.keep_inductive {
        config.loader.drop_inductive = false;
    }
    if let Some(n) = args.max_iterations {
        if n == 0 {
            return Err(EngineError::invalid("--max-iterations must be > 0"));
        }
        config.fit.max_iterations = n;
    }
    Ok(config)
}

/// Rewrite argv so a bare CSV path defaults to `analyze`.
///
/// Rules:
/// - `eis`                      -> unchanged (clap prints usage)
/// - `eis cell.csv ...`         -> `eis analyze cell.csv ...`
/// - `eis --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "analyze" | "batch" | "sample");
    if is_subcommand {
        return argv;
    }

    // Anything that isn't a flag is taken as the input file.
    if !arg1.starts_with('-') {
        argv.insert(1, "analyze".to_string());
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_path_becomes_analyze() {
        assert_eq!(
            rewrite_args(argv(&["eis", "cell.csv", "--no-plot"])),
            argv(&["eis", "analyze", "cell.csv", "--no-plot"])
        );
        assert_eq!(rewrite_args(argv(&["eis", "batch", "a.csv"])), argv(&["eis", "batch", "a.csv"]));
        assert_eq!(rewrite_args(argv(&["eis", "--help"])), argv(&["eis", "--help"]));
        assert_eq!(rewrite_args(argv(&["eis"])), argv(&["eis"]));
    }

    #[test]
    fn flags_override_config() {
        let args = EngineArgs {
            rb_max: Some(0.2),
            min_frequency: Some(0.05),
            keep_inductive: true,
            max_iterations: Some(50),
        };
        let config = apply_overrides(EngineConfig::default(), &args).unwrap();
        assert_eq!(config.rb_max, 0.2);
        assert_eq!(config.loader.min_frequency, 0.05);
        assert!(!config.loader.drop_inductive);
        assert_eq!(config.fit.max_iterations, 50);
    }

    #[test]
    fn unset_flags_keep_config() {
        let args = EngineArgs {
            rb_max: None,
            min_frequency: None,
            keep_inductive: false,
            max_iterations: None,
        };
        let base = EngineConfig {
            rb_max: 0.07,
            ..EngineConfig::default()
        };
        assert_eq!(apply_overrides(base, &args).unwrap(), base);
    }

    #[test]
    fn bad_flags_are_invalid_input() {
        let args = EngineArgs {
            rb_max: Some(-1.0),
            min_frequency: None,
            keep_inductive: false,
            max_iterations: None,
        };
        let err = apply_overrides(EngineConfig::default(), &args).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}

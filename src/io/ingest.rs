//! CSV ingest and normalization.
//!
//! This module is responsible for turning a raw impedance export (bytes) into a
//! clean `Spectrum` that is safe to transform and fit.
//!
//! Design goals:
//! - **Tolerant column detection**: headerless files, named headers in any order,
//!   and a positional last resort
//! - **Strict values**: a cell that is not a number is an error, not a silent skip
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use csv::StringRecord;
use num_complex::Complex64;

use crate::domain::{ColumnStrategy, LoadStats, Spectrum};
use crate::error::{EngineError, EngineResult};

/// Options for sample filtering after parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderOptions {
    /// Samples at or below this frequency (Hz) are dropped. Negative values act as `0`.
    pub min_frequency: f64,
    /// Drop samples with `Im(Z) >= 0` (inductive tail above the Nyquist axis).
    /// The circuit cannot produce them, so this is on unless turned off.
    pub drop_inductive: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            min_frequency: 0.0,
            drop_inductive: true,
        }
    }
}

/// Ingest output: normalized spectrum + row accounting.
#[derive(Debug, Clone)]
pub struct LoadedSpectrum {
    pub spectrum: Spectrum,
    pub stats: LoadStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Frequency,
    Real,
    Imag,
}

/// Resolved column indices for `(frequency, real, imag)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    frequency: usize,
    real: usize,
    imag: usize,
    strategy: ColumnStrategy,
}

const POSITIONAL: [usize; 3] = [0, 1, 2];

/// Parse raw CSV bytes into a spectrum.
pub fn load_spectrum(raw: &[u8], opts: &LoaderOptions) -> EngineResult<LoadedSpectrum> {
    let text = std::str::from_utf8(raw).map_err(|e| EngineError::parse(format!("input is not valid UTF-8: {e}")))?;
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(EngineError::parse("input is empty"));
    }

    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| EngineError::parse(format!("CSV parse error: {e}")))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(record);
    }

    let Some(first) = records.first() else {
        return Err(EngineError::parse("input has no rows"));
    };

    let columns = resolve_columns(first)?;
    log::debug!(
        "columns resolved ({:?}): frequency={} real={} imag={} delimiter={:?}",
        columns.strategy,
        columns.frequency,
        columns.real,
        columns.imag,
        delimiter as char
    );

    let header = match columns.strategy {
        ColumnStrategy::Headerless => None,
        ColumnStrategy::Named | ColumnStrategy::Positional => Some(first.clone()),
    };
    let data = if header.is_some() { &records[1..] } else { &records[..] };

    let mut frequencies = Vec::with_capacity(data.len());
    let mut impedances = Vec::with_capacity(data.len());
    let mut rows_dropped = 0usize;

    for (idx, record) in data.iter().enumerate() {
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);

        let f = parse_cell(record, columns.frequency, header.as_ref(), line)?;
        let re = parse_cell(record, columns.real, header.as_ref(), line)?;
        let im = parse_cell(record, columns.imag, header.as_ref(), line)?;

        if keep_sample(f, re, im, opts) {
            frequencies.push(f);
            impedances.push(Complex64::new(re, im));
        } else {
            rows_dropped += 1;
        }
    }

    let rows_read = data.len();
    let rows_used = frequencies.len();
    if rows_dropped > 0 {
        log::warn!(
            "dropped {rows_dropped} of {rows_read} samples (frequency <= {} Hz, non-finite{})",
            opts.min_frequency.max(0.0),
            if opts.drop_inductive { ", or Im(Z) >= 0" } else { "" }
        );
    }

    let spectrum = Spectrum::new(frequencies, impedances)?;
    log::info!("loaded spectrum: {rows_used} samples ({:?} columns)", columns.strategy);

    Ok(LoadedSpectrum {
        spectrum,
        stats: LoadStats {
            strategy: columns.strategy,
            rows_read,
            rows_used,
            rows_dropped,
        },
    })
}

/// Pick the field delimiter from the first non-empty line.
///
/// Tab and semicolon win when they appear at least twice (three columns need two
/// separators); otherwise comma. Semicolon files often use decimal commas, so a
/// raw comma count is not a reliable signal.
fn sniff_delimiter(text: &str) -> u8 {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if line.matches('\t').count() >= 2 {
        b'\t'
    } else if line.matches(';').count() >= 2 {
        b';'
    } else {
        b','
    }
}

fn resolve_columns(first: &StringRecord) -> EngineResult<Columns> {
    let first_token = first.get(0).map(normalize_header_name).unwrap_or_default();
    if first_token.parse::<f64>().is_ok() {
        if first.len() < 3 {
            return Err(EngineError::parse(format!(
                "headerless input needs at least 3 columns, found {}",
                first.len()
            )));
        }
        return Ok(columns_at(POSITIONAL, ColumnStrategy::Headerless));
    }

    let mut found: [Option<usize>; 3] = [None, None, None];
    for (idx, name) in first.iter().enumerate() {
        let Some(role) = classify(&normalize_header_name(name)) else {
            continue;
        };
        let slot = match role {
            Role::Frequency => 0,
            Role::Real => 1,
            Role::Imag => 2,
        };
        if found[slot].is_none() {
            found[slot] = Some(idx);
        }
    }

    if let [Some(frequency), Some(real), Some(imag)] = found {
        return Ok(Columns {
            frequency,
            real,
            imag,
            strategy: ColumnStrategy::Named,
        });
    }

    if first.len() >= 3 {
        log::warn!(
            "could not match all of frequency/real/imaginary by name in {:?}; assuming columns 0, 1, 2",
            first.iter().collect::<Vec<_>>()
        );
        return Ok(columns_at(POSITIONAL, ColumnStrategy::Positional));
    }

    Err(EngineError::parse("could not identify frequency/real/imaginary columns"))
}

fn columns_at(idx: [usize; 3], strategy: ColumnStrategy) -> Columns {
    Columns {
        frequency: idx[0],
        real: idx[1],
        imag: idx[2],
        strategy,
    }
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, name matching silently fails.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

/// Role keyword matching, checked in order frequency, real, imaginary.
fn classify(name: &str) -> Option<Role> {
    if name.contains("freq") || name == "f" {
        Some(Role::Frequency)
    } else if name.contains("real") || name == "z'" || name == "zre" {
        Some(Role::Real)
    } else if name.contains("imag") || name == "z''" || name == "-z\"" || name == "zim" {
        Some(Role::Imag)
    } else {
        None
    }
}

fn parse_cell(record: &StringRecord, col: usize, header: Option<&StringRecord>, line: usize) -> EngineResult<f64> {
    let column_label = || match header.and_then(|h| h.get(col)) {
        Some(name) => format!("'{name}'"),
        None => format!("{col}"),
    };

    let raw = record
        .get(col)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::parse(format!("line {line}: missing value in column {}", column_label())))?;

    raw.parse::<f64>().map_err(|_| {
        EngineError::parse(format!(
            "line {line}: column {}: cannot parse '{raw}' as a number",
            column_label()
        ))
    })
}

fn keep_sample(f: f64, re: f64, im: f64, opts: &LoaderOptions) -> bool {
    if !(f.is_finite() && re.is_finite() && im.is_finite()) {
        return false;
    }
    if f <= opts.min_frequency.max(0.0) {
        return false;
    }
    !(opts.drop_inductive && im >= 0.0)
}

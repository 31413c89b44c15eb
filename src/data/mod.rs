//! Tabular input: SED, VHE, and light-curve CSV ingest, plus synthetic
//! sample generation for the demo command.

mod lc;
mod sample;
mod sed;
mod vhe;

use std::collections::HashMap;

use csv::StringRecord;

pub use lc::{LcTable, load_light_curve, read_light_curve};
pub use sample::{SampleSed, generate_sample_sed};
pub use sed::{SedTable, load_sed, read_sed};
pub use vhe::{VheTable, load_vhe, read_vhe};

/// A row-level error encountered during ingest. Bad rows are skipped and
/// reported, never fatal on their own.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM;
    // strip it or schema validation reports the column as missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn ensure_columns_exist(
    header_map: &HashMap<String, usize>,
    required: &[&str],
    table: &str,
) -> Result<(), crate::error::AppError> {
    for name in required {
        if !header_map.contains_key(*name) {
            return Err(crate::error::AppError::new(
                2,
                format!("{table} table is missing required column: `{name}`"),
            ));
        }
    }
    Ok(())
}

/// Parse a required finite float cell; an error message becomes a `RowError`.
pub(crate) fn get_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<f64, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    let raw = record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if !v.is_finite() {
        return Err(format!("Non-finite `{name}` value."));
    }
    Ok(v)
}

/// Parse a float cell that may legitimately be empty, `nan`, or unparseable
/// (undefined upper limits, undetected bins). Degrades to NaN instead of a
/// row error.
pub(crate) fn get_f64_or_nan(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> f64 {
    header_map
        .get(name)
        .and_then(|idx| record.get(*idx))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

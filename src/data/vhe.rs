//! Secondary-instrument (VHE) SED table ingest.
//!
//! Expected columns in TeV units: `e_ref, e_min, e_max, e2dnde, e2dnde_err,
//! e2dnde_ul, ts`. Unit conversion to MeV happens during fusion, not here.
//!
//! A missing or unreadable VHE table is a recoverable condition: the caller
//! falls back to the primary-only SED rather than erroring out.

use std::io::Read;
use std::path::Path;

use crate::data::{RowError, build_header_map, ensure_columns_exist, get_f64, get_f64_or_nan};
use crate::domain::VhePoint;
use crate::error::AppError;

const REQUIRED: [&str; 7] = [
    "e_ref",
    "e_min",
    "e_max",
    "e2dnde",
    "e2dnde_err",
    "e2dnde_ul",
    "ts",
];

#[derive(Debug, Clone)]
pub struct VheTable {
    pub points: Vec<VhePoint>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_vhe(path: &Path) -> Result<VheTable, AppError> {
    let file = std::fs::File::open(path).map_err(|e| AppError::io(path, e))?;
    read_vhe(file)
}

pub fn read_vhe(reader: impl Read) -> Result<VheTable, AppError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read VHE headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &REQUIRED, "VHE")?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in csv.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = (|| -> Result<VhePoint, String> {
            let e_ref = get_f64(&record, &header_map, "e_ref")?;
            let e_min = get_f64(&record, &header_map, "e_min")?;
            let e_max = get_f64(&record, &header_map, "e_max")?;
            if !(e_min > 0.0 && e_min <= e_ref && e_ref <= e_max) {
                return Err("Bin edges must satisfy 0 < e_min <= e_ref <= e_max.".to_string());
            }
            Ok(VhePoint {
                e_ref,
                e_min,
                e_max,
                e2dnde: get_f64_or_nan(&record, &header_map, "e2dnde"),
                e2dnde_err: get_f64_or_nan(&record, &header_map, "e2dnde_err"),
                e2dnde_ul: get_f64_or_nan(&record, &header_map, "e2dnde_ul"),
                ts: get_f64_or_nan(&record, &header_map, "ts"),
            })
        })();

        match parsed {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    // An empty VHE table is not fatal: fusion degrades to primary-only.
    Ok(VheTable {
        points,
        row_errors,
        rows_read,
    })
}

//! Primary-instrument SED table ingest.
//!
//! Expected columns (MeV units): `e_ctr, e_min, e_max, e2dnde, e2dnde_err,
//! e2dnde_ul95, ts`. Flux and TS cells may be empty or `nan` for undetected
//! bins; the bin edges must parse.

use std::io::Read;
use std::path::Path;

use crate::data::{RowError, build_header_map, ensure_columns_exist, get_f64, get_f64_or_nan};
use crate::domain::SedPoint;
use crate::error::AppError;

const REQUIRED: [&str; 7] = [
    "e_ctr",
    "e_min",
    "e_max",
    "e2dnde",
    "e2dnde_err",
    "e2dnde_ul95",
    "ts",
];

#[derive(Debug, Clone)]
pub struct SedTable {
    pub points: Vec<SedPoint>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_sed(path: &Path) -> Result<SedTable, AppError> {
    let file = std::fs::File::open(path).map_err(|e| AppError::io(path, e))?;
    read_sed(file)
}

pub fn read_sed(reader: impl Read) -> Result<SedTable, AppError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read SED headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &REQUIRED, "SED")?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in csv.records().enumerate() {
        // Header is line 1; records start at line 2.
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

        let parsed = (|| -> Result<SedPoint, String> {
            let e_ctr = get_f64(&record, &header_map, "e_ctr")?;
            let e_min = get_f64(&record, &header_map, "e_min")?;
            let e_max = get_f64(&record, &header_map, "e_max")?;
            if !(e_min > 0.0 && e_min <= e_ctr && e_ctr <= e_max) {
                return Err("Bin edges must satisfy 0 < e_min <= e_ctr <= e_max.".to_string());
            }
            Ok(SedPoint {
                e_ctr,
                e_min,
                e_max,
                e2dnde: get_f64_or_nan(&record, &header_map, "e2dnde"),
                e2dnde_err: get_f64_or_nan(&record, &header_map, "e2dnde_err"),
                e2dnde_ul95: get_f64_or_nan(&record, &header_map, "e2dnde_ul95"),
                ts: get_f64_or_nan(&record, &header_map, "ts"),
            })
        })();

        match parsed {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if points.is_empty() {
        return Err(AppError::new(3, "SED table has no usable rows."));
    }

    Ok(SedTable {
        points,
        row_errors,
        rows_read,
    })
}

//! Light-curve table ingest.
//!
//! Expected columns: `tmin_mjd, tmax_mjd, ts, flux, flux_err, flux_ul95,
//! eflux, eflux_err, eflux_ul95`. Everything but the bin bounds may be empty
//! or `nan` (undetected bins carry upper limits only).

use std::io::Read;
use std::path::Path;

use crate::data::{RowError, build_header_map, ensure_columns_exist, get_f64, get_f64_or_nan};
use crate::domain::LightCurveBin;
use crate::error::AppError;

const REQUIRED: [&str; 9] = [
    "tmin_mjd",
    "tmax_mjd",
    "ts",
    "flux",
    "flux_err",
    "flux_ul95",
    "eflux",
    "eflux_err",
    "eflux_ul95",
];

#[derive(Debug, Clone)]
pub struct LcTable {
    pub bins: Vec<LightCurveBin>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

pub fn load_light_curve(path: &Path) -> Result<LcTable, AppError> {
    let file = std::fs::File::open(path).map_err(|e| AppError::io(path, e))?;
    read_light_curve(file)
}

pub fn read_light_curve(reader: impl Read) -> Result<LcTable, AppError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read light-curve headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &REQUIRED, "Light-curve")?;

    let mut bins = Vec::new();
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

        let parsed = (|| -> Result<LightCurveBin, String> {
            let tmin_mjd = get_f64(&record, &header_map, "tmin_mjd")?;
            let tmax_mjd = get_f64(&record, &header_map, "tmax_mjd")?;
            if tmax_mjd <= tmin_mjd {
                return Err("Bin bounds must satisfy tmin_mjd < tmax_mjd.".to_string());
            }
            Ok(LightCurveBin {
                tmin_mjd,
                tmax_mjd,
                ts: get_f64_or_nan(&record, &header_map, "ts"),
                flux: get_f64_or_nan(&record, &header_map, "flux"),
                flux_err: get_f64_or_nan(&record, &header_map, "flux_err"),
                flux_ul95: get_f64_or_nan(&record, &header_map, "flux_ul95"),
                eflux: get_f64_or_nan(&record, &header_map, "eflux"),
                eflux_err: get_f64_or_nan(&record, &header_map, "eflux_err"),
                eflux_ul95: get_f64_or_nan(&record, &header_map, "eflux_ul95"),
            })
        })();

        match parsed {
            Ok(bin) => bins.push(bin),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if bins.is_empty() {
        return Err(AppError::new(3, "Light-curve table has no usable bins."));
    }

    Ok(LcTable {
        bins,
        row_errors,
        rows_read,
    })
}

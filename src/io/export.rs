//! Export light-curve tables to CSV.
//!
//! Column layout matches the ingest schema, so an exported table can be fed
//! straight back into another adaptive pass.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::LightCurveBin;
use crate::error::AppError;

pub fn write_light_curve_csv(path: &Path, bins: &[LightCurveBin]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| AppError::io(path, e))?;

    writeln!(
        file,
        "tmin_mjd,tmax_mjd,ts,flux,flux_err,flux_ul95,eflux,eflux_err,eflux_ul95"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write light-curve header: {e}")))?;

    for b in bins {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            fmt(b.tmin_mjd),
            fmt(b.tmax_mjd),
            fmt(b.ts),
            fmt(b.flux),
            fmt(b.flux_err),
            fmt(b.flux_ul95),
            fmt(b.eflux),
            fmt(b.eflux_err),
            fmt(b.eflux_ul95),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write light-curve row: {e}")))?;
    }

    Ok(())
}

// Undefined cells export as empty, matching the ingest side's NaN fallback.
fn fmt(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.10e}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_light_curve;

    #[test]
    fn exported_table_reads_back_identically() {
        let bins = vec![
            LightCurveBin {
                tmin_mjd: 59000.0,
                tmax_mjd: 59007.0,
                ts: 64.0,
                flux: 2.1e-8,
                flux_err: 3.0e-9,
                flux_ul95: f64::NAN,
                eflux: 1.2e-5,
                eflux_err: 1.5e-6,
                eflux_ul95: f64::NAN,
            },
            LightCurveBin {
                tmin_mjd: 59007.0,
                tmax_mjd: 59014.0,
                ts: 1.2,
                flux: f64::NAN,
                flux_err: f64::NAN,
                flux_ul95: 4.0e-8,
                eflux: f64::NAN,
                eflux_err: f64::NAN,
                eflux_ul95: 2.0e-5,
            },
        ];

        let dir = std::env::temp_dir().join("gsed-lc-export-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lc.csv");
        write_light_curve_csv(&path, &bins).unwrap();

        let table = read_light_curve(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(table.bins.len(), 2);
        assert!((table.bins[0].flux - 2.1e-8).abs() < 1e-18);
        assert!(table.bins[0].flux_ul95.is_nan());
        assert!((table.bins[1].flux_ul95 - 4.0e-8).abs() < 1e-18);
        assert!(table.bins[1].flux.is_nan());
    }
}

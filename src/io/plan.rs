//! Read/write adaptive split plans.
//!
//! The plan JSON lets the external likelihood engine be driven
//! out-of-process: one entry per selected bin with its sub-bin count and
//! fully-narrowed file configuration.

use std::fs::File;
use std::path::Path;

use crate::error::AppError;
use crate::lightcurve::SplitPlan;

/// Base name of the merged table for a given adaptive pass.
pub fn adaptive_table_name(iteration: u32) -> String {
    format!("Adaptive-binning_light_curve_{iteration:03}")
}

pub fn write_plan_json(path: &Path, plan: &SplitPlan) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer_pretty(file, plan)
        .map_err(|e| AppError::new(2, format!("Failed to write split plan: {e}")))?;
    Ok(())
}

pub fn read_plan_json(path: &Path) -> Result<SplitPlan, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let plan: SplitPlan = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid split plan: {e}")))?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_zero_padded_per_pass() {
        assert_eq!(adaptive_table_name(1), "Adaptive-binning_light_curve_001");
        assert_eq!(adaptive_table_name(42), "Adaptive-binning_light_curve_042");
    }
}

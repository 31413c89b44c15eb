//! Splitting bright light-curve bins into finer sub-bins.
//!
//! A bin is split when its test statistic comfortably exceeds the detection
//! threshold: `ts > 2×threshold` selects the bin, and it is divided into
//! `floor(ts / threshold)` sub-bins (integer truncation, never rounding).
//! The actual re-fit of each sub-bin is delegated through the
//! `LightCurveEngine` seam; this module only plans the split, derives each
//! sub-bin's file configuration, and merges the results back into a single
//! time-ordered table.
//!
//! Planning is pure: no directories are created and no working directory is
//! touched. All paths in a `SubBinConfig` are anchored at the bin's artifact
//! directory under the configured `bins_dir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::LightCurveBin;
use crate::error::AppError;

/// Fully-qualified configuration for re-fitting one selected bin.
///
/// Every path is absolute relative to the caller-supplied artifact root, so
/// an engine can run several of these concurrently without sharing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubBinConfig {
    pub tmin_mjd: f64,
    pub tmax_mjd: f64,
    pub n_sub_bins: usize,
    pub srcmap: PathBuf,
    pub bexpmap_roi: PathBuf,
    pub bexpmap: PathBuf,
    pub evfile: PathBuf,
    pub workdir: PathBuf,
    pub outdir: PathBuf,
    pub logfile: PathBuf,
    /// Whether the engine may fan sub-bin fits out over multiple processes.
    pub supports_multiprocess: bool,
    pub n_threads: usize,
}

/// One selected bin in a split plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub bin_index: usize,
    pub ts: f64,
    pub sub_bin_count: usize,
    pub config: SubBinConfig,
}

/// The full plan for one adaptive pass over a light-curve table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Monotonically-increasing pass number; names the output table.
    pub iteration: u32,
    pub ts_threshold: f64,
    pub entries: Vec<PlanEntry>,
}

impl SplitPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of applying a split plan.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Merged table: unselected bins verbatim, selected bins replaced by
    /// their sub-bins, sorted by `tmin_mjd`.
    pub bins: Vec<LightCurveBin>,
    pub n_selected: usize,
    pub n_sub_bins: usize,
    pub iteration: u32,
    pub changed: bool,
}

/// Re-fit seam for the external likelihood engine.
///
/// `refit` receives the parent bin, the number of sub-bins to produce, and a
/// fully-narrowed configuration; it returns the fitted sub-bin rows.
pub trait LightCurveEngine {
    fn refit(
        &mut self,
        bin: &LightCurveBin,
        n_sub: usize,
        cfg: &SubBinConfig,
    ) -> Result<Vec<LightCurveBin>, AppError>;
}

/// Derive the artifact configuration for one selected bin.
///
/// Pure function of its inputs: the same bin and settings always produce the
/// same paths.
pub fn narrow_config(
    bins_dir: &Path,
    bin_index: usize,
    bin: &LightCurveBin,
    n_sub: usize,
    supports_multiprocess: bool,
    n_threads: usize,
) -> SubBinConfig {
    let bin_dir = bins_dir.join(format!("bin_{bin_index:04}"));
    let workdir = bin_dir.join("adaptive");
    SubBinConfig {
        tmin_mjd: bin.tmin_mjd,
        tmax_mjd: bin.tmax_mjd,
        n_sub_bins: n_sub,
        srcmap: bin_dir.join("srcmap.fits"),
        bexpmap_roi: bin_dir.join("bexpmap_roi.fits"),
        bexpmap: bin_dir.join("bexpmap.fits"),
        evfile: bin_dir.join("events.fits"),
        outdir: workdir.join("output"),
        logfile: workdir.join("refit.log"),
        workdir,
        supports_multiprocess,
        n_threads,
    }
}

/// Plan an adaptive pass: decide which bins split and into how many pieces.
///
/// Bins whose `ts` is not finite are never selected. A bin that clears the
/// `2×threshold` bar but would yield one sub-bin or fewer is skipped; with a
/// positive threshold this cannot occur, the guard simply makes the rule
/// explicit.
pub fn plan_split(
    bins: &[LightCurveBin],
    ts_threshold: f64,
    bins_dir: &Path,
    iteration: u32,
    supports_multiprocess: bool,
    n_threads: usize,
) -> Result<SplitPlan, AppError> {
    if !ts_threshold.is_finite() || ts_threshold <= 0.0 {
        return Err(AppError::new(2, "TS threshold must be finite and > 0."));
    }
    if bins.is_empty() {
        return Err(AppError::new(3, "Light-curve table has no bins."));
    }

    let mut entries = Vec::new();
    for (idx, bin) in bins.iter().enumerate() {
        if !(bin.ts.is_finite() && bin.ts > 2.0 * ts_threshold) {
            continue;
        }
        let sub_bin_count = (bin.ts / ts_threshold).floor() as usize;
        if sub_bin_count <= 1 {
            continue;
        }
        let config = narrow_config(
            bins_dir,
            idx,
            bin,
            sub_bin_count,
            supports_multiprocess,
            n_threads,
        );
        entries.push(PlanEntry {
            bin_index: idx,
            ts: bin.ts,
            sub_bin_count,
            config,
        });
    }

    Ok(SplitPlan {
        iteration,
        ts_threshold,
        entries,
    })
}

/// Apply a split plan: re-fit each selected bin through the engine and merge.
///
/// An empty plan returns the input table unchanged (`changed = false`), so a
/// table that is already maximally split passes through untouched.
pub fn apply_plan(
    bins: &[LightCurveBin],
    plan: &SplitPlan,
    engine: &mut dyn LightCurveEngine,
) -> Result<SplitOutcome, AppError> {
    let mut merged: Vec<LightCurveBin> = Vec::with_capacity(bins.len());
    let mut n_sub_bins = 0usize;

    for (idx, bin) in bins.iter().enumerate() {
        match plan.entries.iter().find(|e| e.bin_index == idx) {
            Some(entry) => {
                let sub = engine.refit(bin, entry.sub_bin_count, &entry.config)?;
                if sub.is_empty() {
                    return Err(AppError::new(
                        4,
                        format!("Engine returned no sub-bins for bin {idx}."),
                    ));
                }
                n_sub_bins += sub.len();
                merged.extend(sub);
            }
            None => merged.push(bin.clone()),
        }
    }

    merged.sort_by(|a, b| a.tmin_mjd.total_cmp(&b.tmin_mjd));

    Ok(SplitOutcome {
        bins: merged,
        n_selected: plan.entries.len(),
        n_sub_bins,
        iteration: plan.iteration,
        changed: !plan.entries.is_empty(),
    })
}

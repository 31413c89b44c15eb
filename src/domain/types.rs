//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fusion/fitting
//! - exported to the persisted result document
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Detection threshold on the test statistic (TS).
///
/// A table row is a detection iff `ts > TS_MIN`; otherwise it carries a 95%
/// upper limit instead of a point estimate. `TS > 9` corresponds roughly to a
/// 3σ detection for one degree of freedom.
pub const TS_MIN: f64 = 9.0;

/// One energy bin of a spectral energy distribution, as produced by the
/// external likelihood-fit engine.
///
/// Energies are in MeV and energy-flux densities in MeV cm⁻² s⁻¹.
/// Exactly one of (`e2dnde`/`e2dnde_err`, `e2dnde_ul95`) is meaningful for a
/// given row, depending on whether `ts > TS_MIN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SedPoint {
    pub e_ctr: f64,
    pub e_min: f64,
    pub e_max: f64,
    pub e2dnde: f64,
    pub e2dnde_err: f64,
    pub e2dnde_ul95: f64,
    pub ts: f64,
}

impl SedPoint {
    pub fn is_detection(&self) -> bool {
        self.ts > TS_MIN
    }
}

/// One row of a secondary (ground-based, very-high-energy) instrument table.
///
/// Units are TeV-scale as supplied (`e_ref`/`e_min`/`e_max` in TeV,
/// fluxes in TeV cm⁻² s⁻¹); conversion to MeV happens during fusion.
/// Rows with an undefined (`NaN`) `e2dnde_ul` are dropped before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VhePoint {
    pub e_ref: f64,
    pub e_min: f64,
    pub e_max: f64,
    pub e2dnde: f64,
    pub e2dnde_err: f64,
    pub e2dnde_ul: f64,
    pub ts: f64,
}

/// One time bin of a light curve.
///
/// Same detection/upper-limit duality as `SedPoint`, keyed on `ts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveBin {
    pub tmin_mjd: f64,
    pub tmax_mjd: f64,
    pub ts: f64,
    pub flux: f64,
    pub flux_err: f64,
    pub flux_ul95: f64,
    pub eflux: f64,
    pub eflux_err: f64,
    pub eflux_ul95: f64,
}

impl LightCurveBin {
    pub fn is_detection(&self) -> bool {
        self.ts > TS_MIN
    }

    pub fn tmean_mjd(&self) -> f64 {
        0.5 * (self.tmin_mjd + self.tmax_mjd)
    }
}

/// Which spectral shape the MCMC fits.
///
/// Resolved once at configuration time; evaluation, prior, labels and the
/// starting vector all hang off this tag (see `models`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SpectralModel {
    PowerLaw,
    LogParabola,
    LogParabola2,
    SuperExpCutoff,
    SuperExpCutoffFixedB,
}

impl SpectralModel {
    /// Human-readable label for terminal output and plot titles.
    pub fn display_name(self) -> &'static str {
        match self {
            SpectralModel::PowerLaw => "PowerLaw",
            SpectralModel::LogParabola => "LogPar",
            SpectralModel::LogParabola2 => "LogPar2",
            SpectralModel::SuperExpCutoff => "PLEC",
            SpectralModel::SuperExpCutoffFixedB => "PLEC_bfix",
        }
    }

    /// Number of free parameters sampled by the MCMC.
    pub fn param_count(self) -> usize {
        match self {
            SpectralModel::PowerLaw => 2,
            SpectralModel::LogParabola => 3,
            SpectralModel::LogParabola2 => 3,
            SpectralModel::SuperExpCutoff => 4,
            SpectralModel::SuperExpCutoffFixedB => 3,
        }
    }
}

/// Immutable per-run context threaded through the SED pipeline stages.
///
/// This replaces any long-lived mutable state: each stage reads what it needs
/// from here and returns its own result value.
#[derive(Debug, Clone)]
pub struct FitContext {
    pub source_name: String,
    /// Analysis energy range (MeV). The model pivot is `log10(2·emin)`.
    pub emin: f64,
    pub emax: f64,
    pub redshift: f64,
    pub ebl_model: crate::ebl::EblModel,
    pub model: SpectralModel,
    pub mcmc: McmcSettings,
}

impl FitContext {
    /// Pivot energy in log10 MeV, fixed by the analysis energy range.
    pub fn pivot_log(&self) -> f64 {
        (2.0 * self.emin).log10()
    }
}

/// Ensemble sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McmcSettings {
    pub n_walkers: usize,
    /// Iterations discarded before production (walker state is kept).
    pub burn_in: usize,
    /// Production iterations; the posterior has `n_walkers × n_iterations` rows.
    pub n_iterations: usize,
    /// Gaussian σ used to scatter walkers around the starting vector.
    pub init_sigma: f64,
    pub seed: u64,
}

impl Default for McmcSettings {
    fn default() -> Self {
        Self {
            n_walkers: 300,
            burn_in: 100,
            n_iterations: 500,
            init_sigma: 0.3,
            seed: 42,
        }
    }
}

/// A full SED run's configuration as understood by the pipeline
/// (derived from CLI flags plus defaults).
#[derive(Debug, Clone)]
pub struct SedRunConfig {
    pub sed_path: PathBuf,
    pub vhe_path: Option<PathBuf>,
    /// Raw redshift text; parsed leniently (unparseable → 0.0 + warning).
    pub redshift_text: String,
    pub ebl_label: String,
    /// Optional absorption table (energy_mev, factor rows). Required when the
    /// parsed redshift is > 0.
    pub absorption_path: Option<PathBuf>,
    pub model: SpectralModel,
    pub source_name: String,
    pub emin: f64,
    pub emax: f64,
    pub mcmc: McmcSettings,
    pub out_dir: PathBuf,
}

/// An adaptive-binning run's configuration.
#[derive(Debug, Clone)]
pub struct AdaptiveRunConfig {
    pub lc_path: PathBuf,
    pub ts_threshold: f64,
    /// Directory holding the per-bin analysis artifacts of the source light
    /// curve (one subdirectory per original bin).
    pub bins_dir: PathBuf,
    pub plan_out: Option<PathBuf>,
    /// Directory of engine-produced sub-bin tables (`bin_NNNN.csv`). When
    /// absent the run is plan-only.
    pub sub_tables: Option<PathBuf>,
    /// Pass number; names the merged output table.
    pub iteration: u32,
    /// Where to write the merged table when the plan is applied.
    pub out_path: Option<PathBuf>,
    pub supports_multiprocess: bool,
    pub n_threads: usize,
}

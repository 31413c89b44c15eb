//! Command-line parsing.
//!
//! Argument parsing and command dispatch stay separate from the numeric
//! code: this module only turns flags into the typed run configurations the
//! pipeline consumes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::SpectralModel;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gsed",
    version,
    about = "Gamma-ray SED fitting (MCMC) and adaptive light-curve binning"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a spectral model to an SED table and write the result document.
    Sed(SedArgs),
    /// Plan an adaptive split of a light-curve table; optionally merge
    /// engine-produced sub-bin tables.
    Adaptive(AdaptiveArgs),
    /// Run the SED pipeline end-to-end on a synthetic power-law dataset.
    Demo(DemoArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct SedArgs {
    /// Primary SED table (CSV, MeV units).
    #[arg(long)]
    pub sed: PathBuf,

    /// Optional VHE SED table (CSV, TeV units).
    #[arg(long)]
    pub vhe: Option<PathBuf>,

    /// Source redshift. Unparseable values fall back to 0 with a warning.
    #[arg(long, default_value = "0")]
    pub redshift: String,

    /// EBL absorption model (user-facing label or internal key).
    #[arg(long, default_value = "dominguez")]
    pub ebl: String,

    /// Pre-evaluated absorption table (CSV of energy_mev,factor rows).
    /// Required when redshift > 0.
    #[arg(long)]
    pub absorption: Option<PathBuf>,

    /// Spectral model to sample.
    #[arg(long, value_enum, default_value_t = SpectralModel::PowerLaw)]
    pub model: SpectralModel,

    /// Source name used in titles and the result document.
    #[arg(long, default_value = "source")]
    pub source: String,

    /// Analysis minimum energy (MeV); fixes the model pivot at log10(2·emin).
    #[arg(long, default_value_t = 100.0)]
    pub emin: f64,

    /// Analysis maximum energy (MeV).
    #[arg(long, default_value_t = 300_000.0)]
    pub emax: f64,

    /// Random seed for walker initialization and the stretch moves.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of ensemble walkers.
    #[arg(long, default_value_t = 300)]
    pub walkers: usize,

    /// Burn-in iterations (discarded).
    #[arg(long = "burn-in", default_value_t = 100)]
    pub burn_in: usize,

    /// Production iterations.
    #[arg(long, default_value_t = 500)]
    pub iterations: usize,

    /// Output directory for the result document and quickplots.
    #[arg(long, default_value = "gsed-out")]
    pub out: PathBuf,
}

#[derive(Debug, Parser, Clone)]
pub struct AdaptiveArgs {
    /// Light-curve table (CSV).
    #[arg(long)]
    pub lc: PathBuf,

    /// Detection TS threshold; bins with ts > 2×threshold are split.
    #[arg(long)]
    pub threshold: f64,

    /// Directory holding per-bin analysis artifacts (one subdirectory per
    /// original bin).
    #[arg(long = "bins-dir", default_value = "lc-bins")]
    pub bins_dir: PathBuf,

    /// Write the split plan to this JSON file.
    #[arg(long = "plan-out")]
    pub plan_out: Option<PathBuf>,

    /// Directory of engine-produced sub-bin tables (bin_NNNN.csv). When set,
    /// the plan is applied and the merged table written.
    #[arg(long = "sub-tables")]
    pub sub_tables: Option<PathBuf>,

    /// Adaptive pass number; names the merged output table.
    #[arg(long, default_value_t = 1)]
    pub iteration: u32,

    /// Merged light-curve output path (defaults to the pass name under the
    /// current directory).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Allow the engine to fan sub-bin fits out over multiple processes.
    #[arg(long)]
    pub multiprocess: bool,

    /// Worker threads handed to the engine configuration.
    #[arg(long, default_value_t = 1)]
    pub threads: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Random seed for the synthetic SED and the sampler.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of synthetic SED bins.
    #[arg(long, default_value_t = 12)]
    pub bins: usize,

    /// Spectral model to fit against the synthetic power law.
    #[arg(long, value_enum, default_value_t = SpectralModel::PowerLaw)]
    pub model: SpectralModel,

    /// Output directory.
    #[arg(long, default_value = "gsed-demo")]
    pub out: PathBuf,
}

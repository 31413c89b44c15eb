//! The SED-fit and adaptive-binning pipelines.
//!
//! Stage order for a SED run:
//!
//! 1. read the primary SED table; classify rows; optionally fuse a VHE table
//! 2. guard the fit: fewer than 3 detected bins writes the table as-is
//! 3. deabsorb fluxes when redshift > 0
//! 4. sample the posterior and summarize it
//! 5. persist the multi-table result document and the quickplots
//!
//! Recoverable conditions (unreadable VHE table, unparseable redshift, too
//! few detections) never abort the run; they surface as warnings on the
//! returned outcome.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::data;
use crate::domain::{
    AdaptiveRunConfig, FitContext, LightCurveBin, McmcSettings, SedPoint, SedRunConfig,
    SpectralModel, TS_MIN, VhePoint,
};
use crate::ebl::{Absorption, EblModel, TabulatedAbsorption, parse_redshift};
use crate::error::AppError;
use crate::fusion::{FusedSed, fuse};
use crate::io::{
    Column, ResultDoc, Table, adaptive_table_name, write_light_curve_csv, write_plan_json,
    write_result_doc,
};
use crate::lightcurve::{
    LightCurveEngine, SplitOutcome, SplitPlan, SubBinConfig, apply_plan, plan_split,
};
use crate::mcmc::{McmcRun, run_mcmc};
use crate::models;
use crate::plot::{SedPlotData, plot_light_curve_svg, plot_sed_svg};

/// Result of a full SED run.
#[derive(Debug)]
pub struct FitOutcome {
    pub ctx: FitContext,
    /// The fused SED the fit saw (EBL-corrected when redshift > 0).
    pub fused: FusedSed,
    pub run: Option<McmcRun>,
    pub warnings: Vec<String>,
    pub doc_path: PathBuf,
    pub sed_plot_path: Option<PathBuf>,
}

/// Result of an adaptive light-curve pass.
#[derive(Debug)]
pub struct AdaptiveResult {
    pub bins: Vec<LightCurveBin>,
    pub plan: SplitPlan,
    pub outcome: Option<SplitOutcome>,
    pub plan_path: Option<PathBuf>,
    pub merged_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
}

/// Run the SED pipeline from files, loading the absorption table if one was
/// configured.
pub fn run_sed_fit(config: &SedRunConfig) -> Result<FitOutcome, AppError> {
    let absorption = match &config.absorption_path {
        Some(path) => Some(TabulatedAbsorption::from_csv_path(path)?),
        None => None,
    };
    run_sed_fit_with(
        config,
        absorption.as_ref().map(|a| a as &dyn Absorption),
    )
}

/// Same as [`run_sed_fit`] but with a caller-supplied absorption evaluator
/// (library callers, tests).
pub fn run_sed_fit_with(
    config: &SedRunConfig,
    absorption: Option<&dyn Absorption>,
) -> Result<FitOutcome, AppError> {
    let mut warnings = Vec::new();

    let ebl_model = EblModel::parse(&config.ebl_label).ok_or_else(|| {
        AppError::new(2, format!("Unknown EBL model '{}'.", config.ebl_label))
    })?;

    let (redshift, redshift_warning) = parse_redshift(&config.redshift_text);
    if let Some(w) = redshift_warning {
        warnings.push(w);
    }

    let sed = data::load_sed(&config.sed_path)?;
    for e in &sed.row_errors {
        warnings.push(format!("SED row {}: {}", e.line, e.message));
    }

    // An unusable VHE table is a recoverable condition.
    let vhe_points = match &config.vhe_path {
        Some(path) => match data::load_vhe(path) {
            Ok(table) => {
                for e in &table.row_errors {
                    warnings.push(format!("VHE row {}: {}", e.line, e.message));
                }
                Some(table.points)
            }
            Err(e) => {
                warnings.push(format!(
                    "WARNING: VHE table unusable ({e}); continuing with the primary SED only."
                ));
                None
            }
        },
        None => None,
    };

    let ctx = FitContext {
        source_name: config.source_name.clone(),
        emin: config.emin,
        emax: config.emax,
        redshift,
        ebl_model,
        model: config.model,
        mcmc: config.mcmc.clone(),
    };

    fit_and_persist(
        ctx,
        &sed.points,
        vhe_points.as_deref(),
        absorption,
        &config.out_dir,
        warnings,
    )
}

/// End-to-end run on a synthetic power-law SED. No files needed up front.
pub fn run_demo(
    n_bins: usize,
    model: SpectralModel,
    seed: u64,
    out_dir: &Path,
) -> Result<FitOutcome, AppError> {
    let sample = data::generate_sample_sed(n_bins, 100.0, 1e5, seed)?;

    let ctx = FitContext {
        source_name: "synthetic power-law".to_string(),
        emin: sample.emin,
        emax: sample.emax,
        redshift: 0.0,
        ebl_model: EblModel::Dominguez,
        model,
        mcmc: McmcSettings {
            seed,
            ..Default::default()
        },
    };

    fit_and_persist(ctx, &sample.points, None, None, out_dir, Vec::new())
}

fn fit_and_persist(
    ctx: FitContext,
    primary: &[SedPoint],
    vhe: Option<&[VhePoint]>,
    absorption: Option<&dyn Absorption>,
    out_dir: &Path,
    mut warnings: Vec<String>,
) -> Result<FitOutcome, AppError> {
    let observed = fuse(primary, vhe);

    // Deabsorb the fused vectors and remember per-point factors for the
    // persisted table columns. At z = 0 the evaluator is never called.
    let (fused, primary_factors) = match (ctx.redshift > 0.0, absorption) {
        (true, Some(abs)) => {
            let det = abs.evaluate(&observed.energy, ctx.redshift);
            let ul = abs.evaluate(&observed.ul_energy, ctx.redshift);
            let energies: Vec<f64> = primary.iter().map(|p| p.e_ctr).collect();
            let per_row = abs.evaluate(&energies, ctx.redshift);
            (observed.deabsorbed(&det, &ul), Some(per_row))
        }
        (true, None) => {
            return Err(AppError::new(
                2,
                "Redshift > 0 requires an absorption table (--absorption).",
            ));
        }
        (false, _) => (observed, None),
    };

    std::fs::create_dir_all(out_dir).map_err(|e| AppError::io(out_dir, e))?;
    let doc_path = out_dir.join("sed_mcmc_results.json");

    if !fused.allow_mcmc {
        warnings.push(format!(
            "Only {} bin(s) with TS > {TS_MIN}: writing the SED table without a fit.",
            fused.n_primary_detections
        ));
        let doc = build_doc(&ctx, primary, primary_factors.as_deref(), None, None, &warnings);
        write_result_doc(&doc_path, &doc)?;
        let sed_plot_path = try_sed_plot(out_dir, &fused, None, &[], &ctx, &mut warnings);
        return Ok(FitOutcome {
            ctx,
            fused,
            run: None,
            warnings,
            doc_path,
            sed_plot_path,
        });
    }

    let space = models::native_space(ctx.model);
    let fit_data = fused.fit_data(space);
    let x_range = fused
        .x_range_log()
        .unwrap_or((ctx.emin.log10(), ctx.emax.log10()));

    let run = run_mcmc(ctx.model, ctx.pivot_log(), &fit_data, x_range, &ctx.mcmc)?;

    let vhe_table = match (vhe, absorption, ctx.redshift > 0.0) {
        (Some(vhe), Some(abs), true) if fused.include_vhe => {
            Some(vhe_corrected_table(vhe, abs, ctx.redshift))
        }
        _ => None,
    };

    let doc = build_doc(
        &ctx,
        primary,
        primary_factors.as_deref(),
        Some(&run),
        vhe_table,
        &warnings,
    );
    write_result_doc(&doc_path, &doc)?;

    let spread = posterior_spread(&run, ctx.pivot_log(), x_range, 100)?;
    let sed_plot_path = try_sed_plot(out_dir, &fused, Some(&run), &spread, &ctx, &mut warnings);

    Ok(FitOutcome {
        ctx,
        fused,
        run: Some(run),
        warnings,
        doc_path,
        sed_plot_path,
    })
}

fn try_sed_plot(
    out_dir: &Path,
    fused: &FusedSed,
    run: Option<&McmcRun>,
    spread: &[(Vec<f64>, Vec<f64>)],
    ctx: &FitContext,
    warnings: &mut Vec<String>,
) -> Option<PathBuf> {
    let path = out_dir.join("Quickplot_SED_MCMC.svg");
    let title = format!("{} - {}", ctx.source_name, ctx.model.display_name());
    let data = SedPlotData {
        fused,
        curve: run.map(|r| (r.curve_x.as_slice(), r.curve_log_e2dnde.as_slice())),
        spread,
        title: &title,
    };
    match plot_sed_svg(&path, &data) {
        Ok(()) => Some(path),
        Err(e) => {
            warnings.push(format!("Quickplot skipped: {e}"));
            None
        }
    }
}

fn build_doc(
    ctx: &FitContext,
    primary: &[SedPoint],
    primary_factors: Option<&[f64]>,
    run: Option<&McmcRun>,
    vhe_table: Option<Table>,
    warnings: &[String],
) -> ResultDoc {
    let mut tables = vec![sed_table(primary, primary_factors)];

    if let Some(run) = run {
        tables.push(parameters_table(ctx.model, run, ctx.pivot_log()));
        tables.push(posterior_table(ctx.model, run));
    }
    if let Some(t) = vhe_table {
        tables.push(t);
    }

    ResultDoc {
        tool: "gsed".to_string(),
        created_utc: Utc::now(),
        source_name: ctx.source_name.clone(),
        model: ctx.model.display_name().to_string(),
        redshift: ctx.redshift,
        ebl_model: (ctx.redshift > 0.0).then(|| ctx.ebl_model.label().to_string()),
        warnings: warnings.to_vec(),
        tables,
    }
}

fn sed_table(primary: &[SedPoint], factors: Option<&[f64]>) -> Table {
    let col = |f: fn(&SedPoint) -> f64| -> Vec<f64> { primary.iter().map(f).collect() };

    let mut columns = vec![
        Column::numeric("e_ctr", &col(|p| p.e_ctr)),
        Column::numeric("e_min", &col(|p| p.e_min)),
        Column::numeric("e_max", &col(|p| p.e_max)),
        Column::numeric("e2dnde", &col(|p| p.e2dnde)),
        Column::numeric("e2dnde_err", &col(|p| p.e2dnde_err)),
        Column::numeric("e2dnde_ul95", &col(|p| p.e2dnde_ul95)),
        Column::numeric("ts", &col(|p| p.ts)),
    ];

    if let Some(factors) = factors {
        let corrected = |f: fn(&SedPoint) -> f64| -> Vec<f64> {
            primary
                .iter()
                .zip(factors)
                .map(|(p, a)| f(p) / a)
                .collect()
        };
        columns.push(Column::numeric(
            "e2dnde_EBL_corrected",
            &corrected(|p| p.e2dnde),
        ));
        columns.push(Column::numeric(
            "e2dnde_err_EBL_corrected",
            &corrected(|p| p.e2dnde_err),
        ));
        columns.push(Column::numeric(
            "e2dnde_ul95_EBL_corrected",
            &corrected(|p| p.e2dnde_ul95),
        ));
    }

    Table::new("SED", columns)
}

fn parameters_table(model: SpectralModel, run: &McmcRun, pivot_log: f64) -> Table {
    let mut names: Vec<String> = run.intervals.iter().map(|ci| ci.label.clone()).collect();
    let mut values: Vec<f64> = run.intervals.iter().map(|ci| ci.median).collect();
    let mut minus: Vec<f64> = run.intervals.iter().map(|ci| ci.minus).collect();
    let mut plus: Vec<f64> = run.intervals.iter().map(|ci| ci.plus).collect();

    // Fixed rows carried for completeness: the pivot (except for the model
    // that samples its own peak energy) and the frozen cutoff index.
    if model != SpectralModel::LogParabola2 {
        names.push("Ep = 2*Emin (log scale)".to_string());
        values.push(pivot_log);
        minus.push(0.0);
        plus.push(0.0);
    }
    if model == SpectralModel::SuperExpCutoffFixedB {
        names.push("B (fixed)".to_string());
        values.push(1.0);
        minus.push(0.0);
        plus.push(0.0);
    }

    Table::new(
        "MCMC Parameters",
        vec![
            Column::text("Parameter", names),
            Column::numeric("Value", &values),
            Column::numeric("error_minus", &minus),
            Column::numeric("error_plus", &plus),
        ],
    )
}

fn posterior_table(model: SpectralModel, run: &McmcRun) -> Table {
    let names = models::posterior_column_names(model);
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(c, name)| {
            let values: Vec<f64> = run.samples.column(c).iter().copied().collect();
            Column::numeric(name, &values)
        })
        .collect();
    Table::new("MCMC Posterior dist.", columns)
}

/// VHE rows in MeV units with the EBL absorption divided out. Rows with an
/// undefined upper limit were never part of the fit and are not exported.
fn vhe_corrected_table(vhe: &[VhePoint], absorption: &dyn Absorption, redshift: f64) -> Table {
    const TEV_TO_MEV: f64 = 1e6;

    let kept: Vec<&VhePoint> = vhe.iter().filter(|p| !p.e2dnde_ul.is_nan()).collect();
    let energies: Vec<f64> = kept.iter().map(|p| p.e_ref * TEV_TO_MEV).collect();
    let factors = absorption.evaluate(&energies, redshift);

    let mut e_min = Vec::with_capacity(kept.len());
    let mut e_max = Vec::with_capacity(kept.len());
    let mut flux = Vec::with_capacity(kept.len());
    let mut flux_err = Vec::with_capacity(kept.len());
    let mut ul95 = Vec::with_capacity(kept.len());
    let mut ts = Vec::with_capacity(kept.len());

    for (p, &a) in kept.iter().zip(&factors) {
        e_min.push(p.e_min * TEV_TO_MEV);
        e_max.push(p.e_max * TEV_TO_MEV);
        ts.push(p.ts);
        if p.ts > TS_MIN {
            flux.push(p.e2dnde * TEV_TO_MEV / a);
            flux_err.push(p.e2dnde_err * TEV_TO_MEV / a);
            ul95.push(f64::NAN);
        } else {
            flux.push(f64::NAN);
            flux_err.push(f64::NAN);
            ul95.push(p.e2dnde_ul * TEV_TO_MEV / a);
        }
    }

    Table::new(
        "VHE data corrected for EBL",
        vec![
            Column::numeric("energy", &energies),
            Column::numeric("energy_min", &e_min),
            Column::numeric("energy_max", &e_max),
            Column::numeric("e2dnde_VHE", &flux),
            Column::numeric("e2dnde_VHE_err", &flux_err),
            Column::numeric("e2dnde_VHE_UL95", &ul95),
            Column::numeric("TS", &ts),
        ],
    )
}

/// Thin the flattened posterior to `n_curves` model curves for the quickplot.
fn posterior_spread(
    run: &McmcRun,
    pivot_log: f64,
    x_range: (f64, f64),
    n_curves: usize,
) -> Result<Vec<(Vec<f64>, Vec<f64>)>, AppError> {
    let n = run.samples.nrows();
    if n == 0 || n_curves == 0 {
        return Ok(Vec::new());
    }
    let stride = (n / n_curves).max(1);
    let mut out = Vec::new();
    for r in (0..n).step_by(stride).take(n_curves) {
        let theta: Vec<f64> = run.samples.row(r).iter().copied().collect();
        out.push(models::curve_log_e2dnde(
            run.model, &theta, pivot_log, x_range.0, x_range.1, 200,
        )?);
    }
    Ok(out)
}

/// Engine that merges pre-computed sub-bin tables from a directory, named
/// after each bin's artifact directory (`bin_NNNN.csv`).
pub struct SubTableEngine {
    dir: PathBuf,
}

impl SubTableEngine {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl LightCurveEngine for SubTableEngine {
    fn refit(
        &mut self,
        bin: &LightCurveBin,
        n_sub: usize,
        cfg: &SubBinConfig,
    ) -> Result<Vec<LightCurveBin>, AppError> {
        let bin_name = cfg
            .workdir
            .parent()
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::new(2, "Malformed sub-bin configuration path."))?;
        let path = self.dir.join(format!("{bin_name}.csv"));
        let table = data::load_light_curve(&path)?;

        if table.bins.len() != n_sub {
            return Err(AppError::new(
                2,
                format!(
                    "{}: expected {n_sub} sub-bins, found {}.",
                    path.display(),
                    table.bins.len()
                ),
            ));
        }
        const EPS: f64 = 1e-6;
        for sub in &table.bins {
            if sub.tmin_mjd < bin.tmin_mjd - EPS || sub.tmax_mjd > bin.tmax_mjd + EPS {
                return Err(AppError::new(
                    2,
                    format!("{}: sub-bin outside the parent bin's bounds.", path.display()),
                ));
            }
        }
        Ok(table.bins)
    }
}

/// Run an adaptive pass: always plans; applies and merges when a sub-table
/// directory is configured.
pub fn run_adaptive(config: &AdaptiveRunConfig) -> Result<AdaptiveResult, AppError> {
    let table = data::load_light_curve(&config.lc_path)?;

    let plan = plan_split(
        &table.bins,
        config.ts_threshold,
        &config.bins_dir,
        config.iteration,
        config.supports_multiprocess,
        config.n_threads,
    )?;

    let plan_path = match &config.plan_out {
        Some(path) => {
            write_plan_json(path, &plan)?;
            Some(path.clone())
        }
        None => None,
    };

    let Some(sub_tables) = &config.sub_tables else {
        return Ok(AdaptiveResult {
            bins: table.bins,
            plan,
            outcome: None,
            plan_path,
            merged_path: None,
            plot_path: None,
        });
    };

    let mut engine = SubTableEngine::new(sub_tables.clone());
    let outcome = apply_plan(&table.bins, &plan, &mut engine)?;

    let merged_path = config
        .out_path
        .clone()
        .unwrap_or_else(|| format!("{}.csv", adaptive_table_name(config.iteration)).into());
    write_light_curve_csv(&merged_path, &outcome.bins)?;

    let plot_path = merged_path.with_extension("svg");
    plot_light_curve_svg(
        &plot_path,
        &outcome.bins,
        &adaptive_table_name(config.iteration),
    )?;

    Ok(AdaptiveResult {
        bins: table.bins,
        plan,
        outcome: Some(outcome),
        plan_path,
        merged_path: Some(merged_path),
        plot_path: Some(plot_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gsed-pipeline-{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean power-law SED: `n_det` detected bins plus one trailing upper limit.
    fn write_sed_csv(path: &Path, n_det: usize) -> Vec<f64> {
        let emin = 100.0f64;
        let ep = (2.0 * emin).log10();
        let theta = [-11.0, 2.2];
        let mut rows = String::from("e_ctr,e_min,e_max,e2dnde,e2dnde_err,e2dnde_ul95,ts\n");
        let mut energies = Vec::new();
        for i in 0..n_det {
            let x = 2.4 + 0.5 * i as f64;
            let e = 10f64.powf(x);
            energies.push(e);
            let log_e2 = theta[0] - theta[1] * (x - ep) + 2.0 * x;
            let f = 10f64.powf(log_e2);
            rows.push_str(&format!(
                "{e},{},{},{f},{},,{}\n",
                0.8 * e,
                1.2 * e,
                0.1 * f,
                40.0
            ));
        }
        let e_ul = 10f64.powf(2.4 + 0.5 * n_det as f64);
        rows.push_str(&format!("{e_ul},{},{},,,1e-7,2.0\n", 0.8 * e_ul, 1.2 * e_ul));
        std::fs::write(path, rows).unwrap();
        energies
    }

    fn small_config(dir: &Path, n_det: usize) -> SedRunConfig {
        let sed_path = dir.join("sed.csv");
        write_sed_csv(&sed_path, n_det);
        SedRunConfig {
            sed_path,
            vhe_path: None,
            redshift_text: "0".to_string(),
            ebl_label: "dominguez".to_string(),
            absorption_path: None,
            model: SpectralModel::PowerLaw,
            source_name: "test source".to_string(),
            emin: 100.0,
            emax: 3e5,
            mcmc: McmcSettings {
                n_walkers: 20,
                burn_in: 10,
                n_iterations: 20,
                ..McmcSettings::default()
            },
            out_dir: dir.join("out"),
        }
    }

    struct HalfAbsorption;

    impl Absorption for HalfAbsorption {
        fn evaluate(&self, energies_mev: &[f64], _redshift: f64) -> Vec<f64> {
            energies_mev.iter().map(|_| 0.5).collect()
        }
    }

    struct PanicAbsorption;

    impl Absorption for PanicAbsorption {
        fn evaluate(&self, _energies_mev: &[f64], _redshift: f64) -> Vec<f64> {
            panic!("absorption evaluator must not be called at z = 0");
        }
    }

    #[test]
    fn absorption_is_never_evaluated_at_zero_redshift() {
        let dir = test_dir("z-zero");
        let config = small_config(&dir, 5);
        let outcome = run_sed_fit_with(&config, Some(&PanicAbsorption)).unwrap();
        assert!(outcome.run.is_some());
        let doc = crate::io::read_result_doc(&outcome.doc_path).unwrap();
        assert!(doc.table("SED").unwrap().column("e2dnde_EBL_corrected").is_none());
        assert!(doc.ebl_model.is_none());
    }

    #[test]
    fn too_few_detections_writes_the_table_without_a_fit() {
        let dir = test_dir("few-detections");
        let config = small_config(&dir, 2);

        let outcome = run_sed_fit(&config).unwrap();
        assert!(outcome.run.is_none());
        assert!(outcome.warnings.iter().any(|w| w.contains("without a fit")));

        let doc = crate::io::read_result_doc(&outcome.doc_path).unwrap();
        assert!(doc.table("SED").is_some());
        assert!(doc.table("MCMC Parameters").is_none());
        assert!(doc.table("MCMC Posterior dist.").is_none());
    }

    #[test]
    fn full_run_persists_the_table_contract() {
        let dir = test_dir("full-run");
        let config = small_config(&dir, 5);

        let outcome = run_sed_fit(&config).unwrap();
        let run = outcome.run.as_ref().unwrap();
        assert_eq!(run.samples.nrows(), 20 * 20);

        let doc = crate::io::read_result_doc(&outcome.doc_path).unwrap();
        let names: Vec<&str> = doc.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["SED", "MCMC Parameters", "MCMC Posterior dist."]);

        // PowerLaw: two sampled parameters plus the fixed pivot row.
        let params = doc.table("MCMC Parameters").unwrap();
        assert_eq!(params.column("Parameter").unwrap().len(), 3);
        let values = params.column("Value").unwrap().as_numeric().unwrap();
        assert!((values[2] - (200.0f64).log10()).abs() < 1e-12);

        let posterior = doc.table("MCMC Posterior dist.").unwrap();
        assert_eq!(posterior.columns.len(), 2);
        assert_eq!(posterior.columns[0].name, "N0 distribution (log scale)");
        assert_eq!(posterior.columns[0].len(), 400);

        assert!(outcome.sed_plot_path.is_some());
    }

    #[test]
    fn unreadable_vhe_table_degrades_to_primary_only() {
        let dir = test_dir("vhe-fallback");
        let mut config = small_config(&dir, 5);
        config.vhe_path = Some(dir.join("does-not-exist.csv"));

        let outcome = run_sed_fit(&config).unwrap();
        assert!(outcome.run.is_some());
        assert!(!outcome.fused.include_vhe);
        assert!(outcome.warnings.iter().any(|w| w.contains("VHE table unusable")));
    }

    #[test]
    fn redshift_correction_scales_fluxes_and_adds_tables() {
        let dir = test_dir("ebl");
        let mut config = small_config(&dir, 5);
        config.redshift_text = "0.31".to_string();

        let vhe_path = dir.join("vhe.csv");
        std::fs::write(
            &vhe_path,
            "e_ref,e_min,e_max,e2dnde,e2dnde_err,e2dnde_ul,ts\n\
             0.2,0.1,0.4,3.0e-11,4.0e-12,5.0e-11,26.0\n\
             0.8,0.4,1.6,nan,nan,nan,2.0\n",
        )
        .unwrap();
        config.vhe_path = Some(vhe_path);

        let outcome = run_sed_fit_with(&config, Some(&HalfAbsorption)).unwrap();

        // The fit saw deabsorbed fluxes: observed / 0.5.
        let doc = crate::io::read_result_doc(&outcome.doc_path).unwrap();
        let sed = doc.table("SED").unwrap();
        let observed = sed.column("e2dnde").unwrap().as_numeric().unwrap();
        let corrected = sed
            .column("e2dnde_EBL_corrected")
            .unwrap()
            .as_numeric()
            .unwrap();
        assert!((corrected[0] - 2.0 * observed[0]).abs() < 1e-18);
        assert!((outcome.fused.e2dnde[0] - 2.0 * observed[0]).abs() < 1e-18);

        let vhe = doc.table("VHE data corrected for EBL").unwrap();
        let energy = vhe.column("energy").unwrap().as_numeric().unwrap();
        // Only the row with a defined upper limit survives, in MeV.
        assert_eq!(energy.len(), 1);
        assert!((energy[0] - 2e5).abs() < 1e-6);
        let flux = vhe.column("e2dnde_VHE").unwrap().as_numeric().unwrap();
        assert!((flux[0] - 3.0e-11 * 1e6 / 0.5).abs() < 1e-15);

        assert_eq!(doc.ebl_model.as_deref(), Some("Dominguez et al. (2011)"));
    }

    #[test]
    fn missing_absorption_table_at_nonzero_redshift_is_an_input_error() {
        let dir = test_dir("no-absorption");
        let mut config = small_config(&dir, 5);
        config.redshift_text = "0.31".to_string();
        let err = run_sed_fit(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn demo_runs_end_to_end() {
        let dir = test_dir("demo");
        let outcome = run_demo(10, SpectralModel::PowerLaw, 7, &dir).unwrap();
        let run = outcome.run.unwrap();
        assert_eq!(run.samples.nrows(), 150_000);
        assert!(outcome.doc_path.exists());
        assert!(outcome.sed_plot_path.is_some());
    }

    #[test]
    fn adaptive_pass_merges_sub_tables_per_plan() {
        let dir = test_dir("adaptive");
        let lc_path = dir.join("lc.csv");
        std::fs::write(
            &lc_path,
            "tmin_mjd,tmax_mjd,ts,flux,flux_err,flux_ul95,eflux,eflux_err,eflux_ul95\n\
             59000,59030,31.0,2.1e-8,3.0e-9,,1.2e-5,1.5e-6,\n\
             59030,59060,5.0,,,4.0e-8,,,2.0e-5\n",
        )
        .unwrap();

        let sub_dir = dir.join("sub-tables");
        std::fs::create_dir_all(&sub_dir).unwrap();
        std::fs::write(
            sub_dir.join("bin_0000.csv"),
            "tmin_mjd,tmax_mjd,ts,flux,flux_err,flux_ul95,eflux,eflux_err,eflux_ul95\n\
             59000,59010,12.0,2.0e-8,4.0e-9,,1.0e-5,2.0e-6,\n\
             59010,59020,11.0,2.2e-8,4.0e-9,,1.1e-5,2.0e-6,\n\
             59020,59030,10.0,2.1e-8,4.0e-9,,1.2e-5,2.0e-6,\n",
        )
        .unwrap();

        let config = AdaptiveRunConfig {
            lc_path,
            ts_threshold: 10.0,
            bins_dir: dir.join("bins"),
            plan_out: Some(dir.join("plan.json")),
            sub_tables: Some(sub_dir),
            iteration: 1,
            out_path: Some(dir.join("merged.csv")),
            supports_multiprocess: false,
            n_threads: 2,
        };

        let result = run_adaptive(&config).unwrap();
        assert_eq!(result.plan.entries.len(), 1);
        assert_eq!(result.plan.entries[0].sub_bin_count, 3);

        let outcome = result.outcome.unwrap();
        assert_eq!(outcome.bins.len(), 4);
        for w in outcome.bins.windows(2) {
            assert!(w[0].tmin_mjd <= w[1].tmin_mjd);
        }

        assert!(result.plan_path.unwrap().exists());
        assert!(result.merged_path.unwrap().exists());
        assert!(result.plot_path.unwrap().exists());

        // The written plan reads back and names the pass.
        let plan = crate::io::read_plan_json(&dir.join("plan.json")).unwrap();
        assert_eq!(plan.iteration, 1);
        assert_eq!(adaptive_table_name(plan.iteration), "Adaptive-binning_light_curve_001");
    }

    #[test]
    fn plan_only_pass_leaves_the_table_untouched() {
        let dir = test_dir("plan-only");
        let lc_path = dir.join("lc.csv");
        std::fs::write(
            &lc_path,
            "tmin_mjd,tmax_mjd,ts,flux,flux_err,flux_ul95,eflux,eflux_err,eflux_ul95\n\
             59000,59030,12.0,2.1e-8,3.0e-9,,1.2e-5,1.5e-6,\n",
        )
        .unwrap();

        let config = AdaptiveRunConfig {
            lc_path,
            ts_threshold: 10.0,
            bins_dir: dir.join("bins"),
            plan_out: None,
            sub_tables: None,
            iteration: 2,
            out_path: None,
            supports_multiprocess: true,
            n_threads: 4,
        };

        let result = run_adaptive(&config).unwrap();
        assert!(result.plan.is_empty());
        assert!(result.outcome.is_none());
        assert!(result.merged_path.is_none());
        assert_eq!(result.bins.len(), 1);
    }
}

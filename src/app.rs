//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads input tables (or generates the demo dataset)
//! - runs the SED fit or the adaptive light-curve pass
//! - prints reports and writes documents/plots

use clap::Parser;

use crate::cli::{AdaptiveArgs, Cli, Command, DemoArgs, SedArgs};
use crate::domain::{AdaptiveRunConfig, McmcSettings, SedRunConfig};
use crate::error::AppError;
use crate::io::adaptive_table_name;

pub mod pipeline;

/// Entry point for the `gsed` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Sed(args) => handle_sed(args),
        Command::Adaptive(args) => handle_adaptive(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_sed(args: SedArgs) -> Result<(), AppError> {
    let config = sed_config_from_args(&args);
    let outcome = pipeline::run_sed_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(
            &outcome.ctx,
            &outcome.fused,
            outcome.run.as_ref(),
            &outcome.warnings,
        )
    );
    println!("Result document: {}", outcome.doc_path.display());
    if let Some(plot) = &outcome.sed_plot_path {
        println!("Quickplot: {}", plot.display());
    }
    Ok(())
}

fn handle_adaptive(args: AdaptiveArgs) -> Result<(), AppError> {
    let config = adaptive_config_from_args(&args);
    let result = pipeline::run_adaptive(&config)?;

    println!(
        "{}",
        crate::report::format_adaptive_summary(&result.plan, result.outcome.as_ref())
    );
    if let Some(path) = &result.plan_path {
        println!("Split plan: {}", path.display());
    }
    if let Some(path) = &result.merged_path {
        println!("Merged table: {}", path.display());
    }
    if let Some(path) = &result.plot_path {
        println!("Quickplot: {}", path.display());
    }
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let outcome = pipeline::run_demo(args.bins, args.model, args.seed, &args.out)?;

    println!(
        "{}",
        crate::report::format_fit_summary(
            &outcome.ctx,
            &outcome.fused,
            outcome.run.as_ref(),
            &outcome.warnings,
        )
    );
    println!("Result document: {}", outcome.doc_path.display());
    if let Some(plot) = &outcome.sed_plot_path {
        println!("Quickplot: {}", plot.display());
    }
    Ok(())
}

fn sed_config_from_args(args: &SedArgs) -> SedRunConfig {
    SedRunConfig {
        sed_path: args.sed.clone(),
        vhe_path: args.vhe.clone(),
        redshift_text: args.redshift.clone(),
        ebl_label: args.ebl.clone(),
        absorption_path: args.absorption.clone(),
        model: args.model,
        source_name: args.source.clone(),
        emin: args.emin,
        emax: args.emax,
        mcmc: McmcSettings {
            n_walkers: args.walkers,
            burn_in: args.burn_in,
            n_iterations: args.iterations,
            seed: args.seed,
            ..McmcSettings::default()
        },
        out_dir: args.out.clone(),
    }
}

fn adaptive_config_from_args(args: &AdaptiveArgs) -> AdaptiveRunConfig {
    let out_path = args
        .out
        .clone()
        .or_else(|| Some(format!("{}.csv", adaptive_table_name(args.iteration)).into()));
    AdaptiveRunConfig {
        lc_path: args.lc.clone(),
        ts_threshold: args.threshold,
        bins_dir: args.bins_dir.clone(),
        plan_out: args.plan_out.clone(),
        sub_tables: args.sub_tables.clone(),
        iteration: args.iteration,
        out_path,
        supports_multiprocess: args.multiprocess,
        n_threads: args.threads,
    }
}

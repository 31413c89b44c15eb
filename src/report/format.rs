//! Formatted terminal output.
//!
//! Formatting lives in one place so the numeric code stays clean and output
//! changes are localized.

use crate::domain::FitContext;
use crate::fusion::FusedSed;
use crate::lightcurve::{SplitOutcome, SplitPlan};
use crate::mcmc::{CredibleInterval, McmcRun};

/// One parameter line: `median − minus + plus` in log/linear units as stored.
pub fn format_interval(ci: &CredibleInterval) -> String {
    format!(
        "{}: {:.4} -{:.4} +{:.4}",
        ci.label, ci.median, ci.minus, ci.plus
    )
}

/// Full SED-fit run summary.
pub fn format_fit_summary(
    ctx: &FitContext,
    fused: &FusedSed,
    run: Option<&McmcRun>,
    warnings: &[String],
) -> String {
    let mut out = String::new();

    out.push_str("=== gsed - SED fit ===\n");
    out.push_str(&format!("Source: {}\n", ctx.source_name));
    out.push_str(&format!("Model: {}\n", ctx.model.display_name()));
    out.push_str(&format!(
        "Energy range: [{:.1}, {:.1}] MeV (pivot log10 Ep = {:.3})\n",
        ctx.emin,
        ctx.emax,
        ctx.pivot_log()
    ));
    if ctx.redshift > 0.0 {
        out.push_str(&format!(
            "Redshift: {} | EBL: {}\n",
            ctx.redshift,
            ctx.ebl_model.label()
        ));
    } else {
        out.push_str("Redshift: 0 (no EBL correction)\n");
    }

    out.push_str(&format!(
        "Data: {} detections ({} VHE) | {} upper limits ({} VHE)\n",
        fused.energy.len(),
        fused.n_vhe,
        fused.ul_energy.len(),
        fused.n_vhe_ul,
    ));

    for w in warnings {
        out.push_str(&format!("{w}\n"));
    }

    match run {
        Some(run) => {
            out.push_str(&format!(
                "\nPosterior ({} samples):\n",
                run.samples.nrows()
            ));
            for ci in &run.intervals {
                out.push_str(&format!("  {}\n", format_interval(ci)));
            }
            out.push_str(&format!("  MAP: {}\n", fmt_vec(&run.map)));
        }
        None => {
            out.push_str(
                "\nFewer than 3 detected bins: the SED table is written as-is, no fit performed.\n",
            );
        }
    }

    out
}

/// Adaptive-pass summary: which bins split and what came out.
pub fn format_adaptive_summary(plan: &SplitPlan, outcome: Option<&SplitOutcome>) -> String {
    let mut out = String::new();

    out.push_str("=== gsed - adaptive light-curve binning ===\n");
    out.push_str(&format!(
        "Pass {:03} | TS threshold = {}\n",
        plan.iteration, plan.ts_threshold
    ));

    if plan.entries.is_empty() {
        out.push_str("No bins exceed twice the threshold; table left unchanged.\n");
        return out;
    }

    out.push_str(&format!("{} bin(s) selected for splitting:\n", plan.entries.len()));
    for e in &plan.entries {
        out.push_str(&format!(
            "  bin {:>4}  TS={:<8.1} -> {} sub-bins\n",
            e.bin_index, e.ts, e.sub_bin_count
        ));
    }

    if let Some(outcome) = outcome {
        out.push_str(&format!(
            "Merged table: {} bins ({} new sub-bins).\n",
            outcome.bins.len(),
            outcome.n_sub_bins
        ));
    }

    out
}

fn fmt_vec(v: &[f64]) -> String {
    let items: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", items.join(", "))
}

//! Burn-in/production orchestration and posterior summaries.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{McmcSettings, SpectralModel};
use crate::error::AppError;
use crate::fusion::FitData;
use crate::math::quantile;
use crate::mcmc::{EnsembleSampler, LogProb};
use crate::models;

/// Median with asymmetric 1σ errors from the 16/50/84 percentiles.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CredibleInterval {
    pub label: String,
    pub median: f64,
    pub minus: f64,
    pub plus: f64,
}

/// Result of one sampling run.
#[derive(Debug, Clone)]
pub struct McmcRun {
    pub model: SpectralModel,
    /// Flattened posterior: rows = samples, columns = parameters.
    pub samples: DMatrix<f64>,
    pub ln_probs: Vec<f64>,
    /// Sample with the highest log-posterior.
    pub map: Vec<f64>,
    pub intervals: Vec<CredibleInterval>,
    /// Dense MAP model curve: `x = log10(E)`, `y = log10(E²dN/dE)`.
    pub curve_x: Vec<f64>,
    pub curve_log_e2dnde: Vec<f64>,
}

struct SedLogProb<'a> {
    model: SpectralModel,
    pivot_log: f64,
    data: &'a FitData,
}

impl LogProb for SedLogProb<'_> {
    fn ln_prob(&self, theta: &[f64]) -> f64 {
        models::ln_posterior(
            self.model,
            theta,
            self.pivot_log,
            &self.data.x,
            &self.data.y,
            &self.data.yerr,
        )
    }
}

/// Sample the posterior of `model` given log-space data vectors.
///
/// Walkers start from the model's starting vector perturbed by independent
/// Gaussian noise, burn in for `settings.burn_in` iterations (discarded,
/// walker state kept), then run `settings.n_iterations` production
/// iterations. No convergence diagnostic is applied; callers that need a
/// gate must run their own check on the returned chain.
pub fn run_mcmc(
    model: SpectralModel,
    pivot_log: f64,
    data: &FitData,
    x_range: (f64, f64),
    settings: &McmcSettings,
) -> Result<McmcRun, AppError> {
    if data.x.is_empty() {
        return Err(AppError::new(3, "No detection points to fit."));
    }
    if data.yerr.iter().any(|e| !e.is_finite() || *e <= 0.0) {
        return Err(AppError::new(2, "Fit errors must be finite and > 0."));
    }

    let ndim = model.param_count();
    let start = models::initial_guess(model);

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let noise = Normal::new(0.0, settings.init_sigma)
        .map_err(|e| AppError::new(2, format!("Walker init distribution error: {e}")))?;
    let initial: Vec<Vec<f64>> = (0..settings.n_walkers)
        .map(|_| start.iter().map(|&s| s + noise.sample(&mut rng)).collect())
        .collect();

    let target = SedLogProb {
        model,
        pivot_log,
        data,
    };
    let mut sampler = EnsembleSampler::new(&target, initial, settings.seed ^ 0x5eed)?;

    sampler.run(settings.burn_in);
    sampler.reset();
    sampler.run(settings.n_iterations);

    let (chain, ln_probs) = sampler.flat_chain();
    let n_rows = chain.len();
    let samples = DMatrix::from_fn(n_rows, ndim, |r, c| chain[r][c]);

    let map_idx = argmax(ln_probs)
        .ok_or_else(|| AppError::new(4, "Empty chain after production run."))?;
    let map = chain[map_idx].clone();

    let labels = models::summary_labels(model);
    let mut intervals = Vec::with_capacity(ndim);
    for c in 0..ndim {
        let column: Vec<f64> = samples.column(c).iter().copied().collect();
        let p16 = quantile(&column, 0.16);
        let p50 = quantile(&column, 0.50);
        let p84 = quantile(&column, 0.84);
        let (Some(p16), Some(p50), Some(p84)) = (p16, p50, p84) else {
            return Err(AppError::new(4, "Quantile extraction failed on posterior column."));
        };
        intervals.push(CredibleInterval {
            label: labels[c].to_string(),
            median: p50,
            minus: p50 - p16,
            plus: p84 - p50,
        });
    }

    let (curve_x, curve_log_e2dnde) =
        models::curve_log_e2dnde(model, &map, pivot_log, x_range.0, x_range.1, 1000)?;

    Ok(McmcRun {
        model,
        samples,
        ln_probs: ln_probs.to_vec(),
        map,
        intervals,
        curve_x,
        curve_log_e2dnde,
    })
}

fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

//! Synthetic SED generation for the demo command.
//!
//! Draws a power-law spectrum over a log-spaced energy grid, adds Gaussian
//! scatter in log flux, and degrades the faint tail into upper-limit bins so
//! the demo exercises the full detection/upper-limit path.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::SedPoint;
use crate::error::AppError;
use crate::math::log_space;

#[derive(Debug, Clone)]
pub struct SampleSed {
    pub points: Vec<SedPoint>,
    /// True parameters the sample was drawn from: `[N0, alpha]` in log space.
    pub truth: [f64; 2],
    pub emin: f64,
    pub emax: f64,
}

/// Generate `n_bins` synthetic power-law SED bins between `emin` and `emax`
/// (MeV). Deterministic for a given seed.
pub fn generate_sample_sed(
    n_bins: usize,
    emin: f64,
    emax: f64,
    seed: u64,
) -> Result<SampleSed, AppError> {
    if n_bins < 4 {
        return Err(AppError::new(2, "Demo SED needs at least 4 bins."));
    }
    if !(emin.is_finite() && emax.is_finite() && emin > 0.0 && emax > emin) {
        return Err(AppError::new(2, "Invalid energy range for demo SED."));
    }

    let truth = [-11.2, 2.1];
    let pivot = (2.0 * emin).log10();

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.04)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    // Bin edges: n_bins + 1 log-spaced energies.
    let edges_log = log_space(emin.log10(), emax.log10(), n_bins + 1)?;
    let rel_err = 0.12;

    let mut points = Vec::with_capacity(n_bins);
    for w in edges_log.windows(2) {
        let e_min = 10f64.powf(w[0]);
        let e_max = 10f64.powf(w[1]);
        let e_ctr = (e_min * e_max).sqrt();
        let x = e_ctr.log10();

        // log10(E² dN/dE) for a power law in dN/dE space.
        let log_e2dnde = truth[0] - truth[1] * (x - pivot) + 2.0 * x + noise.sample(&mut rng);
        let e2dnde = 10f64.powf(log_e2dnde);

        // The two highest-energy bins degrade into upper limits.
        let faint = e_ctr > 10f64.powf(edges_log[edges_log.len() - 3]);
        let ts = if faint {
            rng.gen_range(0.5..6.0)
        } else {
            rng.gen_range(25.0..400.0)
        };

        if faint {
            points.push(SedPoint {
                e_ctr,
                e_min,
                e_max,
                e2dnde: f64::NAN,
                e2dnde_err: f64::NAN,
                e2dnde_ul95: 2.0 * e2dnde,
                ts,
            });
        } else {
            points.push(SedPoint {
                e_ctr,
                e_min,
                e_max,
                e2dnde,
                e2dnde_err: rel_err * e2dnde,
                e2dnde_ul95: f64::NAN,
                ts,
            });
        }
    }

    Ok(SampleSed {
        points,
        truth,
        emin,
        emax,
    })
}

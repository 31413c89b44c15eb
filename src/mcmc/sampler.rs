//! Affine-invariant ensemble sampler (emcee-style stretch move).
//!
//! The ensemble is split into two halves; each half is updated against the
//! other's current positions. Within one half the walkers are independent,
//! so their log-posterior evaluations run in parallel via rayon. Iterations
//! themselves are strictly sequential: each iteration's walker positions
//! depend on the previous iteration's, and none may be skipped or reordered.
//!
//! Determinism: all random draws come from a single seeded `StdRng` and are
//! made sequentially before the parallel evaluation step, so results are
//! reproducible regardless of thread scheduling.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::error::AppError;

/// Log-posterior evaluated by the sampler. `Sync` so walker evaluations can
/// be distributed across a thread pool.
pub trait LogProb: Sync {
    fn ln_prob(&self, theta: &[f64]) -> f64;
}

/// Stretch-move scale parameter (the conventional `a = 2`).
const STRETCH_A: f64 = 2.0;

pub struct EnsembleSampler<'a> {
    log_prob: &'a dyn LogProb,
    ndim: usize,
    n_walkers: usize,
    positions: Vec<Vec<f64>>,
    ln_probs: Vec<f64>,
    rng: StdRng,
    // Flattened chain: `n_recorded × n_walkers` rows of `ndim` parameters.
    flat: Vec<Vec<f64>>,
    flat_ln_probs: Vec<f64>,
}

struct Draw {
    z: f64,
    partner: usize,
    accept_u: f64,
}

impl<'a> EnsembleSampler<'a> {
    /// Create a sampler from initial walker positions.
    ///
    /// Requires an even walker count of at least `2·ndim + 2` so each
    /// half-ensemble spans the parameter space.
    pub fn new(
        log_prob: &'a dyn LogProb,
        initial: Vec<Vec<f64>>,
        seed: u64,
    ) -> Result<Self, AppError> {
        let n_walkers = initial.len();
        if n_walkers < 4 {
            return Err(AppError::new(2, "Ensemble needs at least 4 walkers."));
        }
        if n_walkers % 2 != 0 {
            return Err(AppError::new(2, "Walker count must be even."));
        }
        let ndim = initial[0].len();
        if ndim == 0 || initial.iter().any(|p| p.len() != ndim) {
            return Err(AppError::new(2, "Walker positions must share a nonzero dimension."));
        }
        if n_walkers < 2 * ndim + 2 {
            return Err(AppError::new(
                2,
                format!("Need at least {} walkers for {ndim} parameters.", 2 * ndim + 2),
            ));
        }

        let ln_probs = initial.par_iter().map(|p| log_prob.ln_prob(p)).collect();
        Ok(Self {
            log_prob,
            ndim,
            n_walkers,
            positions: initial,
            ln_probs,
            rng: StdRng::seed_from_u64(seed),
            flat: Vec::new(),
            flat_ln_probs: Vec::new(),
        })
    }

    pub fn n_walkers(&self) -> usize {
        self.n_walkers
    }

    /// Discard the recorded chain (burn-in reset). Walker state is kept.
    pub fn reset(&mut self) {
        self.flat.clear();
        self.flat_ln_probs.clear();
    }

    /// Advance the ensemble by `n_iterations`, recording every post-move
    /// walker position into the flat chain.
    pub fn run(&mut self, n_iterations: usize) {
        for _ in 0..n_iterations {
            self.step();
            for (pos, &lp) in self.positions.iter().zip(self.ln_probs.iter()) {
                self.flat.push(pos.clone());
                self.flat_ln_probs.push(lp);
            }
        }
    }

    /// Flattened chain: one row per recorded walker state.
    pub fn flat_chain(&self) -> (&[Vec<f64>], &[f64]) {
        (&self.flat, &self.flat_ln_probs)
    }

    fn step(&mut self) {
        let half = self.n_walkers / 2;
        // First half moves against the second, then the second against the
        // (already updated) first.
        self.move_half(0, half, half, self.n_walkers);
        self.move_half(half, self.n_walkers, 0, half);
    }

    fn move_half(&mut self, lo: usize, hi: usize, other_lo: usize, other_hi: usize) {
        let n_other = other_hi - other_lo;

        // Draws are taken sequentially from the single RNG; the parallel part
        // below is pure computation.
        let draws: Vec<Draw> = (lo..hi)
            .map(|_| {
                let u: f64 = self.rng.r#gen();
                let z = ((STRETCH_A - 1.0) * u + 1.0).powi(2) / STRETCH_A;
                Draw {
                    z,
                    partner: other_lo + self.rng.gen_range(0..n_other),
                    accept_u: self.rng.r#gen(),
                }
            })
            .collect();

        let ndim = self.ndim;
        let positions = &self.positions;
        let ln_probs = &self.ln_probs;
        let log_prob = self.log_prob;

        let updates: Vec<Option<(Vec<f64>, f64)>> = (lo..hi)
            .into_par_iter()
            .zip(draws.par_iter())
            .map(|(w, draw)| {
                let walker = &positions[w];
                let partner = &positions[draw.partner];
                let mut proposal = vec![0.0; ndim];
                for d in 0..ndim {
                    proposal[d] = partner[d] + draw.z * (walker[d] - partner[d]);
                }
                let lp_new = log_prob.ln_prob(&proposal);
                let ln_accept = (ndim as f64 - 1.0) * draw.z.ln() + lp_new - ln_probs[w];
                if draw.accept_u.ln() <= ln_accept {
                    Some((proposal, lp_new))
                } else {
                    None
                }
            })
            .collect();

        for (w, update) in (lo..hi).zip(updates) {
            if let Some((proposal, lp)) = update {
                self.positions[w] = proposal;
                self.ln_probs[w] = lp;
            }
        }
    }
}

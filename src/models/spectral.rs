//! Spectral model evaluation, priors, and the Gaussian log-likelihood.
//!
//! All evaluation happens in `log10` space. The sampler relies on three
//! primitive operations:
//! - evaluate the model at `x = log10(E/MeV)` for a parameter vector
//! - evaluate the log-uniform prior (0 inside the box, −∞ outside)
//! - combine both with the data into a log-posterior
//!
//! Model convention: `LogParabola2` natively returns `log10(E²dN/dE)` with its
//! own fitted pivot; every other model natively returns `log10(dN/dE)` around
//! the fixed pivot `ep = log10(2·Emin)`. Callers that need the `E²dN/dE`
//! representation should go through `evaluate_log_e2dnde`, which applies the
//! `+2x` offset where required, instead of special-casing models themselves.

use crate::domain::SpectralModel;
use crate::error::AppError;
use crate::math::log_space;

/// Which flux representation a model's native output lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxSpace {
    /// `log10(dN/dE)`
    Dnde,
    /// `log10(E² dN/dE)`
    E2Dnde,
}

/// The flux space of `evaluate`'s return value for the given model.
pub fn native_space(model: SpectralModel) -> FluxSpace {
    match model {
        SpectralModel::LogParabola2 => FluxSpace::E2Dnde,
        _ => FluxSpace::Dnde,
    }
}

/// Evaluate the model in its native flux space.
///
/// `ep` is the fixed pivot `log10(2·Emin)`; `LogParabola2` ignores it because
/// its pivot is a fitted parameter.
///
/// # Panics
/// Panics if `theta` does not have length `model.param_count()`. Callers
/// should size the parameter vector correctly.
pub fn evaluate(model: SpectralModel, theta: &[f64], ep: f64, x: f64) -> f64 {
    match model {
        SpectralModel::PowerLaw => {
            let (n0, alpha) = (theta[0], theta[1]);
            n0 - alpha * (x - ep)
        }
        SpectralModel::LogParabola => {
            let (n0, alpha, beta) = (theta[0], theta[1], theta[2]);
            let ln_ratio = (10f64.powf(x) / 10f64.powf(ep)).ln();
            n0 + (-alpha - beta * ln_ratio) * (x - ep)
        }
        SpectralModel::LogParabola2 => {
            let (sp_log, alpha, ep_fit) = (theta[0], theta[1], theta[2]);
            let log_ratio = (10f64.powf(x) / 10f64.powf(ep_fit)).log10();
            sp_log - alpha * log_ratio * log_ratio
        }
        SpectralModel::SuperExpCutoff => {
            let (n0, alpha, ec, b) = (theta[0], theta[1], theta[2], theta[3]);
            n0 - alpha * (x - ep) + (-(10f64.powf(x) / 10f64.powf(ec)).powf(b)).exp().log10()
        }
        SpectralModel::SuperExpCutoffFixedB => {
            let (n0, alpha, ec) = (theta[0], theta[1], theta[2]);
            n0 - alpha * (x - ep) + (-(10f64.powf(x) / 10f64.powf(ec))).exp().log10()
        }
    }
}

/// Evaluate `log10(E² dN/dE)` regardless of the model's native space.
pub fn evaluate_log_e2dnde(model: SpectralModel, theta: &[f64], ep: f64, x: f64) -> f64 {
    match native_space(model) {
        FluxSpace::E2Dnde => evaluate(model, theta, ep, x),
        FluxSpace::Dnde => 2.0 * x + evaluate(model, theta, ep, x),
    }
}

/// Log-uniform prior: `0.0` strictly inside the model's parameter box,
/// `−∞` outside. All bounds are open intervals.
pub fn ln_prior(model: SpectralModel, theta: &[f64]) -> f64 {
    let inside = match model {
        SpectralModel::PowerLaw => {
            let (n0, alpha) = (theta[0], theta[1]);
            -15.0 < n0 && n0 < -8.0 && 0.5 < alpha && alpha < 5.0
        }
        SpectralModel::LogParabola => {
            let (n0, alpha, beta) = (theta[0], theta[1], theta[2]);
            -15.0 < n0 && n0 < -8.0 && 1.0 < alpha && alpha < 4.0 && -1.0 < beta && beta < 1.0
        }
        SpectralModel::LogParabola2 => {
            let (sp_log, alpha, ep_fit) = (theta[0], theta[1], theta[2]);
            -7.0 < sp_log && sp_log < -2.0 && -1.0 < alpha && alpha < 1.0 && 2.0 < ep_fit && ep_fit < 7.0
        }
        SpectralModel::SuperExpCutoff => {
            let (n0, alpha, ec, b) = (theta[0], theta[1], theta[2], theta[3]);
            -15.0 < n0
                && n0 < -8.0
                && 1.0 < alpha
                && alpha < 4.0
                && 3.0 < ec
                && ec < 7.0
                && 0.2 < b
                && b < 3.0
        }
        SpectralModel::SuperExpCutoffFixedB => {
            let (n0, alpha, ec) = (theta[0], theta[1], theta[2]);
            -15.0 < n0 && n0 < -8.0 && 1.0 < alpha && alpha < 4.0 && 3.0 < ec && ec < 7.0
        }
    };

    if inside { 0.0 } else { f64::NEG_INFINITY }
}

/// Gaussian log-likelihood over detection points only.
///
/// Upper limits never enter the likelihood; the data vectors passed here must
/// already be restricted to detections (see `fusion`).
pub fn ln_likelihood(
    model: SpectralModel,
    theta: &[f64],
    ep: f64,
    x: &[f64],
    y: &[f64],
    yerr: &[f64],
) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() {
        let r = (y[i] - evaluate(model, theta, ep, x[i])) / yerr[i];
        sum += r * r;
    }
    -0.5 * sum
}

/// Log-posterior: prior + likelihood, with the prior checked first.
///
/// A prior violation short-circuits to `−∞` before the model is evaluated,
/// which guards the model functions against domain errors for extreme
/// parameter values.
pub fn ln_posterior(
    model: SpectralModel,
    theta: &[f64],
    ep: f64,
    x: &[f64],
    y: &[f64],
    yerr: &[f64],
) -> f64 {
    let lp = ln_prior(model, theta);
    if !lp.is_finite() {
        return f64::NEG_INFINITY;
    }
    lp + ln_likelihood(model, theta, ep, x, y, yerr)
}

/// Starting vector for walker initialization.
pub fn initial_guess(model: SpectralModel) -> Vec<f64> {
    match model {
        SpectralModel::PowerLaw => vec![-13.0, 2.0],
        SpectralModel::LogParabola => vec![-13.0, 1.7, 0.2],
        SpectralModel::LogParabola2 => vec![-4.5, 0.2, 3.5],
        SpectralModel::SuperExpCutoff => vec![-13.0, 1.7, 5.0, 1.0],
        SpectralModel::SuperExpCutoffFixedB => vec![-13.0, 1.7, 5.0],
    }
}

/// Short parameter labels (corner-plot style).
pub fn param_labels(model: SpectralModel) -> &'static [&'static str] {
    match model {
        SpectralModel::PowerLaw => &["N0", "alpha"],
        SpectralModel::LogParabola => &["N0", "alpha", "beta"],
        SpectralModel::LogParabola2 => &["Sp_log", "alpha", "Ep_log"],
        SpectralModel::SuperExpCutoff => &["N0", "alpha", "Ec", "b"],
        SpectralModel::SuperExpCutoffFixedB => &["N0", "alpha", "Ec"],
    }
}

/// Labels used in the persisted parameter-summary table.
pub fn summary_labels(model: SpectralModel) -> &'static [&'static str] {
    match model {
        SpectralModel::PowerLaw => &["N0 (log scale)", "Alpha"],
        SpectralModel::LogParabola => &["N0 (log scale)", "Alpha", "Beta"],
        SpectralModel::LogParabola2 => &["N0 (log scale)", "Alpha", "Ep (log scale)"],
        SpectralModel::SuperExpCutoff => &["N0 (log scale)", "Alpha", "Ec", "b"],
        SpectralModel::SuperExpCutoffFixedB => &["N0 (log scale)", "Alpha", "Ec"],
    }
}

/// Column names for the persisted posterior table, one per free parameter.
pub fn posterior_column_names(model: SpectralModel) -> Vec<String> {
    match model {
        SpectralModel::PowerLaw => vec![
            "N0 distribution (log scale)".into(),
            "Alpha distribution".into(),
        ],
        SpectralModel::LogParabola => vec![
            "N0 distribution (log scale)".into(),
            "Alpha distribution".into(),
            "Beta distribution".into(),
        ],
        SpectralModel::LogParabola2 => vec![
            "N0 distribution (log scale)".into(),
            "Alpha distribution".into(),
            "Ep distribution".into(),
        ],
        SpectralModel::SuperExpCutoff => vec![
            "N0 distribution (log scale)".into(),
            "Alpha distribution".into(),
            "Ec distribution".into(),
            "b distribution".into(),
        ],
        SpectralModel::SuperExpCutoffFixedB => vec![
            "N0 distribution (log scale)".into(),
            "Alpha distribution".into(),
            "Ec distribution".into(),
        ],
    }
}

/// Dense model curve in the `E²dN/dE` representation.
///
/// Returns `(x, log10(E²dN/dE))` at `steps` log-spaced energies between the
/// `log10` bounds.
pub fn curve_log_e2dnde(
    model: SpectralModel,
    theta: &[f64],
    ep: f64,
    xmin: f64,
    xmax: f64,
    steps: usize,
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let xs = log_space(xmin, xmax, steps)?;
    let ys = xs
        .iter()
        .map(|&x| evaluate_log_e2dnde(model, theta, ep, x))
        .collect();
    Ok((xs, ys))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SpectralModel; 5] = [
        SpectralModel::PowerLaw,
        SpectralModel::LogParabola,
        SpectralModel::LogParabola2,
        SpectralModel::SuperExpCutoff,
        SpectralModel::SuperExpCutoffFixedB,
    ];

    #[test]
    fn evaluation_is_pure_and_finite_inside_prior() {
        let ep = (2.0 * 100.0f64).log10();
        for model in ALL {
            let theta = initial_guess(model);
            assert_eq!(theta.len(), model.param_count());
            assert_eq!(ln_prior(model, &theta), 0.0, "{model:?} start violates prior");
            for &x in &[2.0, 3.5, 5.0] {
                let a = evaluate(model, &theta, ep, x);
                let b = evaluate(model, &theta, ep, x);
                assert!(a.is_finite(), "{model:?} not finite at x={x}");
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn power_law_closed_form() {
        let ep = (2.0 * 100.0f64).log10();
        let theta = [-12.0, 2.0];
        let x = ep + 1.5;
        let y = evaluate(SpectralModel::PowerLaw, &theta, ep, x);
        assert!((y - (-12.0 - 2.0 * 1.5)).abs() < 1e-12);
    }

    #[test]
    fn plec_reduces_to_fixed_b_at_b_one() {
        let ep = 2.3;
        let x = 4.0;
        let free = evaluate(SpectralModel::SuperExpCutoff, &[-13.0, 1.7, 5.0, 1.0], ep, x);
        let fixed = evaluate(SpectralModel::SuperExpCutoffFixedB, &[-13.0, 1.7, 5.0], ep, x);
        assert!((free - fixed).abs() < 1e-12);
    }

    #[test]
    fn prior_boundaries_are_open() {
        // Strictly inside vs on/outside the PowerLaw box.
        assert_eq!(ln_prior(SpectralModel::PowerLaw, &[-10.0, 2.0]), 0.0);
        assert_eq!(ln_prior(SpectralModel::PowerLaw, &[-15.0, 2.0]), f64::NEG_INFINITY);
        assert_eq!(ln_prior(SpectralModel::PowerLaw, &[-8.0, 2.0]), f64::NEG_INFINITY);
        assert_eq!(ln_prior(SpectralModel::PowerLaw, &[-10.0, 0.5]), f64::NEG_INFINITY);
        assert_eq!(ln_prior(SpectralModel::PowerLaw, &[-10.0, 5.0]), f64::NEG_INFINITY);
        // Spot-check the 4-parameter box.
        assert_eq!(
            ln_prior(SpectralModel::SuperExpCutoff, &[-10.0, 2.0, 5.0, 0.2]),
            f64::NEG_INFINITY
        );
        assert_eq!(ln_prior(SpectralModel::SuperExpCutoff, &[-10.0, 2.0, 5.0, 0.21]), 0.0);
    }

    #[test]
    fn e2dnde_conversion_matches_native_space() {
        let ep = 2.3;
        let x = 4.2;
        // LogParabola2 is already in E²dN/dE space; no offset.
        let theta2 = initial_guess(SpectralModel::LogParabola2);
        assert_eq!(
            evaluate_log_e2dnde(SpectralModel::LogParabola2, &theta2, ep, x),
            evaluate(SpectralModel::LogParabola2, &theta2, ep, x)
        );
        // PowerLaw needs the +2x offset.
        let theta = initial_guess(SpectralModel::PowerLaw);
        let native = evaluate(SpectralModel::PowerLaw, &theta, ep, x);
        assert!((evaluate_log_e2dnde(SpectralModel::PowerLaw, &theta, ep, x) - (2.0 * x + native)).abs() < 1e-12);
    }

    #[test]
    fn likelihood_is_zero_for_exact_data() {
        let ep = 2.3;
        let theta = [-12.0, 2.0];
        let x = [2.5, 3.0, 4.0];
        let y: Vec<f64> = x
            .iter()
            .map(|&xi| evaluate(SpectralModel::PowerLaw, &theta, ep, xi))
            .collect();
        let yerr = [0.1, 0.1, 0.1];
        assert_eq!(ln_likelihood(SpectralModel::PowerLaw, &theta, ep, &x, &y, &yerr), 0.0);
    }

    #[test]
    fn posterior_rejects_out_of_prior_without_likelihood() {
        // With yerr = 0 the likelihood would be NaN/−∞; the prior check must
        // short-circuit first.
        let lp = ln_posterior(SpectralModel::PowerLaw, &[0.0, 2.0], 2.3, &[3.0], &[1.0], &[0.0]);
        assert_eq!(lp, f64::NEG_INFINITY);
    }

    #[test]
    fn labels_match_parameter_counts() {
        for model in ALL {
            assert_eq!(param_labels(model).len(), model.param_count());
            assert_eq!(summary_labels(model).len(), model.param_count());
            assert_eq!(posterior_column_names(model).len(), model.param_count());
        }
    }
}

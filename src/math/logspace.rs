//! Named log-space conversion primitives.
//!
//! The fit runs entirely in `log10` space, so the same two conversions appear
//! in several places (fusion, plotting, posterior curves). They are kept as
//! named functions rather than inline arithmetic because the sign and `ln 10`
//! factors are easy to invert incorrectly.

use crate::error::AppError;

/// `log10` of each value.
pub fn linear_to_log(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.log10()).collect()
}

/// Propagate a 1σ linear error into `log10` space.
///
/// For `y_log = log10(y)`, first-order propagation gives
/// `σ_log = σ / (ln 10 · y)`.
pub fn log_error_from_linear(values: &[f64], errors: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(errors.iter())
        .map(|(&v, &e)| e / (std::f64::consts::LN_10 * v))
        .collect()
}

/// Generate `steps` points linearly spaced between `min` and `max`
/// (inclusive); with `log10` inputs this is a log-spaced energy grid.
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid grid range: min={min}, max={max} (must be finite and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push(min + step * i as f64);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_conversion_known_values() {
        let v = linear_to_log(&[1.0, 10.0, 100.0]);
        assert!((v[0]).abs() < 1e-12);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert!((v[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn log_error_matches_hand_computation() {
        // 10% relative error: σ_log = 0.1 / ln10.
        let e = log_error_from_linear(&[2e-6], &[2e-7]);
        assert!((e[0] - 0.1 / std::f64::consts::LN_10).abs() < 1e-12);
    }

    #[test]
    fn log_error_is_scale_free() {
        // E² dN/dE and dN/dE share relative errors, so their log errors match.
        let e2 = 1e4_f64;
        let a = log_error_from_linear(&[3e-12], &[4e-13]);
        let b = log_error_from_linear(&[3e-12 * e2], &[4e-13 * e2]);
        assert!((a[0] - b[0]).abs() < 1e-15);
    }

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(2.0, 6.0, 5).unwrap();
        assert_eq!(v.len(), 5);
        assert!((v[0] - 2.0).abs() < 1e-12);
        assert!((v[4] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(3.0, 3.0, 10).is_err());
        assert!(log_space(2.0, 6.0, 1).is_err());
        assert!(log_space(f64::NAN, 6.0, 10).is_err());
    }
}

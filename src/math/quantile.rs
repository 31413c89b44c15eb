//! Sample quantiles with linear interpolation.

/// Compute the `q`-quantile (0 ≤ q ≤ 1) of `values` with linear interpolation
/// between order statistics.
///
/// Returns `None` for empty input or a `q` outside `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_sample() {
        let v = [3.0, 1.0, 2.0];
        assert_eq!(quantile(&v, 0.5), Some(2.0));
    }

    #[test]
    fn interpolates_between_order_statistics() {
        let v = [0.0, 1.0, 2.0, 3.0];
        // pos = 0.5 * 3 = 1.5 -> midway between 1.0 and 2.0.
        assert!((quantile(&v, 0.5).unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn endpoints_are_min_and_max() {
        let v = [5.0, -1.0, 3.0];
        assert_eq!(quantile(&v, 0.0), Some(-1.0));
        assert_eq!(quantile(&v, 1.0), Some(5.0));
    }

    #[test]
    fn rejects_empty_and_out_of_range() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[1.0], 1.5), None);
    }
}

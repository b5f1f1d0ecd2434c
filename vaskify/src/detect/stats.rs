//! Order statistics used by the HB method.
//!
//! NaN values are skipped; an input with no remaining values has no
//! statistic.

/// Sorts the non-NaN values ascending.
fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile `q` of already sorted values, interpolating linearly between the
/// two nearest order statistics at position `q * (n - 1)`.
fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = q.clamp(0.0, 1.0) * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    if lower == upper {
        return Some(sorted[lower]);
    }
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Quantile `q` (clamped to `[0, 1]`) with linear interpolation.
///
/// # Examples
///
/// ```rust
/// use vaskify::detect::stats::quantile;
///
/// assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.25), Some(1.75));
/// assert_eq!(quantile(&[], 0.5), None);
/// ```
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Several quantiles of the same values, sorting once.
pub fn quantiles<const N: usize>(values: &[f64], qs: [f64; N]) -> Option<[f64; N]> {
    let sorted = sorted(values);
    let mut out = [0.0; N];
    for (slot, q) in out.iter_mut().zip(qs) {
        *slot = quantile_sorted(&sorted, q)?;
    }
    Some(out)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

//! Small descriptive statistics used by the evaluation harness.

/// Arithmetic mean of `values`, `0.0` for an empty slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of `values` (divides by `n`), `0.0` for an empty slice
#[inline]
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Signed relative error `(estimate - actual) / actual`.
///
/// Defined as `0.0` when `actual` is zero so that downstream statistics never see NaN.
#[inline]
pub fn relative_error(estimate: f64, actual: u64) -> f64 {
    if actual == 0 {
        return 0.0;
    }
    let actual = actual as f64;
    (estimate - actual) / actual
}

/// Coefficient of variation (population std-dev over mean) of bucket hit counts.
///
/// Values close to `1 / sqrt(mean)` indicate uniformly distributed hashes.
#[inline]
pub fn bucket_cv(counts: &[u32]) -> f64 {
    let values: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();
    let mean = mean(&values);
    if mean == 0.0 {
        return 0.0;
    }
    population_std_dev(&values) / mean
}

//! ## Numeric kernels used at fit time
//!
//! Most fit-time statistics are DataFusion aggregates. The few that are not have their kernels here.
//! Missing entries (`None` and `NaN`) are skipped.

use rayon::prelude::*;

/// Keeps the present (non-null, non-NaN) values of a column.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| v.filter(|x| !x.is_nan()))
        .collect()
}

/// Fraction of missing entries; 0 for an empty column.
pub fn missing_fraction(missing: usize, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        missing as f64 / rows as f64
    }
}

/// Quantile with linear interpolation between closest ranks (numpy's default).
///
/// `approx_percentile_cont` is a t-digest estimate and drifts from this value on small or skewed
/// columns, so the exact quantile is computed on the collected values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.par_sort_unstable_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

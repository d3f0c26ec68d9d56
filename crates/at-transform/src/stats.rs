//! Sample statistics shared by the transformers.

use std::cmp::Ordering;

use at_types::TransformError;

/// Arithmetic mean. `Empty` for an empty sample.
pub fn mean(y: &[f64]) -> Result<f64, TransformError> {
    if y.is_empty() {
        return Err(empty("average"));
    }
    Ok(y.iter().sum::<f64>() / y.len() as f64)
}

/// Variance with divisor `n`.
pub fn population_variance(y: &[f64]) -> Result<f64, TransformError> {
    let m = mean(y)?;
    Ok(y.iter().map(|v| (v - m).powi(2)).sum::<f64>() / y.len() as f64)
}

/// 1-based ranks of `y`, tied values sharing the average of their ranks.
///
/// Callers must reject NaN beforehand.
pub fn average_ranks(y: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..y.len()).collect();
    order.sort_by(|&a, &b| y[a].partial_cmp(&y[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; y.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y[order[end]] == y[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Reject NaN and infinities.
pub(crate) fn ensure_finite(y: &[f64]) -> Result<(), TransformError> {
    match y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(TransformError::NonFinite { index, value }),
        None => Ok(()),
    }
}

pub(crate) fn empty(operation: &str) -> TransformError {
    TransformError::Empty {
        operation: operation.to_string(),
    }
}

/// Piecewise-linear interpolation through `(xs, ys)`, clamped at both
/// ends. `xs` must be sorted ascending; repeated `xs` resolve to the
/// first matching point.
pub(crate) fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    // xs[i - 1] <= x < xs[i]
    let i = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

//! Base-10 log transformations.
//!
//! Both variants share the forward map and differ in how they estimate a
//! mean in original units from log-space samples.

use at_types::TransformError;

use crate::stats::{self, ensure_finite};
use crate::transformer::ValueTransformer;

/// `log10` of every value; every value must be finite and strictly positive.
fn log10_all(y: &[f64], transform: &str) -> Result<Vec<f64>, TransformError> {
    ensure_finite(y)?;
    y.iter()
        .enumerate()
        .map(|(index, &value)| {
            if value > 0.0 {
                Ok(value.log10())
            } else {
                Err(TransformError::Domain {
                    transform: transform.to_string(),
                    index,
                    value,
                })
            }
        })
        .collect()
}

// ---- Log ----

/// Averages after undoing the log: `mean(10^y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogTransformer;

impl ValueTransformer for LogTransformer {
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError> {
        log10_all(y, self.name())
    }

    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError> {
        ensure_finite(y)?;
        let original: Vec<f64> = y.iter().map(|v| 10f64.powf(*v)).collect();
        stats::mean(&original)
    }

    fn name(&self) -> &str {
        "log"
    }
}

// ---- Log-normal ----

/// Treats log-space samples as normally distributed and returns the mean
/// of the implied log-normal variable, `10^(mu + sigma^2 / 2)`, with `mu`
/// and `sigma^2` the sample mean and population variance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogNormalTransformer;

impl ValueTransformer for LogNormalTransformer {
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError> {
        log10_all(y, self.name())
    }

    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError> {
        ensure_finite(y)?;
        let log_mean = stats::mean(y)?;
        let log_var = stats::population_variance(y)?;
        Ok(10f64.powf(log_mean + log_var / 2.0))
    }

    fn name(&self) -> &str {
        "log_normal"
    }
}

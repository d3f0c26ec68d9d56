//! Empirical quantile mapping onto the standard normal distribution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use at_types::TransformError;

use crate::normal::norm_ppf;
use crate::stats::{self, average_ranks, empty, ensure_finite, interpolate};
use crate::transformer::ValueTransformer;

/// Probabilities are clipped to `[BOUND, 1 - BOUND]` before taking the
/// normal quantile so the extreme samples map to finite values.
const BOUND: f64 = 1e-7;

/// Fitted monotone map between sample values and normal quantiles.
///
/// `references` holds the distinct fitted sample values in ascending
/// order; `quantiles[i]` is the standard normal quantile assigned to
/// `references[i]`. Values in between are linearly interpolated and
/// values outside the fitted range clamp to the nearest end.
///
/// Every mapping is non-empty with equal-length, finite, ordered points;
/// deserialization goes through the same checks as [`QuantileMapping::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MappingPoints")]
pub struct QuantileMapping {
    references: Vec<f64>,
    quantiles: Vec<f64>,
}

#[derive(Deserialize)]
struct MappingPoints {
    references: Vec<f64>,
    quantiles: Vec<f64>,
}

impl TryFrom<MappingPoints> for QuantileMapping {
    type Error = TransformError;

    fn try_from(points: MappingPoints) -> Result<Self, Self::Error> {
        Self::new(points.references, points.quantiles)
    }
}

impl QuantileMapping {
    /// Build a mapping from explicit points, e.g. a previously exported
    /// state.
    pub fn new(references: Vec<f64>, quantiles: Vec<f64>) -> Result<Self, TransformError> {
        let mapping = Self {
            references,
            quantiles,
        };
        mapping.validate()?;
        Ok(mapping)
    }

    /// Learn the mapping from a sample.
    ///
    /// A value with average rank `r` among `n` samples gets the quantile
    /// at probability `(r - 0.5) / n`. Tied samples share one entry.
    pub fn fit(y: &[f64]) -> Result<Self, TransformError> {
        if y.is_empty() {
            return Err(empty("fit a quantile mapping to"));
        }
        ensure_finite(y)?;

        let n = y.len() as f64;
        let ranks = average_ranks(y);
        let mut points: Vec<(f64, f64)> = y.iter().copied().zip(ranks).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points.dedup_by(|a, b| a.0 == b.0);

        let (references, quantiles) = points
            .into_iter()
            .map(|(value, rank)| {
                let p = ((rank - 0.5) / n).clamp(BOUND, 1.0 - BOUND);
                (value, norm_ppf(p))
            })
            .unzip();

        Ok(Self {
            references,
            quantiles,
        })
    }

    /// Sample value to normal quantile.
    pub fn forward(&self, x: f64) -> f64 {
        interpolate(x, &self.references, &self.quantiles)
    }

    /// Normal quantile back to sample value.
    pub fn inverse(&self, z: f64) -> f64 {
        interpolate(z, &self.quantiles, &self.references)
    }

    fn validate(&self) -> Result<(), TransformError> {
        let invalid = |message: &str| {
            Err(TransformError::InvalidState {
                message: message.to_string(),
            })
        };
        if self.references.is_empty() {
            return invalid("mapping has no reference points");
        }
        if self.references.len() != self.quantiles.len() {
            return invalid("references and quantiles differ in length");
        }
        if self
            .references
            .iter()
            .chain(&self.quantiles)
            .any(|v| !v.is_finite())
        {
            return invalid("mapping contains non-finite values");
        }
        if self.references.windows(2).any(|w| w[0] >= w[1]) {
            return invalid("references must be strictly increasing");
        }
        if self.quantiles.windows(2).any(|w| w[0] > w[1]) {
            return invalid("quantiles must be non-decreasing");
        }
        Ok(())
    }

    pub fn references(&self) -> &[f64] {
        &self.references
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Rank-based transform to an approximately standard normal sample.
///
/// Stateful: `fit_transform` replaces the stored mapping, and
/// `inverse_mean_transform` fails until a mapping has been fitted. Not
/// meant to be shared between concurrent fitters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantileNormalTransformer {
    mapping: Option<QuantileMapping>,
}

impl QuantileNormalTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a transformer from a previously exported mapping.
    pub fn from_state(mapping: QuantileMapping) -> Self {
        Self {
            mapping: Some(mapping),
        }
    }

    pub fn fitted_state(&self) -> Option<&QuantileMapping> {
        self.mapping.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.mapping.is_some()
    }

    fn mapping(&self) -> Result<&QuantileMapping, TransformError> {
        self.mapping.as_ref().ok_or_else(|| TransformError::Unfitted {
            transform: self.name().to_string(),
        })
    }
}

impl ValueTransformer for QuantileNormalTransformer {
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError> {
        let mapping = QuantileMapping::fit(y)?;
        debug!(
            samples = y.len(),
            references = mapping.len(),
            "Fitted quantile mapping"
        );
        let z = y.iter().map(|&v| mapping.forward(v)).collect();
        self.mapping = Some(mapping);
        Ok(z)
    }

    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError> {
        let mapping = self.mapping()?;
        ensure_finite(y)?;
        let original: Vec<f64> = y.iter().map(|&z| mapping.inverse(z)).collect();
        stats::mean(&original)
    }

    fn name(&self) -> &str {
        "quantile_normal"
    }
}

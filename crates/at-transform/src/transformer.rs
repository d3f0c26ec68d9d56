//! The transformer strategy trait and its variant selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use at_types::{AtError, TransformError};

use crate::logscale::{LogNormalTransformer, LogTransformer};
use crate::quantile::QuantileNormalTransformer;
use crate::stats;

/// Common trait for all objective value transformations.
pub trait ValueTransformer: Send + Sync {
    /// Fit to `y` (if the strategy has state) and map it into model space.
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError>;

    /// Map model-space samples back to original units and average them.
    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

// ---- Identity ----

/// Leaves values untouched; the inverse is the plain mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentityTransformer;

impl ValueTransformer for IdentityTransformer {
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError> {
        Ok(y.to_vec())
    }

    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError> {
        stats::mean(y)
    }

    fn name(&self) -> &str {
        "identity"
    }
}

// ---- Variant selection ----

/// Which transformation to apply to objective values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    #[default]
    Identity,
    Log,
    LogNormal,
    QuantileNormal,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Log => "log",
            Self::LogNormal => "log_normal",
            Self::QuantileNormal => "quantile_normal",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = AtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "log" => Ok(Self::Log),
            "log_normal" => Ok(Self::LogNormal),
            "quantile_normal" => Ok(Self::QuantileNormal),
            other => Err(AtError::Config(format!("Unknown value transform `{other}`"))),
        }
    }
}

/// A transformer of any kind, for callers that pick the variant at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformer {
    Identity(IdentityTransformer),
    Log(LogTransformer),
    LogNormal(LogNormalTransformer),
    QuantileNormal(QuantileNormalTransformer),
}

impl Transformer {
    pub fn from_kind(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Identity => Self::Identity(IdentityTransformer),
            TransformKind::Log => Self::Log(LogTransformer),
            TransformKind::LogNormal => Self::LogNormal(LogNormalTransformer),
            TransformKind::QuantileNormal => {
                Self::QuantileNormal(QuantileNormalTransformer::new())
            }
        }
    }

    pub fn kind(&self) -> TransformKind {
        match self {
            Self::Identity(_) => TransformKind::Identity,
            Self::Log(_) => TransformKind::Log,
            Self::LogNormal(_) => TransformKind::LogNormal,
            Self::QuantileNormal(_) => TransformKind::QuantileNormal,
        }
    }

    fn inner(&self) -> &dyn ValueTransformer {
        match self {
            Self::Identity(t) => t,
            Self::Log(t) => t,
            Self::LogNormal(t) => t,
            Self::QuantileNormal(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ValueTransformer {
        match self {
            Self::Identity(t) => t,
            Self::Log(t) => t,
            Self::LogNormal(t) => t,
            Self::QuantileNormal(t) => t,
        }
    }
}

impl From<TransformKind> for Transformer {
    fn from(kind: TransformKind) -> Self {
        Self::from_kind(kind)
    }
}

impl ValueTransformer for Transformer {
    fn fit_transform(&mut self, y: &[f64]) -> Result<Vec<f64>, TransformError> {
        self.inner_mut().fit_transform(y)
    }

    fn inverse_mean_transform(&self, y: &[f64]) -> Result<f64, TransformError> {
        self.inner().inverse_mean_transform(y)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [TransformKind; 4] = [
        TransformKind::Identity,
        TransformKind::Log,
        TransformKind::LogNormal,
        TransformKind::QuantileNormal,
    ];

    #[test]
    fn identity_is_identity() {
        let mut t = IdentityTransformer;
        let y = vec![3.0, -1.0, 0.0, 12.5];
        assert_eq!(t.fit_transform(&y).unwrap(), y);
        assert_eq!(t.inverse_mean_transform(&y).unwrap(), 3.625);
    }

    #[test]
    fn identity_inverse_of_empty_fails() {
        assert!(matches!(
            IdentityTransformer.inverse_mean_transform(&[]),
            Err(TransformError::Empty { .. })
        ));
    }

    #[test]
    fn kind_parsing_and_names() {
        for kind in ALL_KINDS {
            assert_eq!(kind.as_str().parse::<TransformKind>().unwrap(), kind);
            assert_eq!(Transformer::from_kind(kind).name(), kind.as_str());
            assert_eq!(Transformer::from(kind).kind(), kind);
        }
        assert!("sqrt".parse::<TransformKind>().is_err());
        assert_eq!(TransformKind::default(), TransformKind::Identity);
    }

    #[test]
    fn kind_serde_names() {
        let json = serde_json::to_string(&TransformKind::QuantileNormal).unwrap();
        assert_eq!(json, "\"quantile_normal\"");
        let kind: TransformKind = serde_json::from_str("\"log_normal\"").unwrap();
        assert_eq!(kind, TransformKind::LogNormal);
    }

    #[test]
    fn constant_sample_round_trips_for_every_kind() {
        for kind in ALL_KINDS {
            let mut t = Transformer::from_kind(kind);
            let z = t.fit_transform(&[4.2; 6]).unwrap();
            let back = t.inverse_mean_transform(&z).unwrap();
            assert!((back - 4.2).abs() < 1e-9, "{kind}: {back}");
        }
    }

    #[test]
    fn boxed_strategies_are_interchangeable() {
        let mut strategies: Vec<Box<dyn ValueTransformer>> = vec![
            Box::new(IdentityTransformer),
            Box::new(LogTransformer),
            Box::new(LogNormalTransformer),
            Box::new(QuantileNormalTransformer::new()),
        ];
        let y = [1.0, 10.0, 100.0];
        for t in strategies.iter_mut() {
            let z = t.fit_transform(&y).unwrap();
            assert_eq!(z.len(), y.len());
            assert!(t.inverse_mean_transform(&z).unwrap() > 0.0);
        }
    }
}

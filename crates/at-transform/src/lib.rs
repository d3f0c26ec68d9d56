//! # at-transform
//!
//! Objective value transformations for surrogate modeling.
//!
//! Raw costs are mapped into a modeling space with `fit_transform`, and
//! model predictions are mapped back into a mean estimate in original
//! units with `inverse_mean_transform`. Four strategies are provided:
//! identity, base-10 log, log-normal (mean-corrected log) and an
//! empirical quantile mapping onto the standard normal.

mod logscale;
mod normal;
mod quantile;
mod stats;
mod transformer;

pub use logscale::{LogNormalTransformer, LogTransformer};
pub use normal::norm_ppf;
pub use quantile::{QuantileMapping, QuantileNormalTransformer};
pub use stats::{average_ranks, mean, population_variance};
pub use transformer::{IdentityTransformer, TransformKind, Transformer, ValueTransformer};

//! Target algorithm run types: outcome taxonomy, objective, and the
//! normalized result of one evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AtError, RunError};

/// Parameter name to wire value. Ordered so that the command line built
/// from a configuration is deterministic.
pub type Configuration = BTreeMap<String, String>;

/// Fields reported by the target algorithm beyond status, runtime and cost.
pub type ExtraMetrics = serde_json::Map<String, serde_json::Value>;

/// Outcome of a single target algorithm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Success,
    Timeout,
    Crashed,
    Abort,
    Memout,
}

impl StatusType {
    /// Map a status string reported by the target algorithm.
    ///
    /// `SAT` and `UNSAT` are decision-problem successes. Matching is
    /// case-sensitive; anything else is a protocol violation.
    pub fn from_reported(status: &str) -> Result<Self, RunError> {
        match status {
            "SAT" | "UNSAT" | "SUCCESS" => Ok(Self::Success),
            "TIMEOUT" => Ok(Self::Timeout),
            "CRASHED" => Ok(Self::Crashed),
            "ABORT" => Ok(Self::Abort),
            "MEMOUT" => Ok(Self::Memout),
            other => Err(RunError::UnknownStatus {
                status: other.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Crashes and aborts, the statuses that warrant an output dump.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Crashed | Self::Abort)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Timeout => "TIMEOUT",
            Self::Crashed => "CRASHED",
            Self::Abort => "ABORT",
            Self::Memout => "MEMOUT",
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the optimizer minimizes: wall-clock runtime or a reported quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunObjective {
    Runtime,
    Quality,
}

impl Default for RunObjective {
    fn default() -> Self {
        Self::Runtime
    }
}

impl fmt::Display for RunObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => f.write_str("runtime"),
            Self::Quality => f.write_str("quality"),
        }
    }
}

impl FromStr for RunObjective {
    type Err = AtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "runtime" => Ok(Self::Runtime),
            "quality" => Ok(Self::Quality),
            other => Err(AtError::Config(format!(
                "Unknown run objective `{other}`, expected `runtime` or `quality`"
            ))),
        }
    }
}

/// Normalized result of one target algorithm run.
///
/// `cost` and `runtime` are always populated: missing values are imputed
/// as `0.0` by the runner. Under [`RunObjective::Runtime`] `cost` equals
/// `runtime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: StatusType,
    pub cost: f64,
    pub runtime: f64,
    pub extra: ExtraMetrics,
}

//! Runner configuration and per-run requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use at_types::{config_error, AtResult, Configuration, RunObjective};

/// Instance identifier passed when the caller supplies none.
pub const DEFAULT_INSTANCE: &str = "0";

/// Cutoff passed when the caller supplies none. Effectively unbounded.
pub const DEFAULT_CUTOFF: f64 = 99_999_999_999_999.0;

pub const DEFAULT_SEED: i64 = 12345;

/// Number of trailing stdout/stderr lines logged for crashed runs.
pub const DEFAULT_TAIL_LINES: usize = 5;

/// Static configuration of a [`crate::TargetAlgorithmRunner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program followed by its fixed leading arguments.
    pub command: Vec<String>,

    pub objective: RunObjective,

    pub default_instance: String,
    pub default_cutoff: f64,
    pub default_seed: i64,

    /// Hard wall-clock limit in seconds after which the child and every
    /// process in its group are killed.
    /// `None` leaves cutoff enforcement entirely to the target algorithm.
    pub kill_after: Option<f64>,

    /// Working directory for the child; inherits ours when unset.
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,

    pub tail_lines: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            objective: RunObjective::Runtime,
            default_instance: DEFAULT_INSTANCE.to_string(),
            default_cutoff: DEFAULT_CUTOFF,
            default_seed: DEFAULT_SEED,
            kill_after: None,
            working_dir: None,
            env: BTreeMap::new(),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }
}

impl RunnerConfig {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_objective(mut self, objective: RunObjective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_kill_after(mut self, seconds: f64) -> Self {
        self.kill_after = Some(seconds);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_defaults(mut self, instance: &str, cutoff: f64, seed: i64) -> Self {
        self.default_instance = instance.to_string();
        self.default_cutoff = cutoff;
        self.default_seed = seed;
        self
    }

    pub fn from_json_str(json: &str) -> AtResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> AtResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> AtResult<()> {
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(config_error!("Target algorithm command must not be empty"));
        }
        if !(self.default_cutoff.is_finite() && self.default_cutoff > 0.0) {
            return Err(config_error!(
                "Default cutoff must be a positive number, got {}",
                self.default_cutoff
            ));
        }
        if let Some(limit) = self.kill_after {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(config_error!(
                    "kill_after must be a positive number of seconds, got {limit}"
                ));
            }
        }
        Ok(())
    }
}

/// One evaluation to perform. Absent fields fall back to the runner's
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunRequest {
    pub configuration: Configuration,
    pub instance: Option<String>,
    pub cutoff: Option<f64>,
    pub seed: Option<i64>,
}

impl RunRequest {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            ..Self::default()
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }
}

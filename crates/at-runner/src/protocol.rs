//! Output protocol spoken by target algorithm wrappers.
//!
//! A wrapper reports its outcome with a single stdout line of the form
//! `Result of this algorithm run: {"status": "SAT", "runtime": 1.2, ...}`.
//! Only the first such line counts.

use serde_json::Value;
use tracing::{error, warn};

use at_types::{ExecutionResult, ExtraMetrics, RunError, RunObjective, StatusType};

pub const RESULT_PREFIX: &str = "Result of this algorithm run:";

/// Validated contents of a result line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub status: StatusType,
    pub runtime: Option<f64>,
    pub cost: Option<f64>,
    pub extra: ExtraMetrics,
}

impl ResultRecord {
    /// Locate and parse the first result line in `stdout`.
    pub fn from_output(stdout: &str) -> Result<Self, RunError> {
        let payload = find_payload(stdout).ok_or(RunError::MissingResultLine)?;
        Self::parse(payload)
    }

    /// Parse the JSON object following the result prefix.
    pub fn parse(payload: &str) -> Result<Self, RunError> {
        let mut fields: ExtraMetrics =
            serde_json::from_str(payload).map_err(|source| RunError::MalformedPayload {
                payload: payload.trim().to_string(),
                source,
            })?;

        let status = match fields.remove("status") {
            None | Some(Value::Null) => return Err(RunError::MissingStatus),
            Some(Value::String(status)) => StatusType::from_reported(&status)?,
            Some(other) => {
                return Err(RunError::UnknownStatus {
                    status: other.to_string(),
                })
            }
        };
        let runtime = take_number(&mut fields, "runtime")?;
        let cost = take_number(&mut fields, "cost")?;

        Ok(Self {
            status,
            runtime,
            cost,
            extra: fields,
        })
    }

    /// Impute missing fields and derive the cost for `objective`.
    pub fn into_result(self, objective: RunObjective) -> ExecutionResult {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => {
                warn!("The target algorithm has not returned a runtime, imputed by 0");
                0.0
            }
        };

        let cost = match objective {
            RunObjective::Runtime => runtime,
            RunObjective::Quality => match self.cost {
                Some(cost) => cost,
                None => {
                    error!(
                        "The target algorithm has not returned a cost although the objective is quality, imputed by 0"
                    );
                    0.0
                }
            },
        };

        ExecutionResult {
            status: self.status,
            cost,
            runtime,
            extra: self.extra,
        }
    }
}

/// Text after the prefix on the first line that starts with it.
pub fn find_payload(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(RESULT_PREFIX))
}

/// Last `n` lines of `text`.
pub fn tail_lines(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

fn take_number(fields: &mut ExtraMetrics, field: &str) -> Result<Option<f64>, RunError> {
    match fields.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number.as_f64().map(Some).ok_or_else(|| {
            RunError::InvalidField {
                field: field.to_string(),
                value: number.to_string(),
            }
        }),
        // Wrappers that print values through string formatting still count.
        Some(Value::String(text)) => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(RunError::InvalidField {
                field: field.to_string(),
                value: text,
            }),
        },
        Some(other) => Err(RunError::InvalidField {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

use thiserror::Error;

/// Main error type for the AlgoTune system
#[derive(Error, Debug)]
pub enum AtError {
    #[error("Run error: {0}")]
    Run(#[from] RunError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Target algorithm run errors.
///
/// Every variant is fatal for the single evaluation that produced it.
/// Missing runtime or cost fields are not errors; they are imputed.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to launch target algorithm `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Target algorithm command is empty")]
    EmptyCommand,

    #[error("Invalid run request: {message}")]
    InvalidRequest { message: String },

    #[error("I/O failure while supervising target algorithm: {0}")]
    Supervision(#[from] std::io::Error),

    #[error("Target algorithm killed after exceeding hard limit of {limit_seconds}s")]
    HardTimeout { limit_seconds: f64 },

    #[error("No result line found in target algorithm output")]
    MissingResultLine,

    #[error("Malformed result payload `{payload}`: {source}")]
    MalformedPayload {
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Result payload has no status field")]
    MissingStatus,

    #[error("Unknown status reported by target algorithm: {status}")]
    UnknownStatus { status: String },

    #[error("Result field `{field}` is not a number: {value}")]
    InvalidField { field: String, value: String },
}

impl RunError {
    /// True for errors caused by the child breaking the output protocol,
    /// as opposed to failures launching or supervising it.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::MissingResultLine
                | Self::MalformedPayload { .. }
                | Self::MissingStatus
                | Self::UnknownStatus { .. }
                | Self::InvalidField { .. }
        )
    }
}

/// Value transformation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Value {value} at index {index} is outside the domain of the {transform} transform")]
    Domain {
        transform: String,
        index: usize,
        value: f64,
    },

    #[error("Non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("Cannot {operation} an empty sample")]
    Empty { operation: String },

    #[error("The {transform} transform has not been fitted")]
    Unfitted { transform: String },

    #[error("Invalid fitted state: {message}")]
    InvalidState { message: String },
}

/// Result type alias for AlgoTune operations
pub type AtResult<T> = Result<T, AtError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::AtError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = RunError::UnknownStatus {
            status: "UNKNOWN".to_string(),
        };
        assert!(error.to_string().contains("Unknown status"));
        assert!(error.to_string().contains("UNKNOWN"));

        let error = TransformError::Domain {
            transform: "log".to_string(),
            index: 2,
            value: -1.0,
        };
        assert!(error.to_string().contains("index 2"));
        assert!(error.to_string().contains("log"));
    }

    #[test]
    fn error_conversion() {
        let run_error = RunError::MissingResultLine;
        let at_error: AtError = run_error.into();

        match at_error {
            AtError::Run(RunError::MissingResultLine) => (),
            _ => panic!("Expected Run error"),
        }

        let at_error: AtError = TransformError::Unfitted {
            transform: "quantile_normal".to_string(),
        }
        .into();
        assert!(matches!(at_error, AtError::Transform(_)));
    }

    #[test]
    fn protocol_violation_classification() {
        assert!(RunError::MissingResultLine.is_protocol_violation());
        assert!(RunError::MissingStatus.is_protocol_violation());
        assert!(RunError::UnknownStatus {
            status: "x".into()
        }
        .is_protocol_violation());
        assert!(!RunError::EmptyCommand.is_protocol_violation());
        assert!(!RunError::HardTimeout { limit_seconds: 1.0 }.is_protocol_violation());
    }

    #[test]
    fn config_macro() {
        let config_err = config_error!("Missing required field: {}", "command");
        assert!(config_err.to_string().contains("command"));
    }
}

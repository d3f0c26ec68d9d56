//! # at-runner
//!
//! Target algorithm execution harness for AlgoTune.
//!
//! Builds the command line for one evaluation, runs the target algorithm
//! as a child process, and turns the single result line it prints into a
//! typed [`ExecutionResult`](at_types::ExecutionResult). Missing runtime
//! and cost values are imputed with a logged diagnostic; anything that
//! breaks the output protocol fails the evaluation.

mod command;
mod config;
mod process;
mod protocol;
mod runner;

pub use command::{build_command, display_command, format_cutoff};
pub use config::{
    RunRequest, RunnerConfig, DEFAULT_CUTOFF, DEFAULT_INSTANCE, DEFAULT_SEED, DEFAULT_TAIL_LINES,
};
pub use process::{execute, CapturedOutput, ProcessOptions};
pub use protocol::{find_payload, tail_lines, ResultRecord, RESULT_PREFIX};
pub use runner::TargetAlgorithmRunner;

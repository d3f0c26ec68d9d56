//! The target algorithm runner.

use std::time::Duration;

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use at_types::{AtResult, Configuration, ExecutionResult, RunError, RunObjective};

use crate::command::{build_command, display_command};
use crate::config::{RunRequest, RunnerConfig};
use crate::process::{self, ProcessOptions};
use crate::protocol::{tail_lines, ResultRecord};

/// Executes a black-box target algorithm once per call and normalizes
/// what it reports.
///
/// A runner holds only immutable configuration, so one instance can be
/// shared across threads. Each call spawns exactly one child and blocks
/// until it exits.
#[derive(Debug, Clone)]
pub struct TargetAlgorithmRunner {
    config: RunnerConfig,
}

impl TargetAlgorithmRunner {
    pub fn new(config: RunnerConfig) -> AtResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runner for `command` with all other settings at their defaults.
    pub fn from_command<I, S>(command: I, objective: RunObjective) -> AtResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(RunnerConfig::new(command).with_objective(objective))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn objective(&self) -> RunObjective {
        self.config.objective
    }

    /// Run `configuration` on `instance` with the given budget and seed.
    /// Absent arguments take the configured defaults.
    pub fn run(
        &self,
        configuration: &Configuration,
        instance: Option<&str>,
        cutoff: Option<f64>,
        seed: Option<i64>,
    ) -> Result<ExecutionResult, RunError> {
        let (instance, cutoff, seed) = self.resolve(instance, cutoff, seed)?;

        let span = info_span!("target_run", run_id = %Uuid::new_v4(), instance);
        let _enter = span.enter();

        let argv = build_command(&self.config.command, configuration, instance, cutoff, seed);
        debug!("Calling: {}", display_command(&argv));

        let output = process::execute(&argv, &self.process_options())?;
        debug!("Stdout: {}", output.stdout);
        debug!("Stderr: {}", output.stderr);

        let record = ResultRecord::from_output(&output.stdout)?;

        if record.status.is_failure() {
            let n = self.config.tail_lines;
            warn!(
                status = %record.status,
                "Target algorithm crashed. Last {n} lines of stdout and stderr"
            );
            warn!("stdout: {:?}", tail_lines(&output.stdout, n));
            warn!("stderr: {:?}", tail_lines(&output.stderr, n));
        }

        let result = record.into_result(self.config.objective);
        info!(
            status = %result.status,
            cost = result.cost,
            runtime = result.runtime,
            wall_seconds = output.elapsed.as_secs_f64(),
            "Target algorithm run finished"
        );
        Ok(result)
    }

    pub fn run_request(&self, request: &RunRequest) -> Result<ExecutionResult, RunError> {
        self.run(
            &request.configuration,
            request.instance.as_deref(),
            request.cutoff,
            request.seed,
        )
    }

    /// The argv a call with `request` would execute. Fails exactly when
    /// `run_request` would reject the request before spawning.
    pub fn command_for(&self, request: &RunRequest) -> Result<Vec<String>, RunError> {
        let (instance, cutoff, seed) =
            self.resolve(request.instance.as_deref(), request.cutoff, request.seed)?;
        Ok(build_command(
            &self.config.command,
            &request.configuration,
            instance,
            cutoff,
            seed,
        ))
    }

    /// Fill absent arguments from the configured defaults and check the
    /// cutoff.
    fn resolve<'a>(
        &'a self,
        instance: Option<&'a str>,
        cutoff: Option<f64>,
        seed: Option<i64>,
    ) -> Result<(&'a str, f64, i64), RunError> {
        let instance = instance.unwrap_or(&self.config.default_instance);
        let cutoff = cutoff.unwrap_or(self.config.default_cutoff);
        let seed = seed.unwrap_or(self.config.default_seed);

        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(RunError::InvalidRequest {
                message: format!("cutoff must be a positive number of seconds, got {cutoff}"),
            });
        }
        Ok((instance, cutoff, seed))
    }

    fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            working_dir: self.config.working_dir.clone(),
            env: self.config.env.clone(),
            kill_after: self.config.kill_after.map(Duration::from_secs_f64),
        }
    }
}

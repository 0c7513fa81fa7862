//! Matrix execution: one invocation fanned out across interpreter versions.
//!
//! Environments run sequentially and every working directory is passed to
//! the delegate explicitly, so nothing process-wide is shared between
//! environments. The matrix is finalized only after all environments were
//! attempted (unless fail-fast is configured), so every failure is visible
//! in one run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use toxide_core::{delegate, InvocationSpec, OutputMode, Result, ToxideError};
use toxide_core::{ExecutionResult, RunnerCommand};

use crate::provision::EnvironmentProvisioner;

/// How unavailable environments are treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrictnessPolicy {
    /// CI mode: a version whose interpreter cannot be provisioned is
    /// recorded as a failure. Environment unavailability must not be
    /// indistinguishable from success.
    Strict,

    /// Developer mode: unavailable versions are recorded as skipped and
    /// excluded from aggregation.
    SkipMissing,
}

/// Whether the matrix keeps going after a failing environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Attempt every environment so all failures are visible.
    RunAll,

    /// Stop at the first failing environment.
    FailFast,
}

/// Terminal state of one environment.
///
/// Per-environment lifecycle: pending -> provisioning -> {provision_failed |
/// running} -> {passed | failed}; `skipped` only exists under
/// [`StrictnessPolicy::SkipMissing`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnvStatus {
    Passed,
    Failed,
    ProvisionFailed,
    Skipped,
}

impl EnvStatus {
    /// Whether this outcome feeds aggregate FAIL.
    pub fn is_failure(&self) -> bool {
        matches!(self, EnvStatus::Failed | EnvStatus::ProvisionFailed)
    }
}

/// Recorded outcome for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentOutcome {
    /// Version identifier this outcome belongs to.
    pub version: String,

    /// Terminal status.
    pub status: EnvStatus,

    /// Runner result, present when the runner actually executed.
    pub result: Option<ExecutionResult>,

    /// Error detail for provision/launch failures.
    pub error: Option<String>,
}

/// Result of a complete matrix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixResult {
    /// Per-environment outcomes in requested order, one per attempted
    /// version.
    pub outcomes: Vec<EnvironmentOutcome>,

    /// When the matrix started.
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl MatrixResult {
    /// Aggregate PASS: no recorded failure of any kind.
    pub fn passed(&self) -> bool {
        !self.outcomes.iter().any(|o| o.status.is_failure())
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == EnvStatus::Passed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failure()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == EnvStatus::Skipped)
            .count()
    }
}

/// Drives one invocation across a set of interpreter versions.
pub struct MatrixDriver {
    provisioner: Arc<dyn EnvironmentProvisioner>,
    runner_prefix: Vec<String>,
    strictness: StrictnessPolicy,
    failure_mode: FailureMode,
}

impl MatrixDriver {
    /// Create a driver with the default runner module (`-m pytest`),
    /// strict provisioning, and run-all failure handling.
    pub fn new(provisioner: Arc<dyn EnvironmentProvisioner>) -> Self {
        Self {
            provisioner,
            runner_prefix: vec!["-m".to_string(), "pytest".to_string()],
            strictness: StrictnessPolicy::Strict,
            failure_mode: FailureMode::RunAll,
        }
    }

    /// Arguments inserted between the interpreter and the invocation argv.
    pub fn with_runner_prefix(mut self, prefix: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.runner_prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strictness(mut self, strictness: StrictnessPolicy) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    /// Run `spec` once per version and aggregate the outcomes.
    ///
    /// Provision and launch failures are recorded as outcomes, not raised;
    /// only interruption (SIGINT) aborts the matrix with an error.
    pub async fn run(&self, versions: &[String], spec: &InvocationSpec) -> Result<MatrixResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(versions.len());

        for version in versions {
            info!(version = %version, "Provisioning environment");

            let handle = match self.provisioner.provision(version).await {
                Ok(handle) => handle,
                Err(e) => {
                    let outcome = match self.strictness {
                        StrictnessPolicy::Strict => {
                            warn!(version = %version, error = %e, "Provisioning failed");
                            EnvironmentOutcome {
                                version: version.clone(),
                                status: EnvStatus::ProvisionFailed,
                                result: None,
                                error: Some(e.to_string()),
                            }
                        }
                        StrictnessPolicy::SkipMissing => {
                            info!(version = %version, "Interpreter unavailable, skipping");
                            EnvironmentOutcome {
                                version: version.clone(),
                                status: EnvStatus::Skipped,
                                result: None,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    let stop = outcome.status.is_failure()
                        && self.failure_mode == FailureMode::FailFast;
                    outcomes.push(outcome);
                    if stop {
                        break;
                    }
                    continue;
                }
            };

            info!(version = %version, interpreter = %handle.interpreter.display(), "Running environment");

            let command = RunnerCommand::new(&handle.interpreter)
                .with_prefix_args(self.runner_prefix.clone())
                .with_extra_env(handle.extra_env.clone());

            let outcome = match delegate::run(&command, spec, OutputMode::Captured).await {
                Ok(result) => {
                    let status = if result.passed() {
                        EnvStatus::Passed
                    } else {
                        EnvStatus::Failed
                    };
                    info!(
                        version = %version,
                        exit_code = result.exit_code,
                        duration_ms = result.duration_ms,
                        passed = result.passed(),
                        "Environment finished"
                    );
                    EnvironmentOutcome {
                        version: version.clone(),
                        status,
                        result: Some(result),
                        error: None,
                    }
                }
                Err(ToxideError::Interrupted { program }) => {
                    // Cancellation aborts the whole matrix; the child is
                    // already dead.
                    return Err(ToxideError::Interrupted { program });
                }
                Err(e) => {
                    warn!(version = %version, error = %e, "Runner could not be executed");
                    EnvironmentOutcome {
                        version: version.clone(),
                        status: EnvStatus::Failed,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };

            let stop = outcome.status.is_failure() && self.failure_mode == FailureMode::FailFast;
            outcomes.push(outcome);
            if stop {
                break;
            }
        }

        let result = MatrixResult {
            outcomes,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            passed = result.passed(),
            environments = result.outcomes.len(),
            failures = result.failed_count(),
            skipped = result.skipped_count(),
            "Matrix finished"
        );

        Ok(result)
    }
}

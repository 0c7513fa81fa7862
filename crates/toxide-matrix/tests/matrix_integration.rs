//! Integration tests for the matrix driver with a fake provisioner.
//!
//! Environments are faked with `sh` as the "interpreter": each handle
//! carries a `TOXIDE_EXIT` environment variable and the runner prefix is a
//! script that exits with it, so per-version pass/fail is controllable
//! without real interpreters installed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;

use toxide_core::{FlagPolicy, CanonicalPath, InvocationSpec, Result, ToxideError};
use toxide_matrix::{
    EnvStatus, EnvironmentHandle, EnvironmentProvisioner, FailureMode, MatrixDriver,
    StrictnessPolicy,
};

/// Provisioner returning `sh`-backed environments with a per-version exit
/// code, or a provisioning failure for versions absent from the map.
struct FakeProvisioner {
    exit_codes: HashMap<String, i32>,
}

impl FakeProvisioner {
    fn new(entries: &[(&str, i32)]) -> Arc<Self> {
        Arc::new(Self {
            exit_codes: entries
                .iter()
                .map(|(v, c)| (v.to_string(), *c))
                .collect(),
        })
    }
}

#[async_trait]
impl EnvironmentProvisioner for FakeProvisioner {
    async fn provision(&self, version: &str) -> Result<EnvironmentHandle> {
        match self.exit_codes.get(version) {
            Some(code) => Ok(EnvironmentHandle {
                version: version.to_string(),
                interpreter: PathBuf::from("sh"),
                extra_env: vec![("TOXIDE_EXIT".to_string(), code.to_string())],
            }),
            None => Err(ToxideError::Provision {
                version: version.to_string(),
                reason: "not installed".to_string(),
            }),
        }
    }
}

fn sh_driver(provisioner: Arc<FakeProvisioner>) -> MatrixDriver {
    MatrixDriver::new(provisioner).with_runner_prefix(["-c", "exit \"${TOXIDE_EXIT:-0}\""])
}

fn ci_spec(dir: &std::path::Path) -> InvocationSpec {
    InvocationSpec::build(
        CanonicalPath::canonicalize(dir).unwrap(),
        FlagPolicy::Ci,
        vec![],
    )
}

fn versions(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_all_environments_pass() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 0), ("3.8", 0)]));

    let result = driver
        .run(&versions(&["3.6", "3.8"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(result.passed(), "aggregate should be PASS");
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.passed_count(), 2);
    // Requested order preserved
    assert_eq!(result.outcomes[0].version, "3.6");
    assert_eq!(result.outcomes[1].version, "3.8");
}

#[tokio::test]
async fn test_one_failing_environment_fails_aggregate() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 0), ("3.8", 0), ("pypy3", 1)]));

    let result = driver
        .run(&versions(&["3.6", "3.8", "pypy3"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(!result.passed(), "aggregate should be FAIL");
    assert_eq!(result.outcomes.len(), 3, "every environment still attempted");
    assert_eq!(result.passed_count(), 2);
    assert_eq!(result.failed_count(), 1);

    let pypy = &result.outcomes[2];
    assert_eq!(pypy.status, EnvStatus::Failed);
    assert_eq!(pypy.result.as_ref().unwrap().exit_code, 1);
}

#[tokio::test]
async fn test_strict_mode_records_provision_failure() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 0), ("3.8", 0)]))
        .with_strictness(StrictnessPolicy::Strict);

    let result = driver
        .run(&versions(&["3.6", "3.11", "3.8"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    // Matrix of 3 with one provisioning failure still reports 3 outcomes.
    assert_eq!(result.outcomes.len(), 3);
    assert!(!result.passed(), "unavailable environment must fail strict CI");

    let missing = &result.outcomes[1];
    assert_eq!(missing.version, "3.11");
    assert_eq!(missing.status, EnvStatus::ProvisionFailed);
    assert!(missing.error.as_ref().unwrap().contains("3.11"));
}

#[tokio::test]
async fn test_skip_missing_mode_skips_without_failing() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 0)]))
        .with_strictness(StrictnessPolicy::SkipMissing);

    let result = driver
        .run(&versions(&["3.6", "3.11"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(result.passed(), "skipped environment must not fail aggregate");
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.skipped_count(), 1);
    assert_eq!(result.outcomes[1].status, EnvStatus::Skipped);
}

#[tokio::test]
async fn test_fail_fast_stops_after_first_failure() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 1), ("3.8", 0)]))
        .with_failure_mode(FailureMode::FailFast);

    let result = driver
        .run(&versions(&["3.6", "3.8"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(!result.passed());
    assert_eq!(result.outcomes.len(), 1, "second environment not attempted");
    assert_eq!(result.outcomes[0].status, EnvStatus::Failed);
}

#[tokio::test]
async fn test_fail_fast_stops_on_provision_failure() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.8", 0)]))
        .with_failure_mode(FailureMode::FailFast);

    let result = driver
        .run(&versions(&["3.11", "3.8"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(!result.passed());
    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(result.outcomes[0].status, EnvStatus::ProvisionFailed);
}

#[tokio::test]
async fn test_unlaunchable_interpreter_recorded_as_failed() {
    struct BrokenProvisioner;

    #[async_trait]
    impl EnvironmentProvisioner for BrokenProvisioner {
        async fn provision(&self, version: &str) -> Result<EnvironmentHandle> {
            Ok(EnvironmentHandle {
                version: version.to_string(),
                interpreter: PathBuf::from("/nonexistent-interpreter"),
                extra_env: vec![],
            })
        }
    }

    let dir = tempdir().unwrap();
    let driver = MatrixDriver::new(Arc::new(BrokenProvisioner));

    let result = driver
        .run(&versions(&["3.6"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    assert!(!result.passed());
    assert_eq!(result.outcomes[0].status, EnvStatus::Failed);
    assert!(result.outcomes[0].result.is_none());
    assert!(result.outcomes[0].error.is_some(), "launch error detail recorded");
}

#[tokio::test]
async fn test_matrix_result_serializes_to_json() {
    let dir = tempdir().unwrap();
    let driver = sh_driver(FakeProvisioner::new(&[("3.6", 0)]));

    let result = driver
        .run(&versions(&["3.6"]), &ci_spec(dir.path()))
        .await
        .expect("matrix failed");

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["outcomes"][0]["version"], "3.6");
    assert_eq!(json["outcomes"][0]["status"], "passed");
}

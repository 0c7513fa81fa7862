//! toxide-matrix — interpreter-matrix execution.
//!
//! Fans one test invocation out across several interpreter versions:
//! - provisions (or selects) an isolated environment per version,
//! - runs the delegated test runner once per environment,
//! - aggregates per-environment outcomes into a single pass/fail signal,
//!   where provisioning failures are failures too under strict mode.

pub mod driver;
pub mod provision;

// Re-export key types
pub use driver::{
    EnvStatus, EnvironmentOutcome, FailureMode, MatrixDriver, MatrixResult, StrictnessPolicy,
};
pub use provision::{EnvironmentHandle, EnvironmentProvisioner, SystemInterpreterProvisioner};

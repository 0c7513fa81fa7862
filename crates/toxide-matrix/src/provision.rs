//! Environment provisioning: version identifier -> runnable interpreter.
//!
//! Provisioning proper (installing interpreters) is a collaborator's job;
//! this module defines the seam and ships a provisioner that selects
//! already-installed interpreters from `PATH`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use toxide_core::{Result, ToxideError};

/// An isolated, runnable environment for one interpreter version.
///
/// Created by a provisioner; consumed read-only by the matrix driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentHandle {
    /// Version identifier this handle satisfies (e.g. `3.10`, `pypy3`).
    pub version: String,

    /// Interpreter executable for this environment.
    pub interpreter: PathBuf,

    /// Extra environment variables the environment needs (e.g. a module
    /// search path for a cached dependency directory).
    pub extra_env: Vec<(String, String)>,
}

/// Extension point for obtaining runnable environments.
///
/// Implementations may build virtualenvs, talk to a toolchain manager, or
/// simply look up system interpreters. Failure must be reported via
/// [`ToxideError::Provision`] — never by silently producing a handle that
/// cannot run.
#[async_trait]
pub trait EnvironmentProvisioner: Send + Sync {
    /// Obtain a runnable environment for `version`.
    async fn provision(&self, version: &str) -> Result<EnvironmentHandle>;
}

/// Provisioner that resolves interpreters already installed on `PATH`.
///
/// Version identifiers map onto conventional executable names:
/// `3.10` -> `python3.10`, `pypy3` -> `pypy3`, and identifiers that already
/// name an executable (`python3.9`) are used verbatim.
#[derive(Debug, Default)]
pub struct SystemInterpreterProvisioner;

impl SystemInterpreterProvisioner {
    pub fn new() -> Self {
        Self
    }

    /// Candidate executable names for a version identifier.
    fn candidates(version: &str) -> Vec<String> {
        if version.starts_with("python") || version.starts_with("pypy") {
            vec![version.to_string()]
        } else {
            vec![format!("python{version}")]
        }
    }
}

#[async_trait]
impl EnvironmentProvisioner for SystemInterpreterProvisioner {
    async fn provision(&self, version: &str) -> Result<EnvironmentHandle> {
        for candidate in Self::candidates(version) {
            match which::which(&candidate) {
                Ok(path) => {
                    debug!(version, interpreter = %path.display(), "Resolved interpreter");
                    return Ok(EnvironmentHandle {
                        version: version.to_string(),
                        interpreter: path,
                        extra_env: Vec::new(),
                    });
                }
                Err(e) => {
                    debug!(version, candidate = %candidate, error = %e, "Interpreter candidate not found");
                }
            }
        }

        Err(ToxideError::Provision {
            version: version.to_string(),
            reason: "no matching interpreter on PATH".to_string(),
        })
    }
}

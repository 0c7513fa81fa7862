//! Error taxonomy for toxide.
//!
//! Test failure is deliberately absent from this enum: a runner that exits
//! non-zero produced a valid [`ExecutionResult`](crate::delegate::ExecutionResult)
//! and its exit code is propagated, not wrapped in an error.

/// toxide orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum ToxideError {
    /// The path does not exist or could not be resolved to a canonical form
    /// (including unresolvable symlinks). Fatal before any process is spawned.
    #[error("cannot resolve path {path}: {reason}")]
    PathResolution { path: String, reason: String },

    /// The delegated runner executable is missing or could not be started.
    /// Distinct from a non-zero test exit so callers can tell launch failure
    /// apart from test failure.
    #[error("cannot launch runner {program}: {source}")]
    RunnerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An environment's interpreter could not be provisioned.
    #[error("cannot provision environment {version}: {reason}")]
    Provision { version: String, reason: String },

    /// The orchestrator received a termination signal while a delegated
    /// runner was in flight; the child has been killed.
    #[error("interrupted while running {program}")]
    Interrupted { program: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for toxide operations.
pub type Result<T> = std::result::Result<T, ToxideError>;

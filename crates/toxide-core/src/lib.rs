//! toxide-core — single-invocation orchestration.
//!
//! Provides the building blocks for delegating to a pytest-style test
//! runner:
//! - canonical path resolution and project-root location,
//! - invocation assembly (fixed policy flags + caller passthrough),
//! - process delegation with exact exit-code propagation,
//! - the shared error taxonomy and tracing setup.
//!
//! The interpreter-matrix layer lives in `toxide-matrix`.

pub mod delegate;
pub mod error;
pub mod invocation;
pub mod path;
pub mod telemetry;

// Re-export key types
pub use delegate::{run, ExecutionResult, OutputMode, RunnerCommand};
pub use error::{Result, ToxideError};
pub use invocation::{FlagPolicy, InvocationSpec};
pub use path::{locate_root, CanonicalPath};
pub use telemetry::init_tracing;

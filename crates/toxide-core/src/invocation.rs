//! Invocation building: fixed policy flags plus caller passthrough.
//!
//! The argv contract is load-bearing: fixed flags come first, passthrough
//! arguments follow in caller order, and the root marker is always the final
//! positional argument. Passing the root explicitly keeps the delegated
//! runner from defaulting its own rootdir/config discovery to an unrelated
//! directory (such as the caller's home directory).

use serde::{Deserialize, Serialize};

use crate::path::CanonicalPath;

/// Fixed-flag policy for an invocation.
///
/// Interactive single-shot runs stop at the first failure; CI runs do not,
/// so that every failing environment surfaces every failing test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlagPolicy {
    /// Stop after the first test failure (`--maxfail=1`).
    Interactive,

    /// Run the full suite regardless of failures.
    Ci,
}

impl FlagPolicy {
    /// The non-negotiable flags this policy emits.
    pub fn fixed_flags(&self) -> Vec<String> {
        match self {
            FlagPolicy::Interactive => vec!["--maxfail=1".to_string()],
            FlagPolicy::Ci => Vec::new(),
        }
    }
}

/// A fully assembled runner invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationSpec {
    /// Canonical project root; the runner executes with this as its cwd.
    pub working_directory: CanonicalPath,

    /// Policy flags, emitted before everything else.
    pub fixed_flags: Vec<String>,

    /// Caller-supplied arguments, forwarded verbatim and in order. They are
    /// appended, never merged or deduplicated against the fixed flags; a
    /// conflict between the two is the runner's concern.
    pub passthrough_args: Vec<String>,

    /// Final positional argument naming the root for the runner's own
    /// config discovery (`.` relative to the working directory).
    pub root_marker: String,
}

impl InvocationSpec {
    /// Assemble an invocation for `root` under the given flag policy.
    pub fn build(
        root: CanonicalPath,
        policy: FlagPolicy,
        passthrough_args: Vec<String>,
    ) -> Self {
        Self {
            working_directory: root,
            fixed_flags: policy.fixed_flags(),
            passthrough_args,
            root_marker: ".".to_string(),
        }
    }

    /// The argument vector handed to the runner: fixed flags, then
    /// passthrough args, then the root marker.
    pub fn argv(&self) -> Vec<String> {
        let mut argv =
            Vec::with_capacity(self.fixed_flags.len() + self.passthrough_args.len() + 1);
        argv.extend(self.fixed_flags.iter().cloned());
        argv.extend(self.passthrough_args.iter().cloned());
        argv.push(self.root_marker.clone());
        argv
    }
}

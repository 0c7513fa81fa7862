//! Runner delegation: spawn the test runner and report its outcome.
//!
//! The working directory is always passed explicitly to the child via
//! `Command::current_dir`; the orchestrator's own process-wide cwd is never
//! touched, so there is no save/restore discipline and overlapping
//! invocations (a parallel matrix) cannot race on shared state.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ToxideError};
use crate::invocation::InvocationSpec;

/// How to start the delegated runner.
///
/// A single-shot run invokes the runner binary directly; a matrix run
/// invokes it as a module of a provisioned interpreter
/// (`python3.10 -m pytest ...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerCommand {
    /// Executable to spawn (e.g. `pytest`, or an interpreter path).
    pub program: PathBuf,

    /// Arguments emitted before the invocation argv (e.g. `-m pytest`).
    pub prefix_args: Vec<String>,

    /// Extra environment variables for the child.
    pub extra_env: Vec<(String, String)>,
}

impl RunnerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            extra_env: Vec::new(),
        }
    }

    pub fn with_prefix_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_env(mut self, env: Vec<(String, String)>) -> Self {
        self.extra_env = env;
        self
    }
}

/// Stream handling for the delegated runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Pipe stdout/stderr into the [`ExecutionResult`].
    Captured,

    /// Let the child write to the orchestrator's own streams (interactive
    /// single-shot runs); the result's stdout/stderr are empty.
    Inherited,
}

/// Outcome of one delegated runner invocation. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code, propagated exactly (0 = success). Signal-terminated
    /// children report `128 + signal` on Unix.
    pub exit_code: i32,

    /// Captured stdout (empty under [`OutputMode::Inherited`]).
    pub stdout: String,

    /// Captured stderr (empty under [`OutputMode::Inherited`]).
    pub stderr: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Whether the runner reported success.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute the runner for `spec`, blocking until it exits.
///
/// The child runs with `spec.working_directory` as its cwd and receives
/// `spec.argv()` after any prefix arguments. The returned exit code is the
/// runner's own, untranslated; a runner that cannot be started fails with
/// [`ToxideError::RunnerLaunch`] instead. On SIGINT the child is killed and
/// [`ToxideError::Interrupted`] is returned.
pub async fn run(
    command: &RunnerCommand,
    spec: &InvocationSpec,
    output: OutputMode,
) -> Result<ExecutionResult> {
    let start = Instant::now();
    let program_name = command.program.display().to_string();

    let stdio = || match output {
        OutputMode::Captured => Stdio::piped(),
        OutputMode::Inherited => Stdio::inherit(),
    };

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.prefix_args)
        .args(spec.argv())
        .current_dir(&spec.working_directory)
        .stdout(stdio())
        .stderr(stdio())
        .kill_on_drop(true);
    for (key, value) in &command.extra_env {
        cmd.env(key, value);
    }

    debug!(
        program = %program_name,
        cwd = %spec.working_directory,
        argv = ?spec.argv(),
        "Delegating to runner"
    );

    let mut child = cmd.spawn().map_err(|e| ToxideError::RunnerLaunch {
        program: program_name.clone(),
        source: e,
    })?;

    // Drain pipes concurrently with wait() so a chatty runner cannot fill
    // the pipe buffer and deadlock.
    let stdout_task = child.stdout.take().map(|mut h| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = h.read_to_end(&mut buf).await;
            buf
        })
    });
    let stderr_task = child.stderr.take().map(|mut h| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = h.read_to_end(&mut buf).await;
            buf
        })
    });

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = tokio::signal::ctrl_c() => {
            child.kill().await.ok();
            return Err(ToxideError::Interrupted { program: program_name });
        }
    };

    let stdout = match stdout_task {
        Some(task) => String::from_utf8_lossy(&task.await.unwrap_or_default()).into_owned(),
        None => String::new(),
    };
    let stderr = match stderr_task {
        Some(task) => String::from_utf8_lossy(&task.await.unwrap_or_default()).into_owned(),
        None => String::new(),
    };

    Ok(ExecutionResult {
        exit_code: exit_code_of(status),
        stdout,
        stderr,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Exit code for a finished child: the code itself, or `128 + signal` for
/// signal-terminated children on Unix.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    -1
}

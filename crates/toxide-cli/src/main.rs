//! toxide - test-invocation orchestrator CLI
//!
//! The `toxide` command resolves the project root, delegates to a
//! pytest-style runner with a fixed flag policy, and can fan one test
//! command out across an interpreter-version matrix.
//!
//! ## Commands
//!
//! - `run`: single-shot delegation; exit code equals the runner's
//! - `matrix`: run against several interpreter versions and aggregate
//!
//! ## Exit codes
//!
//! - `run`: the delegated runner's exit code, exactly
//! - `matrix`: 0 on aggregate PASS, 1 on FAIL
//! - 2 path/configuration errors, 127 runner launch failure, 130 interrupted

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use toxide_core::{
    delegate, locate_root, FlagPolicy, InvocationSpec, OutputMode, RunnerCommand, ToxideError,
};
use toxide_matrix::{
    EnvStatus, FailureMode, MatrixDriver, StrictnessPolicy, SystemInterpreterProvisioner,
};

#[derive(Parser)]
#[command(name = "toxide")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Test-invocation orchestrator with an interpreter matrix", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delegate once to the test runner, propagating its exit code
    Run {
        /// Project root: a directory, or a file whose parent is the root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Runner executable to delegate to
        #[arg(long, default_value = "pytest")]
        runner: String,

        /// Use the CI flag policy (no stop-at-first-failure)
        #[arg(long)]
        ci: bool,

        /// Passthrough arguments, forwarded verbatim to the runner
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the suite across an interpreter-version matrix
    Matrix {
        /// Project root: a directory, or a file whose parent is the root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Interpreter versions, comma-separated (e.g. 3.9,3.10,pypy3)
        #[arg(long, value_delimiter = ',', required = true)]
        versions: Vec<String>,

        /// Record unavailable interpreters as skipped instead of failed
        #[arg(long)]
        skip_missing: bool,

        /// Stop at the first failing environment
        #[arg(long)]
        fail_fast: bool,

        /// Print the full matrix result as JSON
        #[arg(long)]
        json_output: bool,

        /// Passthrough arguments, forwarded verbatim to the runner
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    toxide_core::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Run {
            root,
            runner,
            ci,
            args,
        } => cmd_run(&root, &runner, ci, args).await,
        Commands::Matrix {
            root,
            versions,
            skip_missing,
            fail_fast,
            json_output,
            args,
        } => cmd_matrix(&root, &versions, skip_missing, fail_fast, json_output, args).await,
    };

    let code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

/// Map orchestration errors onto distinguishable exit codes.
fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ToxideError>() {
        Some(ToxideError::RunnerLaunch { .. }) => 127,
        Some(ToxideError::Interrupted { .. }) => 130,
        _ => 2,
    }
}

async fn cmd_run(root: &PathBuf, runner: &str, ci: bool, args: Vec<String>) -> Result<i32> {
    let root = locate_root(root).context("Failed to locate project root")?;
    let policy = if ci {
        FlagPolicy::Ci
    } else {
        FlagPolicy::Interactive
    };

    let spec = InvocationSpec::build(root, policy, args);
    debug!(argv = ?spec.argv(), cwd = %spec.working_directory, "Built invocation");

    let command = RunnerCommand::new(runner);
    let result = delegate::run(&command, &spec, OutputMode::Inherited).await?;

    // The runner's exit code is the sole signal of outcome.
    Ok(result.exit_code)
}

async fn cmd_matrix(
    root: &PathBuf,
    versions: &[String],
    skip_missing: bool,
    fail_fast: bool,
    json_output: bool,
    args: Vec<String>,
) -> Result<i32> {
    let root = locate_root(root).context("Failed to locate project root")?;
    let spec = InvocationSpec::build(root, FlagPolicy::Ci, args);

    let strictness = if skip_missing {
        StrictnessPolicy::SkipMissing
    } else {
        StrictnessPolicy::Strict
    };
    let failure_mode = if fail_fast {
        FailureMode::FailFast
    } else {
        FailureMode::RunAll
    };

    let driver = MatrixDriver::new(Arc::new(SystemInterpreterProvisioner::new()))
        .with_strictness(strictness)
        .with_failure_mode(failure_mode);

    let result = driver.run(versions, &spec).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_matrix_summary(&result);
    }

    Ok(if result.passed() { 0 } else { 1 })
}

fn print_matrix_summary(result: &toxide_matrix::MatrixResult) {
    for outcome in &result.outcomes {
        let detail = match (&outcome.status, &outcome.result) {
            (_, Some(r)) => format!("exit {} ({} ms)", r.exit_code, r.duration_ms),
            (EnvStatus::ProvisionFailed | EnvStatus::Skipped, None) => outcome
                .error
                .clone()
                .unwrap_or_else(|| "unavailable".to_string()),
            (_, None) => outcome.error.clone().unwrap_or_default(),
        };
        let status = match outcome.status {
            EnvStatus::Passed => "passed",
            EnvStatus::Failed => "FAILED",
            EnvStatus::ProvisionFailed => "PROVISION FAILED",
            EnvStatus::Skipped => "skipped",
        };
        println!("{:<12} {:<18} {detail}", outcome.version, status);
    }

    // Surface captured output of failing environments; passing output stays
    // quiet.
    for outcome in &result.outcomes {
        if outcome.status.is_failure() {
            if let Some(r) = &outcome.result {
                if !r.stdout.is_empty() {
                    println!("--- {} stdout ---\n{}", outcome.version, r.stdout);
                }
                if !r.stderr.is_empty() {
                    println!("--- {} stderr ---\n{}", outcome.version, r.stderr);
                }
            }
        }
    }

    println!(
        "matrix: {} ({} passed, {} failed, {} skipped, {} ms)",
        if result.passed() { "PASS" } else { "FAIL" },
        result.passed_count(),
        result.failed_count(),
        result.skipped_count(),
        result.duration_ms,
    );
}

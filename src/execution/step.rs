//! Individual Step Execution
//!
//! Runs a single, already resolved step for one target:
//! - Skipped steps only update their status
//! - Output directory creation (only when missing)
//! - Shell invocation with full output capture
//! - Exit outcome recording
//!
//! A failing tool never stops the pipeline. Its exit code is recorded in the
//! status table and the step still ends `done`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::{debug, error, info, warn};

use super::decider::SkipReason;
use super::status::{StatusTable, StepOutcome, StepStatus};

/// Shell used to run step commands.
const SHELL: &str = "sh";

/// What to do with a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Reuse existing output
    Skip(SkipReason),
    /// Run the fully resolved command
    Run { command: String },
}

/// A step ready for execution for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Canonical target form (status key)
    pub target: String,
    /// Step name (status key)
    pub step: String,
    /// Where the step writes its output
    pub output_path: PathBuf,
    /// Skip or run
    pub action: StepAction,
}

/// Result of executing one planned step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub target: String,
    pub step: String,
    /// None when the step was skipped
    pub outcome: Option<StepOutcome>,
}

impl StepReport {
    /// Returns true if the step was skipped.
    pub fn skipped(&self) -> bool {
        self.outcome.is_none()
    }

    /// Returns true if the step ran and its command failed.
    pub fn failed(&self) -> bool {
        self.outcome.is_some_and(|o| !o.success)
    }
}

/// Executes a planned step and keeps the status table in sync.
///
/// # Arguments
///
/// * `planned` - The step and its run/skip decision
/// * `status` - Shared status table
/// * `working_dir` - Optional directory commands run in; relative output
///   paths are resolved against it
pub fn execute_step(
    planned: &PlannedStep,
    status: &StatusTable,
    working_dir: Option<&Path>,
) -> StepReport {
    let command = match &planned.action {
        StepAction::Skip(reason) => {
            status.set(&planned.target, &planned.step, StepStatus::Skipped);
            info!(
                ">> [{}] skipped for target: {} ({:?})",
                planned.step, planned.target, reason
            );
            return StepReport {
                target: planned.target.clone(),
                step: planned.step.clone(),
                outcome: None,
            };
        }
        StepAction::Run { command } => command,
    };

    if let Err(e) = ensure_output_directory(&planned.output_path, working_dir) {
        warn!(
            "Step '{}' for {}: could not create output directory: {}",
            planned.step, planned.target, e
        );
    }

    status.set(&planned.target, &planned.step, StepStatus::Running);
    info!(">> [{}] running for target: {}", planned.step, planned.target);
    debug!("Command: {}", command);

    let outcome = match run_shell(command, working_dir) {
        Ok(output) => {
            log_output(planned, &output);
            if output.status.success() {
                StepOutcome::succeeded()
            } else {
                StepOutcome::failed(output.status.code())
            }
        }
        Err(e) => {
            error!(
                "Step '{}' for {}: failed to start command: {}",
                planned.step, planned.target, e
            );
            StepOutcome::failed(None)
        }
    };

    status.finish(&planned.target, &planned.step, outcome);

    StepReport {
        target: planned.target.clone(),
        step: planned.step.clone(),
        outcome: Some(outcome),
    }
}

/// Creates the parent directory of `output_path` if it does not exist.
fn ensure_output_directory(output_path: &Path, working_dir: Option<&Path>) -> std::io::Result<()> {
    let output_path = match working_dir {
        Some(dir) => dir.join(output_path),
        None => output_path.to_path_buf(),
    };

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created directory: {}", parent.display());
        }
    }
    Ok(())
}

/// Runs a command line through the shell, capturing stdout and stderr.
fn run_shell(command: &str, working_dir: Option<&Path>) -> std::io::Result<Output> {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c").arg(command);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
        debug!("Executing in directory: {}", dir.display());
    }

    cmd.output()
}

fn log_output(planned: &PlannedStep, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        debug!("Step '{}' for {} completed", planned.step, planned.target);
        if !stdout.trim().is_empty() {
            debug!("stdout:\n{}", stdout);
        }
        if !stderr.trim().is_empty() {
            debug!("stderr:\n{}", stderr);
        }
        return;
    }

    warn!(
        "Step '{}' for {} exited with code {:?}",
        planned.step,
        planned.target,
        output.status.code()
    );
    if !stderr.trim().is_empty() {
        warn!("stderr:\n{}", stderr);
    }
    if !stdout.trim().is_empty() {
        debug!("stdout:\n{}", stdout);
    }
}

//! Error Types
//!
//! Configuration problems are the only fatal errors in scanflow. They are
//! raised while loading workflows and targets, before any step executes.
//! Failures of the external tools themselves never surface here; they are
//! recorded in the status table instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading and validating scan inputs.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A workflow file could not be read.
    #[error("Failed to read workflow file '{}': {source}", path.display())]
    WorkflowRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A workflow file is not valid YAML or does not match the schema.
    #[error("Failed to parse workflow '{}': {message}", path.display())]
    WorkflowParse { path: PathBuf, message: String },

    /// The workflow defines no pipeline steps.
    #[error("Workflow '{workflow}' has an empty pipeline")]
    EmptyPipeline { workflow: String },

    /// Two steps in one pipeline share a name.
    #[error("Workflow '{workflow}' defines step '{step}' more than once")]
    DuplicateStep { workflow: String, step: String },

    /// A step has a blank name.
    #[error("Workflow '{workflow}' has a step with an empty name (position {position})")]
    EmptyStepName { workflow: String, position: usize },

    /// A step name contains characters that `<name>.outputFile` cannot carry.
    #[error(
        "Step name '{step}' in workflow '{workflow}' may only contain letters, digits, '_' and '-'"
    )]
    InvalidStepName { workflow: String, step: String },

    /// A step has a blank command template.
    #[error("Step '{step}' in workflow '{workflow}' has no command")]
    EmptyCommand { workflow: String, step: String },

    /// A workflow requested by name does not exist in the workflows directory.
    #[error("Workflow '{name}' not found (available: {available})")]
    UnknownWorkflow { name: String, available: String },

    /// No workflow files were found.
    #[error("No workflow files found in '{}'", dir.display())]
    NoWorkflows { dir: PathBuf },

    /// The target list could not be read.
    #[error("Failed to read targets file '{}': {source}", path.display())]
    TargetsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target list contains no targets.
    #[error("Targets file '{}' contains no targets", path.display())]
    NoTargets { path: PathBuf },

    /// A date argument is not in `YYYY-MM-DD` form.
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Generic I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for scanflow operations.
pub type Result<T> = std::result::Result<T, ScanError>;

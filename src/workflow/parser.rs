//! Workflow Loading
//!
//! Reads workflow definitions from YAML files. A workflows directory holds one
//! workflow per `*.yaml` / `*.yml` file; workflows can be loaded all at once
//! or selected by name.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::model::Workflow;
use super::validator::{quick_validate, validate_workflow};
use crate::error::{Result, ScanError};

/// Default directory holding workflow definitions.
pub const DEFAULT_WORKFLOWS_DIR: &str = "scans-wf";

/// Short description of a workflow file, used for listings.
#[derive(Debug, Clone)]
pub struct WorkflowSummary {
    /// Workflow name
    pub name: String,
    /// File the workflow was read from
    pub file: PathBuf,
    /// Description, if any
    pub description: Option<String>,
    /// Number of pipeline steps
    pub steps: usize,
    /// Structural problems found in the definition
    pub problems: Vec<String>,
}

/// Parses a workflow from YAML text.
///
/// `origin` is used for error messages and as the fallback name.
pub fn parse_workflow(yaml: &str, origin: &Path) -> Result<Workflow> {
    let mut workflow: Workflow =
        serde_yaml::from_str(yaml).map_err(|e| ScanError::WorkflowParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

    if workflow.name.trim().is_empty() {
        workflow.name = origin
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("workflow")
            .to_string();
    }

    Ok(workflow)
}

/// Loads and validates a workflow from a YAML file.
///
/// # Example
///
/// ```rust,no_run
/// use scanflow::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("scans-wf/web.yaml")?;
///     println!("Loaded {} steps", workflow.pipeline.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    info!("Loading workflow from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|source| ScanError::WorkflowRead {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let workflow = parse_workflow(&yaml_content, path)?;
    validate_workflow(&workflow)?;

    info!(
        "Workflow '{}' loaded: {} steps",
        workflow.name,
        workflow.pipeline.len()
    );

    Ok(workflow)
}

/// Returns the workflow files in a directory, sorted by path.
pub fn workflow_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Loads every workflow in a directory.
///
/// Any invalid file aborts loading: configuration errors are fatal before
/// execution begins.
pub fn load_workflows_dir(dir: impl AsRef<Path>) -> Result<Vec<Workflow>> {
    let dir = dir.as_ref();
    let files = workflow_files(dir)?;

    if files.is_empty() {
        return Err(ScanError::NoWorkflows {
            dir: dir.to_path_buf(),
        });
    }

    files.iter().map(|file| load_workflow(file)).collect()
}

/// Lists the workflows in a directory without failing on broken files.
pub fn list_workflows(dir: impl AsRef<Path>) -> Result<Vec<WorkflowSummary>> {
    let mut summaries = Vec::new();

    for file in workflow_files(dir)? {
        let parsed = fs::read_to_string(&file)
            .map_err(|source| ScanError::WorkflowRead {
                path: file.clone(),
                source,
            })
            .and_then(|yaml| parse_workflow(&yaml, &file));

        match parsed {
            Ok(workflow) => summaries.push(WorkflowSummary {
                problems: quick_validate(&workflow),
                steps: workflow.pipeline.len(),
                name: workflow.name,
                description: workflow.description,
                file,
            }),
            Err(e) => warn!("Could not load {}: {}", file.display(), e),
        }
    }

    Ok(summaries)
}

/// Loads the workflows with the given names from a directory.
///
/// Names are matched against each file's `name` field (or its file stem when
/// the field is absent). The result follows the order of `names`.
pub fn load_workflows_by_names(dir: impl AsRef<Path>, names: &[String]) -> Result<Vec<Workflow>> {
    let available = list_workflows(dir.as_ref())?;

    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            let summary = available.iter().find(|s| s.name == name).ok_or_else(|| {
                ScanError::UnknownWorkflow {
                    name: name.to_string(),
                    available: available
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                }
            })?;
            load_workflow(&summary.file)
        })
        .collect()
}

//! Result Path Layout
//!
//! Every step writes to a deterministic location:
//!
//! ```text
//! results-scan/<target-canonical>/<category?>/<step-name>/scan-at-<date>[-<suffix>]
//! ```
//!
//! The layout is shared by every workflow, so two workflows with a step of the
//! same name and category write into the same directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::workflow::{PipelineStep, Target};

/// Default root directory for scan results.
pub const DEFAULT_RESULTS_DIR: &str = "results-scan";

/// File name prefix shared by all result artifacts.
pub const ARTIFACT_PREFIX: &str = "scan-at-";

/// Maps targets and steps to result locations under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    root: PathBuf,
}

impl Default for ResultsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_DIR)
    }
}

impl ResultsLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the results root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every result of one target.
    pub fn target_dir(&self, target: &Target) -> PathBuf {
        self.root.join(target.canonical())
    }

    /// Directory holding every result of one step for one target.
    pub fn step_dir(&self, target: &Target, step: &PipelineStep) -> PathBuf {
        let mut dir = self.target_dir(target);
        if let Some(category) = step.category() {
            dir.push(category);
        }
        dir.push(&step.name);
        dir
    }

    /// Output path of a step for a given run date.
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use scanflow::results::ResultsLayout;
    /// use scanflow::workflow::{PipelineStep, Target};
    ///
    /// let layout = ResultsLayout::default();
    /// let path = layout.output_path(
    ///     &Target::new("10.0.0.0/24"),
    ///     &PipelineStep::new("scan", "nmap {domain}"),
    ///     "2024-01-01",
    /// );
    /// assert_eq!(path, PathBuf::from("results-scan/10.0.0.0-24/scan/scan-at-2024-01-01"));
    /// ```
    pub fn output_path(&self, target: &Target, step: &PipelineStep, run_date: &str) -> PathBuf {
        self.step_dir(target, step)
            .join(artifact_name(run_date, step.output_suffix.as_deref()))
    }
}

/// File name of an artifact produced on `run_date`.
pub fn artifact_name(run_date: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}{}-{}", ARTIFACT_PREFIX, run_date, suffix),
        None => format!("{}{}", ARTIFACT_PREFIX, run_date),
    }
}

/// Returns true if `name` looks like a result artifact.
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX)
}

/// Returns true if `path` holds usable output: a non-empty file or a
/// non-empty directory.
pub fn is_output_valid(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };

    if metadata.is_dir() {
        fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    } else {
        metadata.len() > 0
    }
}

/// Lists the artifacts directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn list_artifacts(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut artifacts: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_artifact_name)
        })
        .map(|entry| entry.path())
        .collect();
    artifacts.sort();
    artifacts
}

/// Returns true if `dir` contains at least one artifact.
pub fn has_any_artifact(dir: &Path) -> bool {
    !list_artifacts(dir).is_empty()
}

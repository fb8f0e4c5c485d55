//! Workflow Data Model
//!
//! Core data structures describing a scan workflow and its pipeline steps.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: web-recon
//! description: Subdomain discovery followed by HTTP probing
//! reference: https://example.org/playbooks/web-recon
//! pipeline:
//!   - name: subfinder
//!     category: subdomains
//!     command: subfinder -d {domain} -o {outputFile}
//!
//!   - name: assetfinder
//!     category: subdomains
//!     command: assetfinder {domain} > {outputFile}
//!
//!   - name: httpx
//!     category: http
//!     outputSuffix: alive.txt
//!     command: cat subfinder.outputFile assetfinder.outputFile | httpx -o {outputFile}
//! ```

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// A single step of a scan pipeline.
///
/// The command is a template; see [`crate::workflow::template`] for the
/// placeholders it may contain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    /// Step name, unique within its pipeline
    pub name: String,

    /// Command template executed through the shell
    pub command: String,

    /// Grouping key used for the output layout and for concurrency
    #[serde(
        default,
        alias = "cat_base",
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    /// Suffix appended to the output file name
    #[serde(
        default,
        rename = "outputSuffix",
        alias = "output_suffix",
        alias = "output_file",
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_suffix: Option<String>,
}

/// Treats missing, null and whitespace-only strings as absent.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

impl PipelineStep {
    /// Creates a new step with no category and no output suffix.
    ///
    /// # Example
    ///
    /// ```
    /// use scanflow::workflow::PipelineStep;
    ///
    /// let step = PipelineStep::new("httpx", "httpx -l subfinder.outputFile -o {outputFile}")
    ///     .with_category("http")
    ///     .with_output_suffix("alive.txt");
    /// assert_eq!(step.category.as_deref(), Some("http"));
    /// ```
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            command: command.into().trim().to_string(),
            category: None,
            output_suffix: None,
        }
    }

    /// Sets the category. Blank values clear it.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into().trim().to_string();
        self.category = (!category.is_empty()).then_some(category);
        self
    }

    /// Sets the output suffix. Blank values clear it.
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into().trim().to_string();
        self.output_suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Returns the category, or `None` when the step has none.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// A named workflow: an ordered pipeline of steps plus descriptive metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Workflow {
    /// Workflow name (falls back to the file stem when loaded from disk)
    #[serde(default)]
    pub name: String,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Link or note pointing to the methodology this workflow follows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Ordered list of steps
    #[serde(default)]
    pub pipeline: Vec<PipelineStep>,
}

impl Workflow {
    /// Creates a new empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a workflow from a list of steps.
    pub fn from_steps(name: impl Into<String>, pipeline: Vec<PipelineStep>) -> Self {
        Self {
            name: name.into(),
            pipeline,
            ..Self::default()
        }
    }

    /// Appends a step, rejecting duplicate names.
    pub fn add_step(&mut self, step: PipelineStep) -> Result<(), String> {
        if self.pipeline.iter().any(|s| s.name == step.name) {
            return Err(format!("Step '{}' already exists", step.name));
        }
        self.pipeline.push(step);
        Ok(())
    }

    /// Returns the pipeline position of a step.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.pipeline.iter().position(|s| s.name == name)
    }

    /// Returns the step names in pipeline order.
    pub fn step_names(&self) -> Vec<&str> {
        self.pipeline.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns the number of steps in the pipeline.
    pub fn len(&self) -> usize {
        self.pipeline.len()
    }

    /// Returns true if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.pipeline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_creation() {
        let step = PipelineStep::new(" naabu ", "naabu -host {domain}")
            .with_category("ports")
            .with_output_suffix("ports.txt");

        assert_eq!(step.name, "naabu");
        assert_eq!(step.category(), Some("ports"));
        assert_eq!(step.output_suffix.as_deref(), Some("ports.txt"));
    }

    #[test]
    fn test_blank_category_is_none() {
        let step = PipelineStep::new("a", "echo").with_category("   ");
        assert!(step.category.is_none());
    }

    #[test]
    fn test_workflow_add_step_rejects_duplicates() {
        let mut workflow = Workflow::new("recon");
        let step = PipelineStep::new("step1", "echo test");

        assert!(workflow.add_step(step.clone()).is_ok());
        assert!(workflow.add_step(step).is_err());
        assert_eq!(workflow.len(), 1);
    }

    #[test]
    fn test_workflow_position() {
        let workflow = Workflow::from_steps(
            "recon",
            vec![PipelineStep::new("a", "echo a"), PipelineStep::new("b", "echo b")],
        );
        assert_eq!(workflow.position("b"), Some(1));
        assert_eq!(workflow.position("zzz"), None);
        assert_eq!(workflow.step_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_deserialize_with_aliases() {
        let yaml = r#"
name: legacy
pipeline:
  - name: subfinder
    cat_base: subdomains
    output_file: subs.txt
    command: subfinder -d {domain} -o {outputFile}
  - name: dnsx
    category: ""
    command: dnsx -l subfinder.outputFile
"#;
        let workflow: Workflow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(workflow.pipeline[0].category(), Some("subdomains"));
        assert_eq!(workflow.pipeline[0].output_suffix.as_deref(), Some("subs.txt"));
        assert!(workflow.pipeline[1].category.is_none());
        assert!(workflow.description.is_none());
    }

    #[test]
    fn test_deserialize_camel_case_suffix() {
        let yaml = r#"
name: web
description: probe
reference: https://example.org
pipeline:
  - name: httpx
    outputSuffix: alive.txt
    command: httpx -u {domain}
"#;
        let workflow: Workflow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(workflow.pipeline[0].output_suffix.as_deref(), Some("alive.txt"));
        assert_eq!(workflow.reference.as_deref(), Some("https://example.org"));
    }
}

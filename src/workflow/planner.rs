//! Execution Planner
//!
//! Partitions an ordered pipeline into execution groups:
//! - Groups run strictly in pipeline order
//! - Steps inside a group may run concurrently
//! - A step referencing an earlier step's output opens a new group
//!
//! Dependencies are inferred only from `<step>.outputFile` placeholders in
//! command templates. This is an approximation of a dependency graph and does
//! not see dependencies expressed through artifacts of previous runs.

use log::debug;

use super::model::PipelineStep;
use super::template::references_step;

/// A run of consecutive pipeline steps executed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionGroup {
    /// Category shared by the group's steps
    pub category: Option<String>,
    /// Steps in pipeline order
    pub steps: Vec<PipelineStep>,
    /// Whether the steps may run at the same time
    pub concurrent: bool,
}

impl ExecutionGroup {
    fn seeded(step: &PipelineStep) -> Self {
        Self {
            category: step.category.clone(),
            steps: vec![step.clone()],
            concurrent: false,
        }
    }

    fn accepts(&self, step: &PipelineStep) -> bool {
        match (&self.category, step.category()) {
            (Some(current), Some(category)) => current == category,
            _ => false,
        }
    }

    fn push(&mut self, step: &PipelineStep) {
        self.steps.push(step.clone());
        self.concurrent = self.steps.len() > 1;
    }

    /// Returns the names of the group's steps.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Returns true if `step` consumes `prior`'s output.
///
/// The check is purely syntactic: it looks for `prior.outputFile` (or the
/// wildcard form) in `step`'s command template.
pub fn depends_on(step: &PipelineStep, prior: &PipelineStep) -> bool {
    references_step(&step.command, &prior.name)
}

/// Splits a pipeline into ordered execution groups.
///
/// Scanning left to right, a step starts a new group when it references any
/// earlier step's output, or when its category is empty or differs from the
/// current group's category. Otherwise it joins the current group.
///
/// # Example
///
/// ```
/// use scanflow::workflow::{plan_groups, PipelineStep};
///
/// let pipeline = vec![
///     PipelineStep::new("a", "tool-a {domain}").with_category("c1"),
///     PipelineStep::new("b", "tool-b {domain}").with_category("c1"),
///     PipelineStep::new("c", "tool-c a.outputFile"),
/// ];
/// let groups = plan_groups(&pipeline);
/// assert_eq!(groups.len(), 2);
/// assert!(groups[0].concurrent);
/// ```
pub fn plan_groups(pipeline: &[PipelineStep]) -> Vec<ExecutionGroup> {
    let mut groups = Vec::new();
    let mut current: Option<ExecutionGroup> = None;

    for (index, step) in pipeline.iter().enumerate() {
        let has_dependency = pipeline[..index].iter().any(|prior| depends_on(step, prior));

        match current.as_mut() {
            Some(group) if !has_dependency && group.accepts(step) => group.push(step),
            _ => {
                if has_dependency {
                    debug!("Step '{}' depends on an earlier step, starting new group", step.name);
                }
                if let Some(done) = current.replace(ExecutionGroup::seeded(step)) {
                    groups.push(done);
                }
            }
        }
    }

    if let Some(done) = current {
        groups.push(done);
    }

    debug!(
        "Planned {} groups: {:?}",
        groups.len(),
        groups.iter().map(|g| g.step_names()).collect::<Vec<_>>()
    );

    groups
}

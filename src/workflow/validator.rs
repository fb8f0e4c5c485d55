//! Workflow Validation
//!
//! Structural checks run once at load time:
//! - Pipeline is not empty
//! - Step names are present, unique and referenceable as `<name>.outputFile`
//! - Every step has a command
//!
//! References to steps outside the pipeline are not errors; they are resolved
//! from earlier results at run time, so they only produce log output here.

use std::collections::HashSet;

use log::{debug, info, warn};

use super::model::Workflow;
use super::template::{is_valid_step_name, referenced_steps, OUTPUT_PLACEHOLDER};
use crate::error::{Result, ScanError};

/// Validates a workflow's structure.
///
/// Returns the first fatal problem found. Non-fatal observations (references
/// to unknown or later steps) are logged.
pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
    info!(
        "Validating workflow '{}' with {} steps",
        workflow.name,
        workflow.pipeline.len()
    );

    if workflow.pipeline.is_empty() {
        return Err(ScanError::EmptyPipeline {
            workflow: workflow.name.clone(),
        });
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (position, step) in workflow.pipeline.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(ScanError::EmptyStepName {
                workflow: workflow.name.clone(),
                position,
            });
        }

        if !is_valid_step_name(&step.name) {
            return Err(ScanError::InvalidStepName {
                workflow: workflow.name.clone(),
                step: step.name.clone(),
            });
        }

        if !seen.insert(step.name.as_str()) {
            return Err(ScanError::DuplicateStep {
                workflow: workflow.name.clone(),
                step: step.name.clone(),
            });
        }

        if step.command.trim().is_empty() {
            return Err(ScanError::EmptyCommand {
                workflow: workflow.name.clone(),
                step: step.name.clone(),
            });
        }
    }

    for (position, step) in workflow.pipeline.iter().enumerate() {
        for reference in referenced_steps(&step.command) {
            match workflow.position(&reference) {
                None => warn!(
                    "Step '{}' references '{}' which is not in workflow '{}'; \
                     previous results will be used",
                    step.name,
                    reference,
                    workflow.name
                ),
                Some(target) if target >= position => warn!(
                    "Step '{}' references '{}' which does not run before it",
                    step.name, reference
                ),
                Some(_) => {}
            }
        }

        if !step.command.contains(OUTPUT_PLACEHOLDER) {
            debug!("Step '{}' does not write to {}", step.name, OUTPUT_PLACEHOLDER);
        }
    }

    Ok(())
}

/// Collects every problem instead of stopping at the first one.
///
/// Used when listing workflows so a broken file can still be shown.
pub fn quick_validate(workflow: &Workflow) -> Vec<String> {
    let mut problems = Vec::new();

    if workflow.pipeline.is_empty() {
        problems.push("Workflow has no pipeline steps".to_string());
        return problems;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for step in &workflow.pipeline {
        if step.name.trim().is_empty() {
            problems.push("A step has an empty name".to_string());
            continue;
        }
        if !is_valid_step_name(&step.name) {
            problems.push(format!("Step '{}': invalid name", step.name));
        }
        if !seen.insert(step.name.as_str()) {
            problems.push(format!("Duplicate step name: '{}'", step.name));
        }
        if step.command.trim().is_empty() {
            problems.push(format!("Step '{}': missing command", step.name));
        }
    }

    problems
}

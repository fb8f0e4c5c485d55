//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, loading and planning
//! scan workflows.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (PipelineStep, Workflow)
//! - [`parser`]: YAML loading from files and workflow directories
//! - [`validator`]: Structural validation
//! - [`template`]: Command template grammar
//! - [`planner`]: Dependency grouping into execution groups
//! - [`targets`]: Target list loading

pub mod model;
pub mod parser;
pub mod planner;
pub mod targets;
pub mod template;
pub mod validator;

pub use model::{PipelineStep, Workflow};
pub use parser::{
    list_workflows, load_workflow, load_workflows_by_names, load_workflows_dir, WorkflowSummary,
    DEFAULT_WORKFLOWS_DIR,
};
pub use planner::{depends_on, plan_groups, ExecutionGroup};
pub use targets::{load_targets, parse_targets, Target};
pub use template::{parse_template, referenced_steps, references_step, Token};
pub use validator::validate_workflow;

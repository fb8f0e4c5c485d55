//! Scan Execution Module
//!
//! Decides, resolves and runs pipeline steps for every target, keeping one
//! shared status table current.
//!
//! # Architecture
//!
//! - [`engine`]: Scan orchestration across workflows, targets and groups
//! - [`decider`]: Skip/rescan decisions
//! - [`resolver`]: Placeholder substitution in step commands
//! - [`step`]: Individual step execution
//! - [`status`]: Shared status table and snapshots
//! - [`pool`]: Bounded worker pool

pub mod decider;
pub mod engine;
pub mod pool;
pub mod resolver;
pub mod status;
pub mod step;

pub use decider::{
    decide, initial_status, ExistingOutput, RescanMode, RunReason, SkipReason, Verdict,
};
pub use engine::{
    Engine, RunContext, RunSummary, DEFAULT_PARALLEL_TARGETS, DEFAULT_PARALLEL_WORKFLOWS,
    DEFAULT_STEP_WORKERS,
};
pub use resolver::{
    resolve_command, ResolveContext, ResolvedCommand, ResolvedPathCache, UnresolvedReference,
};
pub use status::{StatusSnapshot, StatusTable, StepOutcome, StepStatus};
pub use step::{execute_step, PlannedStep, StepAction, StepReport};

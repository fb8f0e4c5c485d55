//! scanflow - Multi-step Scan Workflow Engine
//!
//! Runs ordered pipelines of external scanning tools against a list of
//! targets (domains or CIDR ranges). Outputs land in a deterministic results
//! tree, later steps consume earlier outputs through placeholders, and steps
//! whose results already exist on disk are skipped.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: Workflow definitions, templates, grouping and targets
//! - [`results`]: Results tree layout and lookup of earlier artifacts
//! - [`execution`]: Skip decisions, command resolution and the scan engine
//! - [`monitoring`]: Progress rendering of the shared status table
//!
//! # Example
//!
//! ```rust,no_run
//! use scanflow::execution::Engine;
//! use scanflow::{load_targets, load_workflows_dir};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load every workflow in scans-wf/
//!     let workflows = load_workflows_dir("scans-wf")?;
//!     let targets = load_targets("targets.txt")?;
//!
//!     // Scan three targets at a time
//!     let mut engine = Engine::new();
//!     engine.set_parallel_targets(3);
//!
//!     let summary = engine.run(&workflows, &targets);
//!     println!("{} failed steps", summary.failed);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod monitoring;
pub mod results;
pub mod workflow;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use execution::engine::{Engine, RunContext, RunSummary};
pub use execution::RescanMode;
pub use workflow::model::{PipelineStep, Workflow};
pub use workflow::parser::{load_workflow, load_workflows_dir};
pub use workflow::targets::{load_targets, Target};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "scanflow";

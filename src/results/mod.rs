//! Scan Results Module
//!
//! The filesystem is where results live and how separate runs coordinate.
//!
//! - [`layout`]: Deterministic output paths and output checks
//! - [`history`]: Lookup of artifacts from earlier runs
//! - [`report`]: Latest scan date and per-date listings

pub mod history;
pub mod layout;
pub mod report;

pub use history::ResultHistory;
pub use layout::{
    has_any_artifact, is_output_valid, list_artifacts, ResultsLayout, ARTIFACT_PREFIX,
    DEFAULT_RESULTS_DIR,
};
pub use report::{latest_scan_date, results_for_date, ResultFile};

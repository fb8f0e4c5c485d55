//! Progress Monitoring Module
//!
//! Renders the shared status table while scans run.
//!
//! # Components
//!
//! - [`ProgressRenderer`]: Hook the engine calls with status snapshots
//! - [`TableRenderer`]: Colored step × target table on stdout
//! - [`NullRenderer`]: Renders nothing

pub mod progress;

pub use progress::{NullRenderer, ProgressRenderer, TableRenderer};

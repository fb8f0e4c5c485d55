//! Results Report
//!
//! Read-only queries over the results tree used by the command line:
//! finding the most recent scan date and listing the artifacts of one date.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::layout::{ResultsLayout, ARTIFACT_PREFIX};

/// One artifact found in the results tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    /// Canonical target directory name
    pub target: String,
    /// Directory of the artifact relative to the target (category/step)
    pub location: PathBuf,
    /// Full path of the artifact
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

impl ResultFile {
    /// Formats the size as bytes or kilobytes.
    pub fn human_size(&self) -> String {
        if self.size < 1024 {
            format!("{} bytes", self.size)
        } else {
            format!("{:.1} KB", self.size as f64 / 1024.0)
        }
    }
}

/// Extracts the scan date from an artifact file name.
///
/// `scan-at-2024-01-05-alive.txt` yields 2024-01-05.
pub fn artifact_date(file_name: &str) -> Option<NaiveDate> {
    let rest = file_name.strip_prefix(ARTIFACT_PREFIX)?;
    let date = rest.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Recursively collects every artifact file under `dir`.
fn collect_artifact_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_artifact_files(&path, found);
        } else if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(ARTIFACT_PREFIX))
        {
            found.push(path);
        }
    }
}

/// Returns the most recent scan date present in the results tree.
pub fn latest_scan_date(layout: &ResultsLayout) -> Option<NaiveDate> {
    let mut files = Vec::new();
    collect_artifact_files(layout.root(), &mut files);

    files
        .iter()
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
        .filter_map(artifact_date)
        .max()
}

/// Lists the artifacts produced on `date`, grouped by target in path order.
pub fn results_for_date(layout: &ResultsLayout, date: NaiveDate) -> Vec<ResultFile> {
    let stamp = format!("{}{}", ARTIFACT_PREFIX, date.format("%Y-%m-%d"));
    let mut files = Vec::new();
    collect_artifact_files(layout.root(), &mut files);
    files.sort();

    files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&stamp))
        })
        .filter_map(|path| {
            let relative = path.strip_prefix(layout.root()).ok()?.to_path_buf();
            let mut components = relative.components();
            let target = components.next()?.as_os_str().to_string_lossy().to_string();
            let location = components
                .as_path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            Some(ResultFile {
                target,
                location,
                path,
                size,
            })
        })
        .collect()
}

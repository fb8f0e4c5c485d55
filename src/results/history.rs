//! Result History Lookup
//!
//! Finds artifacts left on disk by earlier runs for a step that is not part
//! of the current pipeline. Only the step name is known, so both
//! `<target>/<step>` and `<target>/<category>/<step>` are searched.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use log::debug;

use super::layout::{artifact_name, list_artifacts, ResultsLayout};
use crate::workflow::Target;

/// Searches a results tree for a step's previous artifacts.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    layout: ResultsLayout,
}

impl ResultHistory {
    /// Creates a lookup over `layout`'s results tree.
    pub fn new(layout: ResultsLayout) -> Self {
        Self { layout }
    }

    /// Directories that may hold results of `step_name` for `target`.
    pub fn step_dirs(&self, target: &Target, step_name: &str) -> Vec<PathBuf> {
        let target_dir = self.layout.target_dir(target);
        let mut dirs = Vec::new();

        let direct = target_dir.join(step_name);
        if direct.is_dir() {
            dirs.push(direct);
        }

        if let Ok(entries) = fs::read_dir(&target_dir) {
            let mut nested: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path().join(step_name))
                .filter(|candidate| candidate.is_dir())
                .collect();
            nested.sort();
            dirs.extend(nested);
        }

        dirs
    }

    /// Every artifact of `step_name` for `target`, sorted by path.
    pub fn artifacts(&self, target: &Target, step_name: &str) -> Vec<PathBuf> {
        let mut artifacts: Vec<PathBuf> = self
            .step_dirs(target, step_name)
            .iter()
            .flat_map(|dir| list_artifacts(dir))
            .collect();
        artifacts.sort();
        artifacts.dedup();
        artifacts
    }

    /// The artifact of `step_name` best matching `run_date`.
    ///
    /// Artifacts produced on `run_date` win; otherwise the most recently
    /// modified artifact is returned.
    pub fn latest_artifact(
        &self,
        target: &Target,
        step_name: &str,
        run_date: &str,
    ) -> Option<PathBuf> {
        let artifacts = self.artifacts(target, step_name);
        let same_day = artifact_name(run_date, None);

        let (today, older): (Vec<PathBuf>, Vec<PathBuf>) = artifacts.into_iter().partition(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&same_day))
        });

        let chosen = most_recent(today).or_else(|| most_recent(older));
        if let Some(ref path) = chosen {
            debug!(
                "History for '{}' on {}: {}",
                step_name,
                target.canonical(),
                path.display()
            );
        }
        chosen
    }
}

/// Picks the most recently modified path. Ties keep the later path.
fn most_recent(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths
        .into_iter()
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max()
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_with_mtime(path: &std::path::Path, age_secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "result").unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_artifacts_found_with_and_without_category() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write_with_mtime(&root.join("ex.com/probe/scan-at-2024-01-01"), 10);
        write_with_mtime(&root.join("ex.com/http/probe/scan-at-2024-01-02"), 5);
        write_with_mtime(&root.join("ex.com/http/other/scan-at-2024-01-02"), 5);

        let history = ResultHistory::new(ResultsLayout::new(root));
        let artifacts = history.artifacts(&Target::new("ex.com"), "probe");

        assert_eq!(artifacts.len(), 2);
        assert!(artifacts.iter().all(|p| p.to_string_lossy().contains("probe")));
    }

    #[test]
    fn test_latest_prefers_run_date() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write_with_mtime(&root.join("ex.com/probe/scan-at-2024-01-01"), 100);
        write_with_mtime(&root.join("ex.com/probe/scan-at-2024-02-01"), 1);

        let history = ResultHistory::new(ResultsLayout::new(root));
        let latest = history
            .latest_artifact(&Target::new("ex.com"), "probe", "2024-01-01")
            .unwrap();
        assert!(latest.ends_with("scan-at-2024-01-01"));
    }

    #[test]
    fn test_latest_falls_back_to_most_recent() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        write_with_mtime(&root.join("ex.com/probe/scan-at-2024-01-01"), 100);
        write_with_mtime(&root.join("ex.com/probe/scan-at-2023-12-01"), 1);

        let history = ResultHistory::new(ResultsLayout::new(root));
        let latest = history
            .latest_artifact(&Target::new("ex.com"), "probe", "2024-06-30")
            .unwrap();
        assert!(latest.ends_with("scan-at-2023-12-01"));
    }

    #[test]
    fn test_no_history() {
        let temp_dir = tempdir().unwrap();
        let history = ResultHistory::new(ResultsLayout::new(temp_dir.path()));
        assert!(history
            .latest_artifact(&Target::new("ex.com"), "probe", "2024-01-01")
            .is_none());
        assert!(history.artifacts(&Target::new("ex.com"), "probe").is_empty());
    }
}

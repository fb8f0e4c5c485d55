//! Shared Step Status Table
//!
//! The single piece of state shared by every concurrently running workflow
//! and target. All access goes through one mutex; readers receive owned
//! snapshots so rendering never holds the lock.
//!
//! Keys are `(target canonical form, step name)`. Two workflows that reuse a
//! step name against the same target share an entry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

/// Lifecycle state of one step for one target.
///
/// Transitions are `Waiting -> Skipped` or `Waiting -> Running -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not reached yet
    Waiting,
    /// External command in progress
    Running,
    /// External command finished (successfully or not)
    Done,
    /// Existing output was reused
    Skipped,
}

impl StepStatus {
    /// The status word shown to renderers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true for `Done` and `Skipped`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the external command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// True when the process exited with status zero
    pub success: bool,
    /// Exit code, absent when killed by a signal or never spawned
    pub exit_code: Option<i32>,
}

impl StepOutcome {
    /// A zero exit.
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
        }
    }

    /// A non-zero exit or a spawn failure.
    pub fn failed(exit_code: Option<i32>) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Identifies one step of one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusKey {
    /// Canonical target form
    pub target: String,
    /// Step name
    pub step: String,
}

impl StatusKey {
    pub fn new(target: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            step: step.into(),
        }
    }
}

/// Status plus bookkeeping for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Current status
    pub status: StepStatus,
    /// Exit outcome, set when the step reaches `Done`
    pub outcome: Option<StepOutcome>,
    started_at: Option<Instant>,
    /// Wall-clock time spent running
    pub elapsed: Option<Duration>,
}

impl StatusEntry {
    fn new(status: StepStatus) -> Self {
        Self {
            status,
            outcome: None,
            started_at: None,
            elapsed: None,
        }
    }

    /// Returns true if the step ran and its command failed.
    pub fn failed(&self) -> bool {
        self.outcome.is_some_and(|o| !o.success)
    }
}

/// Mutex-guarded status map shared across all workers.
#[derive(Debug, Default)]
pub struct StatusTable {
    entries: Mutex<HashMap<StatusKey, StatusEntry>>,
}

impl StatusTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StatusKey, StatusEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the status of a key.
    ///
    /// `Waiting` and `Skipped` clear any previous outcome; `Running` starts
    /// the clock.
    pub fn set(&self, target: &str, step: &str, status: StepStatus) {
        let mut entries = self.lock();
        transition(&mut entries, target, step, status);
    }

    /// Marks a key `Done` and records how its command ended.
    pub fn finish(&self, target: &str, step: &str, outcome: StepOutcome) {
        let mut entries = self.lock();
        transition(&mut entries, target, step, StepStatus::Done).outcome = Some(outcome);
    }

    /// Returns the status of a key, if initialised.
    pub fn get(&self, target: &str, step: &str) -> Option<StepStatus> {
        self.lock()
            .get(&StatusKey::new(target, step))
            .map(|entry| entry.status)
    }

    /// Returns a copy of a key's entry.
    pub fn entry(&self, target: &str, step: &str) -> Option<StatusEntry> {
        self.lock().get(&StatusKey::new(target, step)).cloned()
    }

    /// Returns a consistent copy of the whole table.
    pub fn snapshot(&self) -> StatusSnapshot {
        let entries = self
            .lock()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        StatusSnapshot { entries }
    }
}

fn transition<'a>(
    entries: &'a mut HashMap<StatusKey, StatusEntry>,
    target: &str,
    step: &str,
    status: StepStatus,
) -> &'a mut StatusEntry {
    let entry = entries
        .entry(StatusKey::new(target, step))
        .or_insert_with(|| StatusEntry::new(status));

    debug!("{}::{} {} -> {}", target, step, entry.status, status);

    match status {
        StepStatus::Waiting | StepStatus::Skipped => {
            *entry = StatusEntry::new(status);
        }
        StepStatus::Running => {
            entry.status = status;
            entry.outcome = None;
            entry.started_at = Some(Instant::now());
            entry.elapsed = None;
        }
        StepStatus::Done => {
            entry.status = status;
            entry.elapsed = entry.started_at.map(|start| start.elapsed());
        }
    }

    entry
}

/// Aggregate counts over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub waiting: usize,
    pub running: usize,
    pub done: usize,
    pub skipped: usize,
    /// Done entries whose command failed
    pub failed: usize,
}

impl StatusCounts {
    fn add(&mut self, entry: &StatusEntry) {
        match entry.status {
            StepStatus::Waiting => self.waiting += 1,
            StepStatus::Running => self.running += 1,
            StepStatus::Done => self.done += 1,
            StepStatus::Skipped => self.skipped += 1,
        }
        if entry.failed() {
            self.failed += 1;
        }
    }

    /// Entries that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.done + self.skipped
    }
}

/// One serialisable row of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    pub target: String,
    pub step: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// Point-in-time copy of the status table, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    entries: BTreeMap<StatusKey, StatusEntry>,
}

impl StatusSnapshot {
    /// Returns the entry for a key.
    pub fn entry(&self, target: &str, step: &str) -> Option<&StatusEntry> {
        self.entries.get(&StatusKey::new(target, step))
    }

    /// Counts over every entry.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.entries.values() {
            counts.add(entry);
        }
        counts
    }

    /// Counts over the given keys; missing keys count as waiting.
    pub fn counts_for<'a>(
        &self,
        keys: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for (target, step) in keys {
            match self.entry(target, step) {
                Some(entry) => counts.add(entry),
                None => counts.waiting += 1,
            }
        }
        counts
    }

    /// Flattens the snapshot into serialisable rows.
    pub fn records(&self) -> Vec<StatusRecord> {
        self.entries
            .iter()
            .map(|(key, entry)| StatusRecord {
                target: key.target.clone(),
                step: key.step.clone(),
                status: entry.status,
                outcome: entry.outcome,
                elapsed_ms: entry.elapsed.map(|d| d.as_millis() as u64),
            })
            .collect()
    }

    /// Serialises the snapshot as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_status_words() {
        assert_eq!(StepStatus::Waiting.as_str(), "waiting");
        assert_eq!(StepStatus::Running.to_string(), "running");
        assert!(StepStatus::Done.is_terminal());
        assert!(StepStatus::Skipped.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
    }

    #[test]
    fn test_set_and_get() {
        let table = StatusTable::new();
        assert_eq!(table.get("ex.com", "nmap"), None);

        table.set("ex.com", "nmap", StepStatus::Waiting);
        assert_eq!(table.get("ex.com", "nmap"), Some(StepStatus::Waiting));

        table.set("ex.com", "nmap", StepStatus::Running);
        table.finish("ex.com", "nmap", StepOutcome::succeeded());

        let entry = table.entry("ex.com", "nmap").unwrap();
        assert_eq!(entry.status, StepStatus::Done);
        assert_eq!(entry.outcome, Some(StepOutcome::succeeded()));
        assert!(entry.elapsed.is_some());
    }

    #[test]
    fn test_waiting_resets_outcome() {
        let table = StatusTable::new();
        table.set("t", "s", StepStatus::Running);
        table.finish("t", "s", StepOutcome::failed(Some(2)));
        assert!(table.entry("t", "s").unwrap().failed());

        table.set("t", "s", StepStatus::Waiting);
        let entry = table.entry("t", "s").unwrap();
        assert!(entry.outcome.is_none());
        assert!(!entry.failed());
    }

    #[test]
    fn test_snapshot_counts() {
        let table = StatusTable::new();
        table.set("a", "s1", StepStatus::Waiting);
        table.set("a", "s2", StepStatus::Skipped);
        table.set("b", "s1", StepStatus::Running);
        table.set("b", "s2", StepStatus::Running);
        table.finish("b", "s2", StepOutcome::failed(Some(1)));

        let counts = table.snapshot().counts();
        assert_eq!(counts.waiting, 1);
        assert_eq!(counts.running, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.done, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.finished(), 2);
    }

    #[test]
    fn test_counts_for_missing_keys_are_waiting() {
        let table = StatusTable::new();
        table.set("a", "s1", StepStatus::Skipped);
        let snapshot = table.snapshot();

        let counts = snapshot.counts_for([("a", "s1"), ("a", "s2")]);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.waiting, 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let table = StatusTable::new();
        table.set("a", "s", StepStatus::Waiting);
        let snapshot = table.snapshot();
        table.set("a", "s", StepStatus::Running);

        assert_eq!(snapshot.entry("a", "s").map(|e| e.status), Some(StepStatus::Waiting));
        assert_eq!(table.get("a", "s"), Some(StepStatus::Running));
    }

    #[test]
    fn test_snapshot_json() {
        let table = StatusTable::new();
        table.set("ex.com", "nmap", StepStatus::Skipped);

        let json = table.snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["target"], "ex.com");
        assert_eq!(value[0]["status"], "skipped");
    }

    #[test]
    fn test_concurrent_updates() {
        let table = Arc::new(StatusTable::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for step in 0..50 {
                        let step = format!("s{}", step);
                        table.set(&format!("t{}", i), &step, StepStatus::Running);
                        table.finish(&format!("t{}", i), &step, StepOutcome::succeeded());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let counts = table.snapshot().counts();
        assert_eq!(counts.done, 400);
        assert_eq!(counts.failed, 0);
    }
}

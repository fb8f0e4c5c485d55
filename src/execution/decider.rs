//! Skip/Rescan Decisions
//!
//! Decides per step whether existing output on disk is enough or the step has
//! to run. The mode is chosen once per invocation:
//!
//! - `Smart`: reuse any existing result
//! - `ForceAll`: run everything
//! - `ForceSelected`: run the selected steps (and, for a single selection,
//!   everything after it); reuse existing output elsewhere, but still run a
//!   step that has none, since later steps may need it

use std::collections::BTreeSet;
use std::fmt;

use crate::results::{has_any_artifact, is_output_valid, ResultsLayout};
use crate::workflow::{PipelineStep, Target};

use super::status::StepStatus;

/// Rescan policy for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RescanMode {
    /// Skip steps that already have output
    #[default]
    Smart,
    /// Run every step
    ForceAll,
    /// Run the named steps, reuse output for the rest
    ForceSelected(BTreeSet<String>),
}

impl RescanMode {
    /// Builds a `ForceSelected` mode from step names. Blank names are ignored
    /// and an empty selection falls back to `Smart`.
    pub fn force_selected<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: BTreeSet<String> = steps
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if selected.is_empty() {
            Self::Smart
        } else {
            Self::ForceSelected(selected)
        }
    }
}

impl fmt::Display for RescanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smart => f.write_str("smart"),
            Self::ForceAll => f.write_str("force-all"),
            Self::ForceSelected(steps) => {
                let names: Vec<&str> = steps.iter().map(String::as_str).collect();
                write!(f, "force-selected({})", names.join(","))
            }
        }
    }
}

/// What is already on disk for a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistingOutput {
    /// The step's results directory holds at least one artifact
    pub any_result: bool,
    /// The exact output path for this run is a non-empty file or directory
    pub exact_output: bool,
}

impl ExistingOutput {
    /// Inspects the filesystem for a step's output.
    pub fn inspect(
        layout: &ResultsLayout,
        target: &Target,
        step: &PipelineStep,
        run_date: &str,
    ) -> Self {
        Self {
            any_result: has_any_artifact(&layout.step_dir(target, step)),
            exact_output: is_output_valid(&layout.output_path(target, step, run_date)),
        }
    }

    /// Returns true if either check found output.
    pub fn present(&self) -> bool {
        self.any_result || self.exact_output
    }
}

/// Why a step is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Some result already exists in the step's directory
    ExistingResults,
    /// This run's output path already holds data
    ExistingOutput,
    /// Not selected for rescan and output exists
    OutsideRescanScope,
}

/// Why a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReason {
    /// Nothing on disk yet
    NoExistingOutput,
    /// Every step is forced
    ForceAll,
    /// Named in the rescan selection
    Selected,
    /// Comes at or after the single selected step
    AfterSelected,
    /// Not selected but has no output for later steps to use
    MissingOutput,
}

/// Run-or-skip decision for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Run(RunReason),
    Skip(SkipReason),
}

impl Verdict {
    /// Returns true if the step should run.
    pub fn should_run(&self) -> bool {
        matches!(self, Self::Run(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Run(RunReason::NoExistingOutput) => "run: no existing output",
            Self::Run(RunReason::ForceAll) => "run: rescan all",
            Self::Run(RunReason::Selected) => "run: selected for rescan",
            Self::Run(RunReason::AfterSelected) => "run: follows selected step",
            Self::Run(RunReason::MissingOutput) => "run: output missing",
            Self::Skip(SkipReason::ExistingResults) => "skip: any result already exists",
            Self::Skip(SkipReason::ExistingOutput) => "skip: output already exists",
            Self::Skip(SkipReason::OutsideRescanScope) => "skip: not selected for rescan",
        };
        f.write_str(text)
    }
}

/// Decides whether `pipeline[index]` runs.
///
/// `existing` describes what is on disk for that step; see
/// [`ExistingOutput::inspect`].
pub fn decide(
    mode: &RescanMode,
    pipeline: &[PipelineStep],
    index: usize,
    existing: ExistingOutput,
) -> Verdict {
    match mode {
        RescanMode::ForceAll => Verdict::Run(RunReason::ForceAll),
        RescanMode::Smart => {
            if existing.any_result {
                Verdict::Skip(SkipReason::ExistingResults)
            } else if existing.exact_output {
                Verdict::Skip(SkipReason::ExistingOutput)
            } else {
                Verdict::Run(RunReason::NoExistingOutput)
            }
        }
        RescanMode::ForceSelected(selected) => {
            let name = &pipeline[index].name;
            if selected.contains(name) {
                return Verdict::Run(RunReason::Selected);
            }

            if selected.len() == 1 {
                let start = selected
                    .iter()
                    .next()
                    .and_then(|only| pipeline.iter().position(|s| &s.name == only));
                if start.is_some_and(|start| index >= start) {
                    return Verdict::Run(RunReason::AfterSelected);
                }
            }

            if existing.present() {
                Verdict::Skip(SkipReason::OutsideRescanScope)
            } else {
                Verdict::Run(RunReason::MissingOutput)
            }
        }
    }
}

/// Status a key starts with when a workflow run is initialised.
///
/// Steps that a forced selection leaves out and that already have output are
/// known to be skipped before any worker starts.
pub fn initial_status(
    mode: &RescanMode,
    pipeline: &[PipelineStep],
    index: usize,
    existing: ExistingOutput,
) -> StepStatus {
    match (mode, decide(mode, pipeline, index, existing)) {
        (RescanMode::ForceSelected(_), Verdict::Skip(_)) => StepStatus::Skipped,
        _ => StepStatus::Waiting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline() -> Vec<PipelineStep> {
        ["a", "b", "c", "d"]
            .iter()
            .map(|name| PipelineStep::new(*name, "echo"))
            .collect()
    }

    const NOTHING: ExistingOutput = ExistingOutput {
        any_result: false,
        exact_output: false,
    };
    const SOMETHING: ExistingOutput = ExistingOutput {
        any_result: true,
        exact_output: false,
    };

    #[test]
    fn test_smart_skips_existing_results() {
        let p = pipeline();
        assert_eq!(
            decide(&RescanMode::Smart, &p, 0, SOMETHING),
            Verdict::Skip(SkipReason::ExistingResults)
        );
        let exact = ExistingOutput {
            any_result: false,
            exact_output: true,
        };
        assert_eq!(
            decide(&RescanMode::Smart, &p, 0, exact),
            Verdict::Skip(SkipReason::ExistingOutput)
        );
        assert_eq!(
            decide(&RescanMode::Smart, &p, 0, NOTHING),
            Verdict::Run(RunReason::NoExistingOutput)
        );
    }

    #[test]
    fn test_force_all_always_runs() {
        let p = pipeline();
        for index in 0..p.len() {
            assert!(decide(&RescanMode::ForceAll, &p, index, SOMETHING).should_run());
        }
    }

    #[test]
    fn test_force_single_selection_chains_forward() {
        let p = pipeline();
        let mode = RescanMode::force_selected(["b"]);

        assert_eq!(
            decide(&mode, &p, 0, SOMETHING),
            Verdict::Skip(SkipReason::OutsideRescanScope)
        );
        assert_eq!(decide(&mode, &p, 1, SOMETHING), Verdict::Run(RunReason::Selected));
        assert_eq!(decide(&mode, &p, 2, SOMETHING), Verdict::Run(RunReason::AfterSelected));
        assert_eq!(decide(&mode, &p, 3, SOMETHING), Verdict::Run(RunReason::AfterSelected));
    }

    #[test]
    fn test_force_multiple_selection_does_not_chain() {
        let p = pipeline();
        let mode = RescanMode::force_selected(["a", "c"]);

        assert!(decide(&mode, &p, 0, SOMETHING).should_run());
        assert!(!decide(&mode, &p, 1, SOMETHING).should_run());
        assert!(decide(&mode, &p, 2, SOMETHING).should_run());
        assert!(!decide(&mode, &p, 3, SOMETHING).should_run());
    }

    #[test]
    fn test_force_selected_runs_missing_output() {
        let p = pipeline();
        let mode = RescanMode::force_selected(["c"]);
        assert_eq!(decide(&mode, &p, 0, NOTHING), Verdict::Run(RunReason::MissingOutput));
    }

    #[test]
    fn test_force_selected_step_not_in_pipeline() {
        let p = pipeline();
        let mode = RescanMode::force_selected(["elsewhere"]);
        assert!(!decide(&mode, &p, 3, SOMETHING).should_run());
    }

    #[test]
    fn test_empty_selection_is_smart() {
        assert_eq!(RescanMode::force_selected(["", "  "]), RescanMode::Smart);
    }

    #[test]
    fn test_initial_status() {
        let p = pipeline();
        let mode = RescanMode::force_selected(["c"]);
        assert_eq!(initial_status(&mode, &p, 0, SOMETHING), StepStatus::Skipped);
        assert_eq!(initial_status(&mode, &p, 0, NOTHING), StepStatus::Waiting);
        assert_eq!(initial_status(&mode, &p, 2, SOMETHING), StepStatus::Waiting);
        assert_eq!(initial_status(&RescanMode::Smart, &p, 0, SOMETHING), StepStatus::Waiting);
    }

    #[test]
    fn test_inspect_directory_wins_over_exact_path() {
        let temp_dir = tempdir().unwrap();
        let layout = ResultsLayout::new(temp_dir.path());
        let target = Target::new("ex.com");
        let step = PipelineStep::new("recon", "echo");

        let dir = layout.step_dir(&target, &step);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("scan-at-2023-05-05"), "old").unwrap();

        let existing = ExistingOutput::inspect(&layout, &target, &step, "2024-01-01");
        assert!(existing.any_result);
        assert!(!existing.exact_output);
        assert_eq!(
            decide(&RescanMode::Smart, &[step], 0, existing),
            Verdict::Skip(SkipReason::ExistingResults)
        );
    }

    #[test]
    fn test_inspect_nothing_on_disk() {
        let temp_dir = tempdir().unwrap();
        let layout = ResultsLayout::new(temp_dir.path());
        let existing = ExistingOutput::inspect(
            &layout,
            &Target::new("ex.com"),
            &PipelineStep::new("recon", "echo"),
            "2024-01-01",
        );
        assert!(!existing.present());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(RescanMode::Smart.to_string(), "smart");
        assert_eq!(
            RescanMode::force_selected(["b", "a"]).to_string(),
            "force-selected(a,b)"
        );
    }
}

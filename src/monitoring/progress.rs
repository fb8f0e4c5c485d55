//! Progress Rendering
//!
//! Turns status snapshots into something a person can watch. The engine only
//! knows the [`ProgressRenderer`] trait; the table layout lives here.

use std::io::{self, Write};

use chrono::Local;
use colored::{ColoredString, Colorize};

use crate::execution::status::{StatusSnapshot, StepStatus};
use crate::workflow::{Target, Workflow};

/// Receives status snapshots while a workflow runs.
///
/// Called from the engine's ticker thread roughly once per second and once
/// more when a workflow finishes.
pub trait ProgressRenderer: Send + Sync {
    fn render(&self, snapshot: &StatusSnapshot);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl ProgressRenderer for NullRenderer {
    fn render(&self, _snapshot: &StatusSnapshot) {}
}

/// One workflow section of the table.
#[derive(Debug, Clone)]
struct Section {
    name: String,
    steps: Vec<String>,
}

/// Prints a step × target table per workflow to stdout.
#[derive(Debug, Clone)]
pub struct TableRenderer {
    sections: Vec<Section>,
    targets: Vec<String>,
}

impl TableRenderer {
    /// Creates a renderer for the given workflows and targets.
    pub fn new(workflows: &[Workflow], targets: &[Target]) -> Self {
        Self {
            sections: workflows
                .iter()
                .map(|w| Section {
                    name: w.name.clone(),
                    steps: w.step_names().into_iter().map(str::to_string).collect(),
                })
                .collect(),
            targets: targets.iter().map(|t| t.canonical().to_string()).collect(),
        }
    }

    /// Builds the table text for a snapshot.
    pub fn format(&self, snapshot: &StatusSnapshot) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            "Scan Progress".bold(),
            Local::now().format("%H:%M:%S").to_string().dimmed()
        ));

        let step_width = self
            .sections
            .iter()
            .flat_map(|s| s.steps.iter())
            .map(String::len)
            .max()
            .unwrap_or(4)
            .max(4);

        for section in &self.sections {
            out.push_str(&format!("\n{}\n", section.name.cyan().bold()));

            for target in &self.targets {
                out.push_str(&format!("  {}\n", target));
                for step in &section.steps {
                    let cell = match snapshot.entry(target, step) {
                        Some(entry) => paint(entry.status, entry.failed()),
                        None => "waiting".normal(),
                    };
                    out.push_str(&format!("    {:width$}  {}\n", step, cell, width = step_width));
                }
            }

            let counts = snapshot.counts_for(
                self.targets
                    .iter()
                    .flat_map(|t| section.steps.iter().map(move |s| (t.as_str(), s.as_str()))),
            );
            out.push_str(&format!(
                "\n  [WAITING: {}] [RUNNING: {}] [DONE: {}] [FAILED: {}]\n",
                counts.waiting,
                counts.running,
                counts.finished(),
                counts.failed
            ));
            out.push_str(&format!("{}\n", "-".repeat(60)));
        }

        out
    }
}

fn paint(status: StepStatus, failed: bool) -> ColoredString {
    match status {
        StepStatus::Waiting => status.as_str().normal(),
        StepStatus::Running => status.as_str().yellow(),
        StepStatus::Done if failed => "done (failed)".red(),
        StepStatus::Done => status.as_str().green(),
        StepStatus::Skipped => status.as_str().blue(),
    }
}

impl ProgressRenderer for TableRenderer {
    fn render(&self, snapshot: &StatusSnapshot) {
        let text = self.format(snapshot);
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let _ = writeln!(handle, "{}", text);
        let _ = handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::status::{StatusTable, StepOutcome};
    use crate::workflow::PipelineStep;

    fn renderer() -> TableRenderer {
        let workflow = Workflow::from_steps(
            "web",
            vec![PipelineStep::new("probe", "echo"), PipelineStep::new("crawl", "echo")],
        );
        TableRenderer::new(&[workflow], &[Target::new("ex.com"), Target::new("10.0.0.0/24")])
    }

    #[test]
    fn test_format_lists_every_cell() {
        colored::control::set_override(false);
        let table = StatusTable::new();
        table.set("ex.com", "probe", StepStatus::Skipped);
        table.set("ex.com", "crawl", StepStatus::Running);
        table.finish("ex.com", "crawl", StepOutcome::failed(Some(1)));

        let text = renderer().format(&table.snapshot());

        assert!(text.contains("web"));
        assert!(text.contains("10.0.0.0-24"));
        assert!(text.contains("skipped"));
        assert!(text.contains("done (failed)"));
        assert!(text.contains("[WAITING: 2] [RUNNING: 0] [DONE: 2] [FAILED: 1]"));
    }

    #[test]
    fn test_null_renderer() {
        NullRenderer.render(&StatusSnapshot::default());
    }
}

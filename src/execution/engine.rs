//! Scan Orchestration Engine
//!
//! Runs workflows against targets with three nested levels of bounded
//! concurrency:
//! - Workflows run in a pool of `parallel_workflows` threads
//! - Each workflow runs its targets in a pool of `parallel_targets` threads
//! - Each target runs its execution groups in order, with the steps of a
//!   concurrent group spread over at most `step_workers` threads
//!
//! Every worker reports into one shared [`StatusTable`], which a ticker
//! thread hands to the progress renderer about once per second.

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use log::{debug, info, warn};
use once_cell::sync::Lazy;

use crate::monitoring::{NullRenderer, ProgressRenderer};
use crate::results::{ResultHistory, ResultsLayout};
use crate::workflow::{plan_groups, ExecutionGroup, Target, Workflow};

use super::decider::{decide, initial_status, ExistingOutput, RescanMode, Verdict};
use super::pool::run_bounded;
use super::resolver::{resolve_command, ResolveContext, ResolvedPathCache};
use super::status::StatusTable;
use super::step::{execute_step, PlannedStep, StepAction, StepReport};

/// How often the progress renderer is called.
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep slice of the ticker thread, bounding how long it takes to stop.
const TICK_SLICE: Duration = Duration::from_millis(100);

/// Default number of workflows run at once.
pub const DEFAULT_PARALLEL_WORKFLOWS: usize = 1;

/// Default number of targets scanned at once per workflow.
pub const DEFAULT_PARALLEL_TARGETS: usize = 3;

/// Default bound on concurrently running steps of one group.
pub static DEFAULT_STEP_WORKERS: Lazy<usize> = Lazy::new(num_cpus::get);

/// Settings fixed for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Date stamped into output names (`%Y-%m-%d`)
    pub run_date: String,
    /// Rescan policy
    pub rescan_mode: RescanMode,
    /// Identifier of this invocation, used in logs
    pub scan_id: String,
}

impl RunContext {
    /// Creates a context for today with the given rescan mode.
    pub fn new(rescan_mode: RescanMode) -> Self {
        let now = Local::now();
        Self {
            run_date: now.format("%Y-%m-%d").to_string(),
            rescan_mode,
            scan_id: now.format("%Y%m%d-%H%M%S").to_string(),
        }
    }

    /// Overrides the run date.
    pub fn with_run_date(mut self, run_date: impl Into<String>) -> Self {
        self.run_date = run_date.into();
        self
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(RescanMode::Smart)
    }
}

/// Totals over one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps whose command was executed
    pub run: usize,
    /// Steps that reused existing output
    pub skipped: usize,
    /// Executed steps that exited non-zero or could not be started
    pub failed: usize,
    /// Placeholders that could not be resolved
    pub warnings: usize,
}

impl RunSummary {
    fn record(&mut self, report: &StepReport) {
        if report.skipped() {
            self.skipped += 1;
        } else {
            self.run += 1;
            if report.failed() {
                self.failed += 1;
            }
        }
    }

    fn merge(&mut self, other: &RunSummary) {
        self.run += other.run;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.warnings += other.warnings;
    }
}

/// Work item of the target pool: a target plus the path cache its run owns.
#[derive(Debug)]
struct TargetJob {
    target: Target,
    cache: ResolvedPathCache,
}

/// Clears the ticker flag when dropped.
struct TickerStop<'a>(&'a AtomicBool);

impl Drop for TickerStop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Scan orchestration engine.
///
/// # Example
///
/// ```rust,no_run
/// use scanflow::execution::{Engine, RescanMode, RunContext};
/// use scanflow::workflow::{load_targets, load_workflows_dir};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflows = load_workflows_dir("scans-wf")?;
///     let targets = load_targets("targets.txt")?;
///
///     let mut engine = Engine::new();
///     engine.set_parallel_targets(5);
///     engine.set_run_context(RunContext::new(RescanMode::ForceAll));
///
///     let summary = engine.run(&workflows, &targets);
///     println!("{} steps run, {} skipped", summary.run, summary.skipped);
///     Ok(())
/// }
/// ```
pub struct Engine {
    parallel_workflows: usize,
    parallel_targets: usize,
    step_workers: usize,
    layout: ResultsLayout,
    working_dir: Option<PathBuf>,
    context: RunContext,
    status: Arc<StatusTable>,
    renderer: Arc<dyn ProgressRenderer>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with default settings and no progress output.
    pub fn new() -> Self {
        Self {
            parallel_workflows: DEFAULT_PARALLEL_WORKFLOWS,
            parallel_targets: DEFAULT_PARALLEL_TARGETS,
            step_workers: *DEFAULT_STEP_WORKERS,
            layout: ResultsLayout::default(),
            working_dir: None,
            context: RunContext::default(),
            status: Arc::new(StatusTable::new()),
            renderer: Arc::new(NullRenderer),
        }
    }

    /// Sets how many workflows run at once.
    pub fn set_parallel_workflows(&mut self, max: usize) {
        self.parallel_workflows = max.max(1);
    }

    /// Sets how many targets each workflow scans at once.
    pub fn set_parallel_targets(&mut self, max: usize) {
        self.parallel_targets = max.max(1);
    }

    /// Sets how many steps of a concurrent group run at once.
    pub fn set_step_workers(&mut self, max: usize) {
        self.step_workers = max.max(1);
    }

    /// Sets the results directory.
    pub fn set_results_root(&mut self, root: impl Into<PathBuf>) {
        self.layout = ResultsLayout::new(root);
    }

    /// Sets the working directory for step execution. A relative results
    /// directory is taken relative to it.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = Some(dir.into());
    }

    /// Sets the run date, rescan mode and scan id.
    pub fn set_run_context(&mut self, context: RunContext) {
        self.context = context;
    }

    /// Sets the progress renderer.
    pub fn set_renderer(&mut self, renderer: Arc<dyn ProgressRenderer>) {
        self.renderer = renderer;
    }

    /// Returns the shared status table.
    pub fn status_table(&self) -> Arc<StatusTable> {
        Arc::clone(&self.status)
    }

    /// Returns the run context.
    pub fn run_context(&self) -> &RunContext {
        &self.context
    }

    /// Results layout with an absolute root. A relative root is anchored at
    /// the working directory, or the current directory when none is set.
    fn effective_layout(&self) -> ResultsLayout {
        let root = self.layout.root();
        if root.is_absolute() {
            return self.layout.clone();
        }

        match env::current_dir() {
            Ok(cwd) => {
                let base = match &self.working_dir {
                    Some(dir) => cwd.join(dir),
                    None => cwd,
                };
                ResultsLayout::new(base.join(root))
            }
            Err(e) => {
                warn!("Could not determine current directory, using relative results path: {}", e);
                self.layout.clone()
            }
        }
    }

    /// Runs every workflow against every target.
    ///
    /// Step failures never abort the run; they are counted in the returned
    /// summary and recorded in the status table.
    pub fn run(&self, workflows: &[Workflow], targets: &[Target]) -> RunSummary {
        let start_time = Instant::now();
        let layout = self.effective_layout();

        info!(
            "Scan {} started: {} workflow(s), {} target(s), date {}, mode {}",
            self.context.scan_id,
            workflows.len(),
            targets.len(),
            self.context.run_date,
            self.context.rescan_mode
        );
        info!(
            "Parallelism: {} workflow(s), {} target(s), {} step worker(s)",
            self.parallel_workflows, self.parallel_targets, self.step_workers
        );

        let total = Mutex::new(RunSummary::default());
        let queue: Vec<&Workflow> = workflows.iter().collect();
        run_bounded(queue, self.parallel_workflows, |workflow| {
            let summary = self.run_workflow(workflow, targets, &layout);
            total
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .merge(&summary);
        });
        let total = total.into_inner().unwrap_or_else(PoisonError::into_inner);

        info!(
            "Scan {} finished in {:.2?}: {} run, {} skipped, {} failed, {} unresolved reference(s)",
            self.context.scan_id,
            start_time.elapsed(),
            total.run,
            total.skipped,
            total.failed,
            total.warnings
        );
        total
    }

    fn run_workflow(
        &self,
        workflow: &Workflow,
        targets: &[Target],
        layout: &ResultsLayout,
    ) -> RunSummary {
        info!("Starting workflow '{}' ({} steps)", workflow.name, workflow.len());

        let groups = plan_groups(&workflow.pipeline);
        for (i, group) in groups.iter().enumerate() {
            debug!(
                "Workflow '{}' group {}: {:?} (concurrent: {})",
                workflow.name,
                i + 1,
                group.step_names(),
                group.concurrent
            );
        }

        self.initialise_status(workflow, targets, layout);

        let jobs: Vec<TargetJob> = targets
            .iter()
            .map(|target| TargetJob {
                target: target.clone(),
                cache: ResolvedPathCache::new(),
            })
            .collect();

        let summary = Mutex::new(RunSummary::default());
        self.with_ticker(|| {
            run_bounded(jobs, self.parallel_targets, |job| {
                let target_summary = self.run_target(workflow, &groups, job, layout);
                summary
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .merge(&target_summary);
            });
        });

        self.renderer.render(&self.status.snapshot());

        let summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        info!(
            "Workflow '{}' finished: {} run, {} skipped, {} failed",
            workflow.name, summary.run, summary.skipped, summary.failed
        );
        summary
    }

    /// Resets this workflow's keys before any target worker starts.
    fn initialise_status(&self, workflow: &Workflow, targets: &[Target], layout: &ResultsLayout) {
        let mode = &self.context.rescan_mode;
        for target in targets {
            for (index, step) in workflow.pipeline.iter().enumerate() {
                let existing =
                    ExistingOutput::inspect(layout, target, step, &self.context.run_date);
                let status = initial_status(mode, &workflow.pipeline, index, existing);
                self.status.set(target.canonical(), &step.name, status);
            }
        }
    }

    /// Runs `work` while a ticker thread renders the status table.
    ///
    /// The ticker is stopped even when `work` panics, so the scope can join it
    /// and let the panic continue.
    fn with_ticker<R>(&self, work: impl FnOnce() -> R) -> R {
        let ticking = AtomicBool::new(true);

        thread::scope(|scope| {
            scope.spawn(|| self.tick(&ticking));
            let _stop = TickerStop(&ticking);
            work()
        })
    }

    fn tick(&self, running: &AtomicBool) {
        let mut last_render = Instant::now();
        self.renderer.render(&self.status.snapshot());

        while running.load(Ordering::Relaxed) {
            thread::sleep(TICK_SLICE);
            if last_render.elapsed() >= RENDER_INTERVAL {
                self.renderer.render(&self.status.snapshot());
                last_render = Instant::now();
            }
        }
    }

    fn run_target(
        &self,
        workflow: &Workflow,
        groups: &[ExecutionGroup],
        job: TargetJob,
        layout: &ResultsLayout,
    ) -> RunSummary {
        let TargetJob { target, mut cache } = job;
        let history = ResultHistory::new(layout.clone());
        let run_date = self.context.run_date.as_str();
        let mut summary = RunSummary::default();
        let mut index = 0;

        debug!("Target {} started for workflow '{}'", target, workflow.name);

        for group in groups {
            let mut planned = Vec::with_capacity(group.steps.len());

            for step in &group.steps {
                let output_path = layout.output_path(&target, step, run_date);
                cache.record(&step.name, output_path.clone());

                let existing = ExistingOutput::inspect(layout, &target, step, run_date);
                let verdict =
                    decide(&self.context.rescan_mode, &workflow.pipeline, index, existing);
                debug!("{}::{} {}", target.canonical(), step.name, verdict);
                index += 1;

                let action = match verdict {
                    Verdict::Skip(reason) => StepAction::Skip(reason),
                    Verdict::Run(_) => {
                        let context = ResolveContext {
                            target: &target,
                            own_output: &output_path,
                            cache: &cache,
                            history: &history,
                            run_date,
                        };
                        let resolved = resolve_command(&step.name, &step.command, &context);
                        summary.warnings += resolved.warnings.len();
                        StepAction::Run {
                            command: resolved.command,
                        }
                    }
                };

                planned.push(PlannedStep {
                    target: target.canonical().to_string(),
                    step: step.name.clone(),
                    output_path,
                    action,
                });
            }

            for report in self.execute_group(group.concurrent, planned) {
                summary.record(&report);
            }
        }

        debug!("Target {} finished for workflow '{}'", target, workflow.name);
        summary
    }

    fn execute_group(&self, concurrent: bool, planned: Vec<PlannedStep>) -> Vec<StepReport> {
        let working_dir = self.working_dir.as_deref();

        if !concurrent {
            return planned
                .iter()
                .map(|step| execute_step(step, &self.status, working_dir))
                .collect();
        }

        let reports = Mutex::new(Vec::with_capacity(planned.len()));
        run_bounded(planned, self.step_workers, |step| {
            let report = execute_step(&step, &self.status, working_dir);
            reports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(report);
        });
        reports.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::status::StepStatus;
    use crate::workflow::PipelineStep;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn engine_in(dir: &std::path::Path, date: &str, mode: RescanMode) -> Engine {
        let mut engine = Engine::new();
        engine.set_working_dir(dir);
        engine.set_run_context(RunContext::new(mode).with_run_date(date));
        engine
    }

    #[test]
    fn test_defaults() {
        let engine = Engine::new();
        assert_eq!(engine.parallel_workflows, 1);
        assert_eq!(engine.parallel_targets, 3);
        assert!(engine.step_workers >= 1);
        assert_eq!(engine.run_context().rescan_mode, RescanMode::Smart);
        assert_eq!(engine.run_context().run_date.len(), 10);
    }

    #[test]
    fn test_setters_clamp_to_one() {
        let mut engine = Engine::new();
        engine.set_parallel_targets(0);
        engine.set_parallel_workflows(0);
        engine.set_step_workers(0);
        assert_eq!(engine.parallel_targets, 1);
        assert_eq!(engine.parallel_workflows, 1);
        assert_eq!(engine.step_workers, 1);
    }

    #[test]
    fn test_run_chains_outputs() {
        let temp_dir = tempdir().unwrap();
        let engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        let workflow = Workflow::from_steps(
            "web",
            vec![
                PipelineStep::new("probe", "echo {domain} > {outputFile}"),
                PipelineStep::new("upper", "tr a-z A-Z < probe.outputFile > {outputFile}"),
            ],
        );
        let targets = vec![Target::new("ex.com")];

        let summary = engine.run(&[workflow], &targets);

        assert_eq!(summary.run, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.warnings, 0);
        let upper = temp_dir.path().join("results-scan/ex.com/upper/scan-at-2024-01-01");
        assert_eq!(fs::read_to_string(upper).unwrap(), "EX.COM\n");

        let table = engine.status_table();
        assert_eq!(table.get("ex.com", "probe"), Some(StepStatus::Done));
        assert_eq!(table.get("ex.com", "upper"), Some(StepStatus::Done));
    }

    #[test]
    fn test_smart_mode_skips_existing_results() {
        let temp_dir = tempdir().unwrap();
        let existing = temp_dir.path().join("results-scan/ex.com/recon");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("scan-at-2023-12-31"), "old").unwrap();

        let marker = temp_dir.path().join("ran");
        let engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        let workflow = Workflow::from_steps(
            "recon",
            vec![PipelineStep::new("recon", format!("touch {}", marker.display()))],
        );

        let summary = engine.run(&[workflow], &[Target::new("ex.com")]);

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.run, 0);
        assert!(!marker.exists());
        assert_eq!(
            engine.status_table().get("ex.com", "recon"),
            Some(StepStatus::Skipped)
        );
    }

    #[test]
    fn test_second_run_skips_everything() {
        let temp_dir = tempdir().unwrap();
        let workflow =
            Workflow::from_steps("one", vec![PipelineStep::new("a", "echo x > {outputFile}")]);
        let targets = vec![Target::new("ex.com"), Target::new("10.0.0.0/24")];

        let first = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart)
            .run(&[workflow.clone()], &targets);
        assert_eq!(first.run, 2);
        assert!(temp_dir
            .path()
            .join("results-scan/10.0.0.0-24/a/scan-at-2024-01-01")
            .exists());

        let second = engine_in(temp_dir.path(), "2024-01-02", RescanMode::Smart)
            .run(&[workflow.clone()], &targets);
        assert_eq!(second.skipped, 2);

        let forced = engine_in(temp_dir.path(), "2024-01-02", RescanMode::ForceAll)
            .run(&[workflow], &targets);
        assert_eq!(forced.run, 2);
    }

    #[test]
    fn test_failing_step_does_not_stop_pipeline() {
        let temp_dir = tempdir().unwrap();
        let engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        let workflow = Workflow::from_steps(
            "w",
            vec![
                PipelineStep::new("broken", "exit 2"),
                PipelineStep::new("after", "echo ok > {outputFile}"),
            ],
        );

        let summary = engine.run(&[workflow], &[Target::new("ex.com")]);

        assert_eq!(summary.run, 2);
        assert_eq!(summary.failed, 1);
        let entry = engine.status_table().entry("ex.com", "broken").unwrap();
        assert_eq!(entry.status, StepStatus::Done);
        assert!(entry.failed());
        assert!(temp_dir
            .path()
            .join("results-scan/ex.com/after/scan-at-2024-01-01")
            .exists());
    }

    #[test]
    fn test_unresolved_reference_counts_warning() {
        let temp_dir = tempdir().unwrap();
        let engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        let workflow = Workflow::from_steps(
            "w",
            vec![PipelineStep::new("use", "echo missing.outputFile > {outputFile}")],
        );

        let summary = engine.run(&[workflow], &[Target::new("ex.com")]);

        assert_eq!(summary.warnings, 1);
        let out = temp_dir.path().join("results-scan/ex.com/use/scan-at-2024-01-01");
        assert_eq!(fs::read_to_string(out).unwrap(), "missing.outputFile\n");
    }

    #[test]
    fn test_concurrent_group_with_categories() {
        let temp_dir = tempdir().unwrap();
        let mut engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        engine.set_step_workers(2);
        let workflow = Workflow::from_steps(
            "w",
            vec![
                PipelineStep::new("a", "echo a > {outputFile}").with_category("c1"),
                PipelineStep::new("b", "echo b > {outputFile}").with_category("c1"),
                PipelineStep::new("merge", "cat a.outputFile b.outputFile > {outputFile}"),
            ],
        );

        let summary = engine.run(&[workflow], &[Target::new("ex.com")]);

        assert_eq!(summary.run, 3);
        let merged = temp_dir.path().join("results-scan/ex.com/merge/scan-at-2024-01-01");
        assert_eq!(fs::read_to_string(merged).unwrap(), "a\nb\n");
        assert!(temp_dir
            .path()
            .join("results-scan/ex.com/c1/a/scan-at-2024-01-01")
            .exists());
    }

    #[test]
    fn test_force_selected_reruns_from_selection() {
        let temp_dir = tempdir().unwrap();
        let workflow = Workflow::from_steps(
            "w",
            vec![
                PipelineStep::new("a", "echo a > {outputFile}"),
                PipelineStep::new("b", "echo b > {outputFile}"),
                PipelineStep::new("c", "echo c > {outputFile}"),
            ],
        );
        let targets = vec![Target::new("ex.com")];

        engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart)
            .run(&[workflow.clone()], &targets);

        let engine = engine_in(temp_dir.path(), "2024-01-02", RescanMode::force_selected(["b"]));
        let summary = engine.run(&[workflow], &targets);

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.run, 2);
        let table = engine.status_table();
        assert_eq!(table.get("ex.com", "a"), Some(StepStatus::Skipped));
        assert_eq!(table.get("ex.com", "c"), Some(StepStatus::Done));
    }

    /// What a status poller saw while two slow same-category steps ran.
    struct Observed {
        elapsed: Duration,
        saw_running: bool,
        saw_both_running: bool,
    }

    fn run_slow_pair(step_workers: usize) -> Observed {
        let temp_dir = tempdir().unwrap();
        let mut engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        engine.set_step_workers(step_workers);
        let workflow = Workflow::from_steps(
            "w",
            vec![
                PipelineStep::new("a", "sleep 0.6; echo a > {outputFile}").with_category("slow"),
                PipelineStep::new("b", "sleep 0.6; echo b > {outputFile}").with_category("slow"),
            ],
        );

        let table = engine.status_table();
        let finished = AtomicBool::new(false);
        let saw_running = AtomicBool::new(false);
        let saw_both_running = AtomicBool::new(false);
        let start = Instant::now();

        let summary = thread::scope(|scope| {
            scope.spawn(|| {
                while !finished.load(Ordering::SeqCst) {
                    let a = table.get("ex.com", "a") == Some(StepStatus::Running);
                    let b = table.get("ex.com", "b") == Some(StepStatus::Running);
                    if a || b {
                        saw_running.store(true, Ordering::SeqCst);
                    }
                    if a && b {
                        saw_both_running.store(true, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(10));
                }
            });

            let summary = engine.run(&[workflow], &[Target::new("ex.com")]);
            finished.store(true, Ordering::SeqCst);
            summary
        });

        assert_eq!(summary.run, 2);
        assert_eq!(summary.failed, 0);
        Observed {
            elapsed: start.elapsed(),
            saw_running: saw_running.load(Ordering::SeqCst),
            saw_both_running: saw_both_running.load(Ordering::SeqCst),
        }
    }

    #[test]
    fn test_concurrent_group_steps_overlap() {
        let observed = run_slow_pair(2);

        assert!(observed.saw_running);
        assert!(observed.saw_both_running);
        assert!(
            observed.elapsed < Duration::from_millis(1100),
            "steps did not overlap: {:?}",
            observed.elapsed
        );
    }

    #[test]
    fn test_single_step_worker_serialises_group() {
        let observed = run_slow_pair(1);

        assert!(observed.saw_running);
        assert!(!observed.saw_both_running);
        assert!(observed.elapsed >= Duration::from_millis(1200));
    }

    #[test]
    fn test_ticker_stops_when_work_panics() {
        let engine = Engine::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: () = engine.with_ticker(|| panic!("target job failed"));
        }));

        assert!(result.is_err());
    }

    struct CountingRenderer(AtomicUsize);

    impl ProgressRenderer for CountingRenderer {
        fn render(&self, _snapshot: &crate::execution::status::StatusSnapshot) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_renderer_called_at_least_at_end() {
        let temp_dir = tempdir().unwrap();
        let mut engine = engine_in(temp_dir.path(), "2024-01-01", RescanMode::Smart);
        let renderer = Arc::new(CountingRenderer(AtomicUsize::new(0)));
        engine.set_renderer(renderer.clone());
        engine.set_parallel_workflows(2);

        let workflows = vec![
            Workflow::from_steps("w1", vec![PipelineStep::new("x", "true")]),
            Workflow::from_steps("w2", vec![PipelineStep::new("y", "true")]),
        ];
        engine.run(&workflows, &[Target::new("ex.com")]);

        assert!(renderer.0.load(Ordering::SeqCst) >= 2);
    }
}

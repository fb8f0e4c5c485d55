//! scanflow CLI Entry Point
//!
//! Provides the command-line interface for running scan workflows.
//!
//! # Usage
//!
//! ```bash
//! # Run every workflow in scans-wf/ against the targets
//! scanflow -t targets.txt
//!
//! # Run selected workflows, five targets at a time
//! scanflow -t targets.txt -w subdomains,web --parallel-targets 5
//!
//! # Re-run one step and everything after it
//! scanflow -t targets.txt -w web --rescan-steps httpx
//!
//! # List workflows, or show the most recent results
//! scanflow --show-names
//! scanflow --check-results latest
//! ```

use std::env;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use colored::Colorize;
use log::{debug, error, info, warn};

use scanflow::execution::{
    Engine, RescanMode, RunContext, DEFAULT_PARALLEL_TARGETS, DEFAULT_PARALLEL_WORKFLOWS,
    DEFAULT_STEP_WORKERS,
};
use scanflow::monitoring::TableRenderer;
use scanflow::results::{latest_scan_date, results_for_date, ResultsLayout, DEFAULT_RESULTS_DIR};
use scanflow::workflow::{
    list_workflows, load_targets, load_workflows_by_names, load_workflows_dir,
    DEFAULT_WORKFLOWS_DIR,
};
use scanflow::{ScanError, APP_NAME, VERSION};

/// Lines of each artifact shown by `--check-results`.
const PREVIEW_LINES: usize = 5;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    targets_path: Option<PathBuf>,
    workflow_names: Vec<String>,
    workflows_dir: PathBuf,
    results_dir: PathBuf,
    working_dir: Option<PathBuf>,
    parallel_targets: usize,
    parallel_workflows: usize,
    step_workers: usize,
    rescan_all: bool,
    rescan_steps: Vec<String>,
    run_date: Option<String>,
    status_json: Option<PathBuf>,
    show_names: bool,
    check_results: Option<String>,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets_path: None,
            workflow_names: Vec::new(),
            workflows_dir: PathBuf::from(DEFAULT_WORKFLOWS_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            working_dir: None,
            parallel_targets: DEFAULT_PARALLEL_TARGETS,
            parallel_workflows: DEFAULT_PARALLEL_WORKFLOWS,
            step_workers: *DEFAULT_STEP_WORKERS,
            rescan_all: false,
            rescan_steps: Vec::new(),
            run_date: None,
            status_json: None,
            show_names: false,
            check_results: None,
            verbose: false,
        }
    }
}

impl Config {
    fn rescan_mode(&self) -> RescanMode {
        if self.rescan_all {
            RescanMode::ForceAll
        } else {
            RescanMode::force_selected(&self.rescan_steps)
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Workflow-driven scan runner");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: scanflow [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -t, --targets FILE           Targets file, one domain or CIDR per line");
    println!("  -w, --workflow NAMES         Workflow name(s), comma-separated (default: all)");
    println!(
        "  --workflows-dir DIR          Workflow directory (default: {})",
        DEFAULT_WORKFLOWS_DIR
    );
    println!("  --results-dir DIR            Results directory (default: {})", DEFAULT_RESULTS_DIR);
    println!("  --working-dir DIR            Directory to run in");
    println!(
        "  -pt, --parallel-targets N    Targets scanned at once (default: {})",
        DEFAULT_PARALLEL_TARGETS
    );
    println!(
        "  -pw, --parallel-workflows N  Workflows run at once (default: {})",
        DEFAULT_PARALLEL_WORKFLOWS
    );
    println!("  --step-workers N             Steps of a group run at once (default: CPU count)");
    println!("  -rs, --rescan                Re-run every step, ignoring existing results");
    println!("  --rescan-steps NAMES         Re-run the named steps, comma-separated");
    println!("  --date YYYY-MM-DD            Date stamped into output names (default: today)");
    println!("  --status-json FILE           Write the final status table as JSON");
    println!("  -sn, --show-names            List available workflows");
    println!("  --check-results [DATE]       Show results for DATE or 'latest' (default)");
    println!("  --verbose                    Enable debug logging");
    println!("  --help                       Show this help message");
    println!("  --version                    Show version information");
    println!();
    println!("Examples:");
    println!("  scanflow -t targets.txt");
    println!("  scanflow -t targets.txt -w subdomains,web -pt 5");
    println!("  scanflow -t targets.txt -w web --rescan-steps httpx");
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", flag))
}

fn parse_count(value: &str, flag: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Invalid {} value: {}", flag, value)),
    }
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = args[i].as_str();

        match arg {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "-t" | "--targets" => {
                config.targets_path = Some(PathBuf::from(next_value(args, &mut i, arg)?));
            }
            "-w" | "-wf" | "--workflow" => {
                config.workflow_names = split_list(next_value(args, &mut i, arg)?);
            }
            "--workflows-dir" => {
                config.workflows_dir = PathBuf::from(next_value(args, &mut i, arg)?);
            }
            "--results-dir" => {
                config.results_dir = PathBuf::from(next_value(args, &mut i, arg)?);
            }
            "--working-dir" => {
                config.working_dir = Some(PathBuf::from(next_value(args, &mut i, arg)?));
            }
            "-pt" | "--parallel-targets" => {
                config.parallel_targets = parse_count(next_value(args, &mut i, arg)?, arg)?;
            }
            "-pw" | "--parallel-workflows" => {
                config.parallel_workflows = parse_count(next_value(args, &mut i, arg)?, arg)?;
            }
            "--step-workers" => {
                config.step_workers = parse_count(next_value(args, &mut i, arg)?, arg)?;
            }
            "-rs" | "--rescan" => {
                config.rescan_all = true;
            }
            "--rescan-steps" => {
                config.rescan_steps = split_list(next_value(args, &mut i, arg)?);
            }
            "--date" => {
                config.run_date = Some(next_value(args, &mut i, arg)?.to_string());
            }
            "--status-json" => {
                config.status_json = Some(PathBuf::from(next_value(args, &mut i, arg)?));
            }
            "-sn" | "--show-names" => {
                config.show_names = true;
            }
            "-ccr" | "--check-results" => {
                let value = match args.get(i + 1) {
                    Some(next) if !next.starts_with('-') => {
                        i += 1;
                        next.clone()
                    }
                    _ => "latest".to_string(),
                };
                config.check_results = Some(value);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Checks a `YYYY-MM-DD` date string.
fn validate_date(date: &str) -> Result<NaiveDate, ScanError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ScanError::InvalidDate(date.to_string()))
}

/// Validates and enters the working directory.
fn setup_working_directory(
    working_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let Some(dir) = working_dir else {
        let current = env::current_dir()?;
        info!("Working directory: {}", current.display());
        return Ok(None);
    };

    if !dir.exists() {
        return Err(format!("Working directory does not exist: {}", dir.display()).into());
    }

    if !dir.is_dir() {
        return Err(format!("Path is not a directory: {}", dir.display()).into());
    }

    let dir = dir.canonicalize()?;
    env::set_current_dir(&dir)?;
    info!("Working directory: {}", dir.display());

    Ok(Some(dir))
}

/// Prints the workflows found in the workflow directory.
fn show_workflow_names(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workflows = list_workflows(dir)?;
    if workflows.is_empty() {
        return Err(ScanError::NoWorkflows {
            dir: dir.to_path_buf(),
        }
        .into());
    }

    println!("{}", "Available Workflows:".bold());
    println!("{}", "=".repeat(60));
    for (i, workflow) in workflows.iter().enumerate() {
        println!("{:2}. {}", i + 1, workflow.name.cyan().bold());
        println!("    File: {}", workflow.file.display());
        println!(
            "    Description: {}",
            workflow.description.as_deref().unwrap_or("No description")
        );
        println!("    Steps: {}", workflow.steps);
        for problem in &workflow.problems {
            println!("    {} {}", "Problem:".yellow(), problem);
        }
        println!();
    }

    println!("Usage:");
    println!("  scanflow -w workflow-name -t targets.txt");
    println!("  scanflow -w workflow1,workflow2 -t targets.txt");
    println!("  scanflow -t targets.txt  (runs all workflows)");
    Ok(())
}

/// Prints the artifacts produced on a date, or on the most recent date.
fn check_results(results_dir: &Path, which: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !results_dir.is_dir() {
        return Err(format!("No results directory found at {}", results_dir.display()).into());
    }

    let layout = ResultsLayout::new(results_dir);
    let date = if which == "latest" {
        match latest_scan_date(&layout) {
            Some(date) => date,
            None => {
                println!("No scan results found in {}", results_dir.display());
                return Ok(());
            }
        }
    } else {
        validate_date(which)?
    };

    println!();
    println!("{} {}", "Scan Results for Date:".bold(), date);
    println!("{}", "=".repeat(60));

    let files = results_for_date(&layout, date);
    if files.is_empty() {
        println!("No scan results found for date: {}", date);
        return Ok(());
    }

    let mut current_target: Option<&str> = None;
    for file in &files {
        if current_target != Some(file.target.as_str()) {
            println!();
            println!("{} {}", "Target:".cyan(), file.target);
            println!("{}", "-".repeat(40));
            current_target = Some(file.target.as_str());
        }

        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {}/", file.location.display());
        println!("      {} ({})", name, file.human_size());
        print_preview(&file.path);
        println!();
    }

    println!("{} {} result files for {}", "Found".green(), files.len(), date);
    Ok(())
}

fn print_preview(path: &Path) {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return;
        }
    };

    let mut lines = BufReader::new(file).lines().map_while(|line| line.ok());
    let preview: Vec<String> = lines.by_ref().take(PREVIEW_LINES).collect();
    if preview.is_empty() {
        return;
    }

    println!("      Content preview:");
    for line in &preview {
        println!("         {}", line);
    }
    if lines.next().is_some() {
        println!("         ... (more content)");
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    if let Some(date) = &config.run_date {
        validate_date(date)?;
    }

    setup_working_directory(config.working_dir.clone())?;

    if config.show_names {
        return show_workflow_names(&config.workflows_dir);
    }

    if let Some(which) = &config.check_results {
        return check_results(&config.results_dir, which);
    }

    let Some(targets_path) = &config.targets_path else {
        return Err(
            "Targets file (-t) is required for scanning. Use --show-names to list workflows."
                .into(),
        );
    };

    print_banner();

    // Load inputs
    let targets = load_targets(targets_path)?;

    let workflows = if config.workflow_names.is_empty() {
        load_workflows_dir(&config.workflows_dir)?
    } else {
        load_workflows_by_names(&config.workflows_dir, &config.workflow_names)?
    };
    for workflow in &workflows {
        info!("Workflow loaded: {} ({} steps)", workflow.name, workflow.len());
    }

    // Create and configure engine
    let mut context = RunContext::new(config.rescan_mode());
    if let Some(date) = &config.run_date {
        context = context.with_run_date(date.clone());
    }

    let mut engine = Engine::new();
    engine.set_parallel_targets(config.parallel_targets);
    engine.set_parallel_workflows(config.parallel_workflows);
    engine.set_step_workers(config.step_workers);
    engine.set_results_root(&config.results_dir);
    engine.set_run_context(context);
    engine.set_renderer(Arc::new(TableRenderer::new(&workflows, &targets)));

    // Execute workflows
    let summary = engine.run(&workflows, &targets);

    let snapshot = engine.status_table().snapshot();
    let counts = snapshot.counts();
    debug!(
        "Final status table: {} done, {} skipped, {} waiting",
        counts.done, counts.skipped, counts.waiting
    );

    if let Some(path) = &config.status_json {
        let json = snapshot.to_json()?;
        fs::write(path, json)?;
        info!("Status written to {}", path.display());
    }

    println!();
    println!(
        "{} {} run, {} skipped, {} failed",
        "Scan complete:".green().bold(),
        summary.run,
        summary.skipped,
        summary.failed
    );
    if summary.failed > 0 {
        error!("{} step(s) exited with an error; see the log above", summary.failed);
    }
    if summary.warnings > 0 {
        warn!("{} placeholder(s) could not be resolved", summary.warnings);
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

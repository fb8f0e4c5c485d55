//! Command Resolution
//!
//! Expands a step's command template into the command line that is executed.
//! References to other steps are satisfied from the current target's
//! resolved-path cache first and from earlier results on disk second. A
//! reference that cannot be satisfied is left in place and reported; the
//! command still runs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::results::ResultHistory;
use crate::workflow::template::{parse_template, Token};
use crate::workflow::Target;

/// Output paths of the steps already reached in one target's run.
///
/// One cache exists per (workflow, target) execution. Entries are written
/// once; later writes for the same step are ignored.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPathCache {
    paths: HashMap<String, PathBuf>,
}

impl ResolvedPathCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step's output path. Returns false if the step was already
    /// recorded, in which case the first path is kept.
    pub fn record(&mut self, step: &str, path: PathBuf) -> bool {
        if self.paths.contains_key(step) {
            debug!("Path for '{}' already resolved, keeping first value", step);
            return false;
        }
        self.paths.insert(step.to_string(), path);
        true
    }

    /// Returns a step's recorded output path.
    pub fn get(&self, step: &str) -> Option<&Path> {
        self.paths.get(step).map(PathBuf::as_path)
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A placeholder that could not be filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Step whose command contains the placeholder
    pub step: String,
    /// Step the placeholder refers to
    pub reference: String,
    /// Whether the wildcard form was used
    pub wildcard: bool,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reference '{}.outputFile{}' in step '{}' not found",
            self.reference,
            if self.wildcard { "*" } else { "" },
            self.step
        )
    }
}

/// Everything needed to resolve one step's command for one target.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Target being scanned
    pub target: &'a Target,
    /// This step's own output path
    pub own_output: &'a Path,
    /// Paths resolved so far for this target
    pub cache: &'a ResolvedPathCache,
    /// Lookup of earlier results
    pub history: &'a ResultHistory,
    /// Date of the current run
    pub run_date: &'a str,
}

/// A fully substituted command plus the references that stayed unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub command: String,
    pub warnings: Vec<UnresolvedReference>,
}

impl ResolvedCommand {
    /// Returns true if every placeholder was filled.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn path_text(path: &Path) -> String {
    path.display().to_string()
}

/// Resolves `template` for `step_name` in `context`.
///
/// Unresolved references are logged as warnings and the placeholder text is
/// kept verbatim.
pub fn resolve_command(
    step_name: &str,
    template: &str,
    context: &ResolveContext<'_>,
) -> ResolvedCommand {
    let mut command = String::with_capacity(template.len());
    let mut warnings = Vec::new();

    for token in parse_template(template) {
        let resolved = match &token {
            Token::Literal(text) => Some(text.clone()),
            Token::Domain => Some(context.target.raw().to_string()),
            Token::SelfOutput => Some(path_text(context.own_output)),
            Token::NamedOutput(name) => resolve_single(name, context),
            Token::NamedOutputWildcard(name) => resolve_wildcard(name, context),
        };

        match resolved {
            Some(text) => command.push_str(&text),
            None => {
                let unresolved = UnresolvedReference {
                    step: step_name.to_string(),
                    reference: token.referenced_step().unwrap_or_default().to_string(),
                    wildcard: matches!(token, Token::NamedOutputWildcard(_)),
                };
                warn!(
                    "Warning: {} for target {}. Command might be invalid.",
                    unresolved,
                    context.target.canonical()
                );
                warnings.push(unresolved);
                command.push_str(&token.to_template());
            }
        }
    }

    ResolvedCommand { command, warnings }
}

fn resolve_single(name: &str, context: &ResolveContext<'_>) -> Option<String> {
    if let Some(path) = context.cache.get(name) {
        return Some(path_text(path));
    }

    context
        .history
        .latest_artifact(context.target, name, context.run_date)
        .map(|path| path_text(&path))
}

fn resolve_wildcard(name: &str, context: &ResolveContext<'_>) -> Option<String> {
    let artifacts = context.history.artifacts(context.target, name);
    if !artifacts.is_empty() {
        let joined: Vec<String> = artifacts.iter().map(|p| path_text(p)).collect();
        return Some(joined.join(" "));
    }

    context.cache.get(name).map(path_text)
}

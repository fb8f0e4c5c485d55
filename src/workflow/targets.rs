//! Scan Targets
//!
//! A target is a domain name or a CIDR range exactly as the user wrote it.
//! Its canonical form replaces path separators so it can name a directory.

use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// A domain or network range to scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    raw: String,
    canonical: String,
}

impl Target {
    /// Creates a target from user input. Surrounding whitespace is trimmed.
    ///
    /// ```
    /// use scanflow::workflow::Target;
    ///
    /// let target = Target::new("10.0.0.0/24");
    /// assert_eq!(target.canonical(), "10.0.0.0-24");
    /// assert_eq!(target.raw(), "10.0.0.0/24");
    /// ```
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let canonical = raw.replace(['/', '\\'], "-");
        Self { raw, canonical }
    }

    /// The target as given, substituted for `{domain}`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The filesystem-safe form used in result paths and status keys.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parses newline-delimited targets, skipping blank lines and `#` comments.
pub fn parse_targets(content: &str) -> Vec<Target> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Target::new)
        .collect()
}

/// Reads the target list from a file.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ScanError::TargetsRead {
        path: path.to_path_buf(),
        source,
    })?;

    let targets = parse_targets(&content);
    if targets.is_empty() {
        return Err(ScanError::NoTargets {
            path: path.to_path_buf(),
        });
    }

    info!("Loaded {} targets from {}", targets.len(), path.display());
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_domain_canonical_is_unchanged() {
        let target = Target::new("example.com");
        assert_eq!(target.canonical(), "example.com");
    }

    #[test]
    fn test_cidr_canonical_replaces_slash() {
        let target = Target::new(" 192.168.1.0/24 ");
        assert_eq!(target.raw(), "192.168.1.0/24");
        assert_eq!(target.canonical(), "192.168.1.0-24");
    }

    #[test]
    fn test_parse_targets_skips_blank_and_comments() {
        let targets = parse_targets("example.com\n\n# staging\n  10.0.0.0/8  \n");
        let raw: Vec<&str> = targets.iter().map(|t| t.raw()).collect();
        assert_eq!(raw, vec!["example.com", "10.0.0.0/8"]);
    }

    #[test]
    fn test_load_targets_missing_file() {
        assert!(matches!(
            load_targets("/nonexistent/targets.txt"),
            Err(ScanError::TargetsRead { .. })
        ));
    }

    #[test]
    fn test_load_targets_empty_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("targets.txt");
        fs::write(&path, "\n# nothing\n").unwrap();

        assert!(matches!(load_targets(&path), Err(ScanError::NoTargets { .. })));
    }

    #[test]
    fn test_load_targets() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("targets.txt");
        fs::write(&path, "a.com\nb.com\n").unwrap();

        assert_eq!(load_targets(&path).unwrap().len(), 2);
    }
}

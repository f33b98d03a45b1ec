//! Grading file discovery.
//!
//! Grading inputs may be given as files or as directories; a directory
//! stands for every `*.egf` file below it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of grading files.
pub const GRADING_EXTENSION: &str = "egf";

/// Configuration for directory scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extensions to pick up inside directories (without dot).
    pub extensions: Vec<String>,
    /// Maximum directory depth below each given directory.
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec![GRADING_EXTENSION.to_string()],
            max_depth: 8,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            max_depth: config.max_depth,
        }
    }
}

/// Expands grading input arguments into an ordered list of files.
pub struct InputScanner {
    config: ScanConfig,
}

impl InputScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Expand the given paths, preserving argument order.
    ///
    /// Files are kept as given, whatever their extension. Directories are
    /// replaced by their matching files in sorted path order. A path listed
    /// twice is kept once, at its first position.
    pub fn expand(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let found = self.scan_dir(input)?;
                if found.is_empty() {
                    warn!("No grading files found in {}", input.display());
                }
                for file in found {
                    push_unique(&mut files, file);
                }
            } else {
                push_unique(&mut files, input.clone());
            }
        }

        debug!("Grading inputs: {:?}", files);
        Ok(files)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
        {
            return false;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted.eq_ignore_ascii_case(ext))
    }

    fn scan_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        for entry in WalkDir::new(dir)
            .max_depth(self.config.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        {
            let entry =
                entry.with_context(|| format!("Failed to scan directory: {}", dir.display()))?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                found.push(entry.into_path());
            }
        }

        Ok(found)
    }
}

impl Default for InputScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expand_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        fs::create_dir_all(runs.join("nested")).unwrap();
        fs::create_dir_all(runs.join(".hidden")).unwrap();
        fs::write(runs.join("b.egf"), b"").unwrap();
        fs::write(runs.join("a.egf"), b"").unwrap();
        fs::write(runs.join("notes.txt"), b"").unwrap();
        fs::write(runs.join("nested").join("c.EGF"), b"").unwrap();
        fs::write(runs.join(".hidden").join("d.egf"), b"").unwrap();

        let files = InputScanner::default().expand(&[runs.clone()]).unwrap();
        assert_eq!(
            files,
            vec![
                runs.join("a.egf"),
                runs.join("b.egf"),
                runs.join("nested").join("c.EGF"),
            ]
        );
    }

    #[test]
    fn test_expand_keeps_argument_order_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("z.egf");
        let second = dir.path().join("a.egf");
        fs::write(&first, b"").unwrap();
        fs::write(&second, b"").unwrap();

        let files = InputScanner::default()
            .expand(&[first.clone(), second.clone(), first.clone()])
            .unwrap();
        assert_eq!(files, vec![first, second]);
    }

    #[test]
    fn test_matches() {
        let scanner = InputScanner::default();
        assert!(scanner.matches(Path::new("run.egf")));
        assert!(!scanner.matches(Path::new("data.edf")));
        assert!(!scanner.matches(Path::new(".run.egf")));
    }
}

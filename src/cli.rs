//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Largest accepted `--histogram-buckets`.
pub const MAX_HISTOGRAM_BUCKETS: usize = 100;

/// edexia-report - grading comparison reports for essay scoring runs
///
/// Joins an Edexia Dataset File (EDF) with one or more Edexia Grading
/// Files (EGF) and writes a self-contained HTML report.
///
/// Examples:
///   edexia-report --edf essays.edf --egf run.egf
///   edexia-report --edf essays.edf --egf baseline.egf tuned.egf -o compare.html
///   edexia-report --edf essays.edf --egf runs/ --no-text
///   edexia-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset file (EDF) holding the submissions
    #[arg(long, value_name = "FILE", required_unless_present = "init_config")]
    pub edf: Option<PathBuf>,

    /// Grading files (EGF) or directories containing them
    ///
    /// Directories are searched recursively for *.egf files.
    /// Order is preserved and determines column order in the report.
    #[arg(
        long,
        value_name = "PATH",
        num_args = 1..,
        required_unless_present = "init_config"
    )]
    pub egf: Vec<PathBuf>,

    /// Output file path for the HTML report
    ///
    /// Defaults to <egf-stem>_report.html for one grading file and
    /// <edf-stem>_comparison_report.html for several.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .edexia-report.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report title
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Length of submission excerpts, in characters
    #[arg(long, value_name = "N")]
    pub excerpt_chars: Option<usize>,

    /// Histogram buckets for continuous score scales (1-100)
    #[arg(long, value_name = "N")]
    pub histogram_buckets: Option<usize>,

    /// Leave submission text out of the report
    #[arg(long)]
    pub no_text: bool,

    /// Fixed "generated at" time, in seconds since the Unix epoch
    ///
    /// Makes repeated runs over the same inputs byte-identical.
    #[arg(long, value_name = "SECONDS", env = "SOURCE_DATE_EPOCH")]
    pub source_date_epoch: Option<i64>,

    /// Enable verbose logging output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .edexia-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.edf {
            Some(ref edf) if !edf.exists() => {
                return Err(format!("Dataset file does not exist: {}", edf.display()));
            }
            Some(ref edf) if !edf.is_file() => {
                return Err(format!("Dataset path is not a file: {}", edf.display()));
            }
            Some(_) => {}
            None => return Err("--edf is required".to_string()),
        }

        if self.egf.is_empty() {
            return Err("At least one --egf is required".to_string());
        }
        for path in &self.egf {
            if !path.exists() {
                return Err(format!("Grading path does not exist: {}", path.display()));
            }
        }

        if let Some(buckets) = self.histogram_buckets {
            if !(1..=MAX_HISTOGRAM_BUCKETS).contains(&buckets) {
                return Err(format!(
                    "Histogram buckets must be between 1 and {}",
                    MAX_HISTOGRAM_BUCKETS
                ));
            }
        }

        if self.excerpt_chars == Some(0) {
            return Err("Excerpt length must be at least 1 character".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref output) = self.output {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    return Err(format!(
                        "Output directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The report timestamp: `--source-date-epoch` when given, else now.
    pub fn generated_at(&self) -> Result<DateTime<Utc>, String> {
        match self.source_date_epoch {
            Some(seconds) => Utc
                .timestamp_opt(seconds, 0)
                .single()
                .ok_or_else(|| format!("Invalid SOURCE_DATE_EPOCH: {}", seconds)),
            None => Ok(Utc::now()),
        }
    }
}

/// Default report path for the given inputs, in the current directory.
pub fn default_output(edf: &Path, egfs: &[PathBuf]) -> PathBuf {
    match egfs {
        [single] => PathBuf::from(format!("{}_report.html", stem(single))),
        _ => PathBuf::from(format!("{}_comparison_report.html", stem(edf))),
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "edexia".to_string())
}

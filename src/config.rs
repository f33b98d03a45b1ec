//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.edexia-report.toml` files.

use crate::analysis::AggregateOptions;
use crate::cli::MAX_HISTOGRAM_BUCKETS;
use crate::report::generator::{DEFAULT_EXCERPT_CHARS, DEFAULT_TITLE};
use crate::report::ReportOptions;
use crate::scanner::GRADING_EXTENSION;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".edexia-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Grading directory scanning.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path; derived from the inputs when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Settings for expanding grading directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions picked up inside directories.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Maximum directory depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![GRADING_EXTENSION.to_string()]
}

fn default_max_depth() -> usize {
    8
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Document title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Submission excerpt length in characters.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Include submission text excerpts.
    #[serde(default = "default_true")]
    pub include_text: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            excerpt_chars: default_excerpt_chars(),
            include_text: true,
        }
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_excerpt_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

fn default_true() -> bool {
    true
}

/// Statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Histogram buckets for continuous scales.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: usize,

    /// Largest score difference counted as exact agreement.
    #[serde(default)]
    pub exact_tolerance: f64,

    /// Largest score difference counted as adjacent agreement.
    /// Derived from each scale when unset.
    #[serde(default)]
    pub adjacent_tolerance: Option<f64>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            histogram_buckets: default_histogram_buckets(),
            exact_tolerance: 0.0,
            adjacent_tolerance: None,
        }
    }
}

fn default_histogram_buckets() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.to_string_lossy().to_string());
        }

        if let Some(ref title) = args.title {
            self.report.title = title.clone();
        }
        if let Some(chars) = args.excerpt_chars {
            self.report.excerpt_chars = chars;
        }
        if args.no_text {
            self.report.include_text = false;
        }

        if let Some(buckets) = args.histogram_buckets {
            self.aggregate.histogram_buckets = buckets;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.quiet {
            self.general.verbose = false;
        }
    }

    /// Check values that can only come from the file.
    pub fn validate(&self) -> Result<(), String> {
        let buckets = self.aggregate.histogram_buckets;
        if !(1..=MAX_HISTOGRAM_BUCKETS).contains(&buckets) {
            return Err(format!(
                "histogram_buckets must be between 1 and {}, got {}",
                MAX_HISTOGRAM_BUCKETS, buckets
            ));
        }
        if self.report.excerpt_chars == 0 {
            return Err("excerpt_chars must be at least 1".to_string());
        }
        let exact = self.aggregate.exact_tolerance;
        if exact.is_nan() || exact < 0.0 {
            return Err("exact_tolerance must be a non-negative number".to_string());
        }
        if let Some(adjacent) = self.aggregate.adjacent_tolerance {
            if adjacent.is_nan() || adjacent < exact {
                return Err("adjacent_tolerance must not be below exact_tolerance".to_string());
            }
        }
        if self.scanner.extensions.is_empty() {
            return Err("scanner.extensions must not be empty".to_string());
        }
        Ok(())
    }

    /// Rendering options for the report generator.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            title: self.report.title.clone(),
            excerpt_chars: self.report.excerpt_chars,
            include_text: self.report.include_text,
        }
    }

    /// Statistics options for the aggregator.
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            histogram_buckets: self.aggregate.histogram_buckets,
            exact_tolerance: self.aggregate.exact_tolerance,
            adjacent_tolerance: self.aggregate.adjacent_tolerance,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, None);
        assert_eq!(config.report.title, "Edexia Grading Report");
        assert_eq!(config.report.excerpt_chars, 280);
        assert!(config.report.include_text);
        assert_eq!(config.aggregate.histogram_buckets, 10);
        assert_eq!(config.scanner.extensions, vec!["egf"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "weekly.html"
verbose = true

[report]
title = "Week 3 essays"
include_text = false

[aggregate]
histogram_buckets = 20
adjacent_tolerance = 0.5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("weekly.html"));
        assert!(config.general.verbose);
        assert_eq!(config.report.title, "Week 3 essays");
        assert_eq!(config.report.excerpt_chars, 280);
        assert!(!config.report.include_text);
        assert_eq!(config.aggregate.histogram_buckets, 20);
        assert_eq!(config.aggregate.adjacent_tolerance, Some(0.5));
        assert_eq!(config.aggregate.exact_tolerance, 0.0);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config: Config = toml::from_str(
            r#"
[report]
title = "From file"
excerpt_chars = 100

[aggregate]
histogram_buckets = 5
"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "edexia-report",
            "--edf",
            "e.edf",
            "--egf",
            "a.egf",
            "--title",
            "From flag",
            "--no-text",
            "-o",
            "out.html",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.report.title, "From flag");
        assert_eq!(config.report.excerpt_chars, 100);
        assert!(!config.report.include_text);
        assert_eq!(config.aggregate.histogram_buckets, 5);
        assert_eq!(config.general.output.as_deref(), Some("out.html"));

        let options = config.report_options();
        assert_eq!(options.title, "From flag");
        assert!(!options.include_text);
        assert_eq!(config.aggregate_options().histogram_buckets, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.aggregate.histogram_buckets = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aggregate.exact_tolerance = 1.0;
        config.aggregate.adjacent_tolerance = Some(0.5);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aggregate.exact_tolerance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("[aggregate]"));

        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.report.title, DEFAULT_TITLE);
    }
}

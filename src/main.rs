//! edexia-report - grading comparison reports
//!
//! A CLI tool that joins an Edexia Dataset File (EDF) with one or more
//! Edexia Grading Files (EGF), computes score statistics and agreement
//! metrics, and writes a self-contained HTML report.
//!
//! Exit codes:
//!   0 - Success (including the placeholder report for an empty dataset)
//!   1 - Runtime error (I/O, invalid arguments, config, etc.)
//!   3 - Corrupt input file
//!   4 - Invalid input format
//!   5 - Unsupported format version
//!   6 - Grading sets use different score scales
//!   7 - Report rendering failed

mod analysis;
mod cli;
mod config;
mod error;
mod formats;
mod models;
mod pipeline;
mod reconcile;
mod report;
mod scanner;

use anyhow::{anyhow, bail, Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use error::{EXIT_RUNTIME, EXIT_SUCCESS};
use pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
use scanner::{InputScanner, ScanConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_RUNTIME);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The file may ask for verbose logging, so it is read before the
    // subscriber exists and reported afterwards.
    let (config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(EXIT_RUNTIME);
        }
    };

    init_logging(&args, &config);

    info!("edexia-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Unreadable(reason) => {
            warn!("Failed to load config: {}; using defaults", reason)
        }
    }

    // Run the report
    match run_report(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(EXIT_RUNTIME);
        }
    }
}

/// Handle --init-config: generate a default .edexia-report.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(EXIT_RUNTIME);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the title, excerpts, histogram buckets, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("⚠️  Logging unavailable: {}", e);
    }
}

/// Run the complete report workflow. Returns the process exit code.
async fn run_report(args: Args, mut config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.merge_with_args(&args);
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    let edf = args.edf.clone().context("--edf is required")?;
    let scanner = InputScanner::new(ScanConfig::from(&config.scanner));
    let egfs = scanner.expand(&args.egf)?;
    if egfs.is_empty() {
        bail!("No grading files found in the given paths");
    }

    let output = config
        .general
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| cli::default_output(&edf, &egfs));
    let generated_at = args.generated_at().map_err(|e| anyhow!(e))?;

    if !args.quiet {
        println!("📥 Dataset: {}", edf.display());
        println!("📊 Grading files: {}", egfs.len());
        for egf in &egfs {
            println!("   - {}", egf.display());
        }
        println!("\n🔬 Reading and comparing grades...");
    }

    let pipeline = Pipeline::new(PipelineConfig {
        edf,
        egfs,
        output,
        report: config.report_options(),
        aggregate: config.aggregate_options(),
        generated_at,
        show_progress: !args.quiet,
    });

    match pipeline.run().await {
        Ok(outcome) => {
            if !args.quiet {
                print_summary(&outcome, start_time.elapsed().as_secs_f64());
            }
            Ok(EXIT_SUCCESS)
        }
        Err(failure) => {
            error!("Pipeline failed: {}", failure);
            eprintln!("\n❌ {} failed:\n{}", failure.stage, failure.error);
            Ok(failure.exit_code())
        }
    }
}

/// Print the end-of-run summary.
fn print_summary(outcome: &PipelineOutcome, duration: f64) {
    println!("\n📊 Report Summary:");
    println!("   Submissions: {}", outcome.submissions);
    for set in &outcome.grading_sets {
        println!(
            "   - {}: {} graded | {} ungraded",
            set.label, set.graded, set.ungraded
        );
    }
    if !outcome.orphans.is_empty() {
        println!("   Orphan grades: {}", outcome.orphans.len());
    }
    if !outcome.warnings.is_empty() {
        println!("   ⚠️  Warnings: {}", outcome.warnings.len());
        for warning in &outcome.warnings {
            println!("      {}", warning);
        }
    }
    println!("   Duration: {:.1}s", duration);

    if outcome.minimal {
        println!(
            "\nℹ️  No submissions found. Placeholder report saved to: {}",
            outcome.output.display()
        );
    } else {
        println!(
            "\n✅ Report complete! Saved to: {}",
            outcome.output.display()
        );
    }
}

/// Where the configuration came from, for logging once tracing is up.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    Unreadable(String),
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(format!("{:#}", e)))),
    }
}

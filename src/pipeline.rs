//! Report pipeline orchestration.
//!
//! Runs the stages in order: read inputs, reconcile, aggregate, render. The
//! pipeline is the only component that aborts a run. Every stage transition
//! is logged and a failure records the stage it happened in.

use crate::analysis::{aggregate_all, AggregateOptions, ReferenceAgreement};
use crate::error::{PipelineError, RenderError};
use crate::formats::{read_dataset, read_grading_set};
use crate::models::{Dataset, GradingSet, Loaded};
use crate::reconcile::{reconcile, Orphan};
use crate::report::{
    extract_embedded_data, render_minimal, synthesize, write_atomic, ReportInput, ReportOptions,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ReadingInputs,
    Reconciling,
    Aggregating,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ReadingInputs => "reading inputs",
            Stage::Reconciling => "reconciling",
            Stage::Aggregating => "aggregating",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A failed run and the stage it failed in.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl PipelineFailure {
    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

/// Inputs and options for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dataset file.
    pub edf: PathBuf,
    /// Grading files in input order, directories already expanded.
    pub egfs: Vec<PathBuf>,
    /// Report destination.
    pub output: PathBuf,
    pub report: ReportOptions,
    pub aggregate: AggregateOptions,
    /// Timestamp shown in the report.
    pub generated_at: DateTime<Utc>,
    /// Show a progress bar while reading inputs.
    pub show_progress: bool,
}

/// Per-grading-set counts for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub label: String,
    pub graded: usize,
    pub ungraded: usize,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub output: PathBuf,
    pub submissions: usize,
    pub grading_sets: Vec<SetOutcome>,
    pub orphans: Vec<Orphan>,
    pub warnings: Vec<String>,
    /// The "no submissions" placeholder was written.
    pub minimal: bool,
}

/// One run of the report pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    stage: Stage,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!("Pipeline: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, error: impl Into<PipelineError>) -> PipelineFailure {
        let stage = self.stage;
        self.enter(Stage::Failed);
        PipelineFailure {
            stage,
            error: error.into(),
        }
    }

    /// Run every stage and write the report.
    pub async fn run(mut self) -> Result<PipelineOutcome, PipelineFailure> {
        self.enter(Stage::ReadingInputs);
        let (dataset, grading_sets, mut warnings) = match self.read_inputs().await {
            Ok(inputs) => inputs,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(Stage::Reconciling);
        let reconciliation = reconcile(&dataset, &grading_sets);
        warnings.extend(task_warnings(&dataset, &grading_sets));
        for (i, set) in grading_sets.iter().enumerate() {
            let orphans = reconciliation
                .orphans
                .iter()
                .filter(|o| o.grading_set == i)
                .count();
            if orphans > 0 {
                warnings.push(format!(
                    "{}: {} grade(s) reference submissions not in the dataset",
                    set.label(),
                    orphans
                ));
            }
        }

        self.enter(Stage::Aggregating);
        let aggregates = match aggregate_all(
            &dataset,
            &grading_sets,
            &reconciliation,
            &self.config.aggregate,
        ) {
            Ok(report) => report,
            Err(e) => return Err(self.fail(e)),
        };
        for view in &aggregates.views {
            if view.ungraded > 0 {
                warnings.push(format!(
                    "{}: {} submission(s) ungraded",
                    view.label, view.ungraded
                ));
            }
            if let ReferenceAgreement::NotComparable { ref reason } = view.reference {
                warnings.push(format!(
                    "{}: reference agreement not comparable: {}",
                    view.label, reason
                ));
            }
        }

        self.enter(Stage::Rendering);
        let input = ReportInput {
            dataset: &dataset,
            grading_sets: &grading_sets,
            reconciliation: &reconciliation,
            aggregates: &aggregates,
            warnings: &warnings,
            generated_at: self.config.generated_at,
        };
        let (html, minimal) = match synthesize(&input, &self.config.report) {
            Ok(html) => (html, false),
            Err(RenderError::NoSubmissions) => {
                warn!("No submissions found in {}", dataset.path.display());
                match render_minimal(&input, &self.config.report) {
                    Ok(html) => (html, true),
                    Err(e) => return Err(self.fail(e)),
                }
            }
            Err(e) => return Err(self.fail(e)),
        };
        // The document must carry readable data before it replaces anything.
        if let Err(e) = extract_embedded_data(&html) {
            return Err(self.fail(e));
        }

        let output = self.config.output.clone();
        if let Err(source) = write_atomic(&output, &html) {
            return Err(self.fail(PipelineError::Output {
                path: output,
                source,
            }));
        }
        debug!("Wrote {} bytes to {}", html.len(), output.display());

        let outcome = PipelineOutcome {
            output,
            submissions: dataset.submissions.len(),
            grading_sets: grading_sets
                .iter()
                .enumerate()
                .map(|(i, set)| SetOutcome {
                    label: set.label(),
                    graded: reconciliation.graded_count(i),
                    ungraded: reconciliation.ungraded_count(i),
                })
                .collect(),
            orphans: reconciliation.orphans.clone(),
            warnings,
            minimal,
        };

        self.enter(Stage::Done);
        Ok(outcome)
    }

    /// Parse the dataset and every grading file on the blocking pool.
    ///
    /// Results are consumed in input order, so the first failing input is
    /// always the same one.
    async fn read_inputs(
        &self,
    ) -> Result<(Dataset, Vec<GradingSet>, Vec<String>), PipelineError> {
        if self.config.egfs.is_empty() {
            return Err(PipelineError::NoGradingFiles);
        }

        let progress = self.progress_bar();

        let edf = self.config.edf.clone();
        let dataset_task = tracked(
            tokio::task::spawn_blocking(move || read_dataset(&edf)),
            progress.clone(),
        );
        let set_tasks = self.config.egfs.iter().cloned().map(|path| {
            tracked(
                tokio::task::spawn_blocking(move || read_grading_set(&path)),
                progress.clone(),
            )
        });

        let (dataset, sets) = futures::join!(dataset_task, join_all(set_tasks));
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let mut warnings = Vec::new();
        let Loaded { value: dataset, warnings: found } =
            dataset.map_err(|e| PipelineError::Task(e.to_string()))??;
        warnings.extend(prefixed(&dataset.path, found));
        info!(
            "Read {} submission(s) from {}",
            dataset.submissions.len(),
            dataset.path.display()
        );

        let mut grading_sets = Vec::with_capacity(sets.len());
        for result in sets {
            let Loaded { value: set, warnings: found } =
                result.map_err(|e| PipelineError::Task(e.to_string()))??;
            warnings.extend(prefixed(&set.path, found));
            info!(
                "Read {} grade(s) from {} ({})",
                set.records.len(),
                set.path.display(),
                set.algorithm
            );
            grading_sets.push(set);
        }

        Ok((dataset, grading_sets, warnings))
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }
        let pb = ProgressBar::new(self.config.egfs.len() as u64 + 1);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Reading inputs [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

async fn tracked<T>(
    task: tokio::task::JoinHandle<T>,
    progress: Option<ProgressBar>,
) -> Result<T, tokio::task::JoinError> {
    let result = task.await;
    if let Some(pb) = progress {
        pb.inc(1);
    }
    result
}

fn prefixed(path: &Path, warnings: Vec<String>) -> impl Iterator<Item = String> + '_ {
    warnings.into_iter().map(move |w| {
        warn!("{}: {}", path.display(), w);
        format!("{}: {}", display_name(path), w)
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Warnings for grading sets that claim a different task than the dataset.
fn task_warnings(dataset: &Dataset, sets: &[GradingSet]) -> Vec<String> {
    sets.iter()
        .filter_map(|set| {
            let task = set.edf_reference.task_id.as_deref()?;
            (task != dataset.task_id).then(|| {
                let message = format!(
                    "{} was graded against task '{}' but the dataset is task '{}'",
                    set.label(),
                    task,
                    dataset.task_id
                );
                warn!("{}", message);
                message
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        EXIT_CORRUPT, EXIT_FORMAT, EXIT_SCALE_MISMATCH, EXIT_UNSUPPORTED_VERSION,
    };
    use crate::formats::testutil::{grade, submission, write_archive, write_edf, write_egf};
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;

    fn config(edf: PathBuf, egfs: Vec<PathBuf>, output: PathBuf) -> PipelineConfig {
        PipelineConfig {
            edf,
            egfs,
            output,
            report: ReportOptions::default(),
            aggregate: AggregateOptions::default(),
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            show_progress: false,
        }
    }

    fn run(config: PipelineConfig) -> Result<PipelineOutcome, PipelineFailure> {
        tokio_test::block_on(Pipeline::new(config).run())
    }

    fn three_submissions(dir: &Path) -> PathBuf {
        write_edf(
            dir,
            "essays.edf",
            Some((0.0, 1.0)),
            &[
                submission("s1", None),
                submission("s2", None),
                submission("s3", None),
            ],
        )
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_partial_grading_run() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let egf = write_egf(
            dir.path(),
            "run.egf",
            "alpha",
            (0.0, 1.0),
            &[grade("s1", 0.8), grade("s2", 0.6)],
        );
        let output = dir.path().join("report.html");

        let outcome = run(config(edf, vec![egf], output.clone())).unwrap();
        assert_eq!(outcome.submissions, 3);
        assert_eq!(outcome.grading_sets[0].graded, 2);
        assert_eq!(outcome.grading_sets[0].ungraded, 1);
        assert!(!outcome.minimal);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("1 submission(s) ungraded")));

        let html = fs::read_to_string(&output).unwrap();
        let data = extract_embedded_data(&html).unwrap();
        let mean = data.aggregates.views[0].distribution.summary().unwrap().mean;
        assert!((mean - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_orphan_grade_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let egf = write_egf(
            dir.path(),
            "run.egf",
            "alpha",
            (0.0, 1.0),
            &[grade("s1", 0.5), grade("s9", 0.4)],
        );
        let output = dir.path().join("report.html");

        let outcome = run(config(edf, vec![egf], output.clone())).unwrap();
        assert_eq!(outcome.orphans.len(), 1);
        assert_eq!(outcome.orphans[0].submission_id, "s9");

        let data = extract_embedded_data(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(data.submissions.len(), 3);
        assert_eq!(data.orphans[0].submission_id, "s9");
    }

    #[test]
    fn test_scale_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let a = write_egf(dir.path(), "a.egf", "alpha", (0.0, 1.0), &[grade("s1", 0.5)]);
        let b = write_egf(dir.path(), "b.egf", "beta", (0.0, 100.0), &[grade("s1", 50.0)]);
        let output = dir.path().join("report.html");

        let failure = run(config(edf, vec![a, b], output.clone())).unwrap_err();
        assert_eq!(failure.stage, Stage::Aggregating);
        assert_eq!(failure.exit_code(), EXIT_SCALE_MISMATCH);
        assert!(!output.exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_empty_dataset_writes_minimal_report() {
        let dir = tempfile::tempdir().unwrap();
        let edf = write_edf(dir.path(), "empty.edf", None, &[]);
        let egf = write_egf(dir.path(), "run.egf", "alpha", (0.0, 1.0), &[]);
        let output = dir.path().join("report.html");

        let outcome = run(config(edf, vec![egf], output.clone())).unwrap();
        assert!(outcome.minimal);
        assert_eq!(outcome.submissions, 0);

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("No submissions found"));
        assert!(extract_embedded_data(&html).is_ok());
    }

    #[test]
    fn test_corrupt_input_fails_while_reading() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let egf = dir.path().join("garbage.egf");
        fs::write(&egf, b"\x00\x01 definitely not a zip").unwrap();
        let output = dir.path().join("report.html");

        let failure = run(config(edf, vec![egf], output.clone())).unwrap_err();
        assert_eq!(failure.stage, Stage::ReadingInputs);
        assert_eq!(failure.exit_code(), EXIT_CORRUPT);
        assert!(!output.exists());
    }

    #[test]
    fn test_format_and_version_errors_map_to_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let output = dir.path().join("report.html");

        let bad_grades = write_egf(
            dir.path(),
            "bad.egf",
            "alpha",
            (0.0, 1.0),
            &[json!({"submission_id": "s1"}), json!({"grade": 0.5})],
        );
        let failure = run(config(edf.clone(), vec![bad_grades], output.clone())).unwrap_err();
        assert_eq!(failure.exit_code(), EXIT_FORMAT);

        let future = dir.path().join("future.egf");
        write_archive(
            &future,
            &[
                ("manifest.json", json!({"egf_version": "9.0"}).to_string()),
                ("grades.jsonl", String::new()),
            ],
        );
        let failure = run(config(edf, vec![future], output.clone())).unwrap_err();
        assert_eq!(failure.exit_code(), EXIT_UNSUPPORTED_VERSION);
        assert!(!output.exists());
    }

    #[test]
    fn test_no_grading_files() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let failure = run(config(edf, Vec::new(), dir.path().join("r.html"))).unwrap_err();
        assert!(matches!(failure.error, PipelineError::NoGradingFiles));
        assert_eq!(failure.stage, Stage::ReadingInputs);
    }

    #[test]
    fn test_identical_runs_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let a = write_egf(
            dir.path(),
            "a.egf",
            "alpha",
            (0.0, 1.0),
            &[grade("s1", 0.1), grade("s2", 0.2)],
        );
        let b = write_egf(
            dir.path(),
            "b.egf",
            "beta",
            (0.0, 1.0),
            &[grade("s2", 0.3), grade("s3", 1.0)],
        );
        let first = dir.path().join("first.html");
        let second = dir.path().join("second.html");

        run(config(edf.clone(), vec![a.clone(), b.clone()], first.clone())).unwrap();
        run(config(edf, vec![a, b], second.clone())).unwrap();
        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_task_mismatch_warns() {
        let dir = tempfile::tempdir().unwrap();
        let edf = three_submissions(dir.path());
        let egf = dir.path().join("other.egf");
        write_archive(
            &egf,
            &[
                (
                    "manifest.json",
                    json!({
                        "egf_version": "1.0",
                        "algorithm": {"name": "alpha"},
                        "score_scale": {"min": 0, "max": 1},
                        "edf_reference": {"task_id": "task-2"}
                    })
                    .to_string(),
                ),
                ("grades.jsonl", grade("s1", 1.0).to_string()),
            ],
        );

        let outcome = run(config(edf, vec![egf], dir.path().join("r.html"))).unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("task 'task-2'") && w.contains("task 'task-1'")));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::ReadingInputs.to_string(), "reading inputs");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}

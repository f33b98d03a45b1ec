//! Machine-readable report data embedded in the HTML document.
//!
//! The data lives in a `<script type="application/json">` element. Every
//! `<` in the JSON text is written as `\u003c`, so the payload can never
//! terminate its element early. The escape is plain JSON and needs no
//! special handling when read back.

use crate::analysis::AggregateReport;
use crate::error::RenderError;
use crate::models::{
    Algorithm, Comparison, Dataset, GradingRecord, GradingSet, ScoreScale, Submission,
};
use crate::reconcile::{Orphan, Reconciliation, Slot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `id` of the script element holding the data.
pub const DATA_ELEMENT_ID: &str = "edexia-report-data";

/// Layout version of [`ReportData`].
pub const DATA_VERSION: &str = "1.0";

/// Everything needed to render one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub dataset: &'a Dataset,
    pub grading_sets: &'a [GradingSet],
    pub reconciliation: &'a Reconciliation<'a>,
    pub aggregates: &'a AggregateReport,
    /// Non-fatal warnings collected during the run.
    pub warnings: &'a [String],
    pub generated_at: DateTime<Utc>,
}

/// Dataset identity and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub file: String,
    pub version: String,
    pub task_id: String,
    pub description: Option<String>,
    pub scale: Option<ScoreScale>,
    pub submissions: usize,
    pub with_reference: usize,
}

/// Grading set identity and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSetSummary {
    pub index: usize,
    pub label: String,
    pub file: String,
    pub version: String,
    pub algorithm: Algorithm,
    pub description: Option<String>,
    pub scale: ScoreScale,
    pub records: usize,
    pub comparisons: usize,
    pub llm_calls: usize,
    /// Task the grading set claims to have graded.
    pub task_id: Option<String>,
    /// Every pairwise judgement, in file order.
    pub comparison_rows: Vec<ComparisonRow>,
}

/// What a grader recorded beyond the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDetail {
    pub label: Option<String>,
    pub criteria: BTreeMap<String, f64>,
    pub explanation: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl GradeDetail {
    /// Details of `record`, or `None` when it carries nothing beyond the score.
    ///
    /// A categorical label alone does not count; the score cell already shows it.
    fn of(record: &GradingRecord) -> Option<Self> {
        let empty = record.criteria.is_empty()
            && record.explanation.is_none()
            && record.graded_at.is_none();
        (!empty).then(|| Self {
            label: record.label.clone(),
            criteria: record.criteria.clone(),
            explanation: record.explanation.clone(),
            graded_at: record.graded_at,
        })
    }
}

/// One pairwise judgement as listed in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub id: String,
    pub submission_a: String,
    pub submission_b: String,
    /// Identifier of the winning submission.
    pub winner: String,
    pub confidence: Option<f64>,
    pub justification: Option<String>,
}

impl From<&Comparison> for ComparisonRow {
    fn from(comparison: &Comparison) -> Self {
        Self {
            id: comparison.id.clone(),
            submission_a: comparison.submission_a.clone(),
            submission_b: comparison.submission_b.clone(),
            winner: comparison.winner_id().to_string(),
            confidence: comparison.confidence,
            justification: comparison.justification.clone(),
        }
    }
}

/// One row of the submission table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRow {
    pub id: String,
    pub submitter: String,
    pub prompt: Option<String>,
    pub cohort: Option<String>,
    pub tags: Vec<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reference_score: Option<f64>,
    /// One entry per grading set; `None` when ungraded.
    pub scores: Vec<Option<f64>>,
    /// One entry per grading set; `None` when ungraded or score only.
    pub grades: Vec<Option<GradeDetail>>,
    /// Leading part of the submission text, when text is included.
    pub excerpt: Option<String>,
}

/// The machine-readable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub data_version: String,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub dataset: DatasetSummary,
    pub grading_sets: Vec<GradingSetSummary>,
    pub aggregates: AggregateReport,
    pub submissions: Vec<SubmissionRow>,
    pub orphans: Vec<Orphan>,
    pub warnings: Vec<String>,
}

impl ReportData {
    /// Collect the report data for `input`.
    ///
    /// `excerpt_chars` bounds each excerpt; `None` leaves text out.
    pub fn from_input(input: &ReportInput, title: &str, excerpt_chars: Option<usize>) -> Self {
        let dataset = input.dataset;

        Self {
            data_version: DATA_VERSION.to_string(),
            title: title.to_string(),
            generated_at: input.generated_at,
            dataset: DatasetSummary {
                file: file_name(&dataset.path),
                version: dataset.version.clone(),
                task_id: dataset.task_id.clone(),
                description: dataset.description.clone(),
                scale: dataset.scale.clone(),
                submissions: dataset.submissions.len(),
                with_reference: dataset.reference_count(),
            },
            grading_sets: input
                .grading_sets
                .iter()
                .enumerate()
                .map(|(index, set)| GradingSetSummary {
                    index,
                    label: set.label(),
                    file: file_name(&set.path),
                    version: set.version.clone(),
                    algorithm: set.algorithm.clone(),
                    description: set.description.clone(),
                    scale: set.scale.clone(),
                    records: set.records.len(),
                    comparisons: set.comparisons.len(),
                    llm_calls: set.llm_calls.len(),
                    task_id: set.edf_reference.task_id.clone(),
                    comparison_rows: set.comparisons.iter().map(ComparisonRow::from).collect(),
                })
                .collect(),
            aggregates: input.aggregates.clone(),
            submissions: input
                .reconciliation
                .records
                .iter()
                .map(|joined| row(joined.submission, &joined.slots, excerpt_chars))
                .collect(),
            orphans: input.reconciliation.orphans.clone(),
            warnings: input.warnings.to_vec(),
        }
    }
}

fn row(submission: &Submission, slots: &[Slot], excerpt_chars: Option<usize>) -> SubmissionRow {
    SubmissionRow {
        id: submission.id.clone(),
        submitter: submission.submitter.clone(),
        prompt: submission.prompt.clone(),
        cohort: submission.metadata.cohort.clone(),
        tags: submission.metadata.tags.clone(),
        submitted_at: submission.metadata.submitted_at,
        reference_score: submission.reference_score,
        scores: slots.iter().map(Slot::score).collect(),
        grades: slots
            .iter()
            .map(|slot| slot.record().and_then(GradeDetail::of))
            .collect(),
        excerpt: excerpt_chars.map(|n| excerpt(&submission.content, n)),
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// Serialize `data` for embedding in a script element.
pub fn to_embedded_json(data: &ReportData) -> Result<String, RenderError> {
    let json = serde_json::to_string(data)?;
    Ok(json.replace('<', "\\u003c"))
}

/// The complete script element carrying `data`.
pub fn data_element(data: &ReportData) -> Result<String, RenderError> {
    Ok(format!(
        "<script type=\"application/json\" id=\"{}\">{}</script>\n",
        DATA_ELEMENT_ID,
        to_embedded_json(data)?
    ))
}

/// Read the embedded report data back out of a rendered document.
pub fn extract_embedded_data(html: &str) -> Result<ReportData, RenderError> {
    let marker = format!("id=\"{}\">", DATA_ELEMENT_ID);
    let start = html.find(&marker).ok_or(RenderError::MissingData)? + marker.len();
    let len = html[start..]
        .find("</script>")
        .ok_or(RenderError::MissingData)?;
    Ok(serde_json::from_str(&html[start..start + len])?)
}

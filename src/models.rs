//! Data models for datasets and grading sets.
//!
//! This module contains the in-memory representation of everything read
//! from EDF and EGF files. All of it is immutable once loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Largest number of integer points for which a scale is treated as discrete.
const MAX_DISCRETE_POINTS: f64 = 101.0;

/// Declared score range of a dataset or grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    /// Lowest score on the scale.
    pub min: f64,
    /// Highest score on the scale.
    pub max: f64,
    /// Ordered categorical labels; position on the scale is the label index.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl ScoreScale {
    /// Creates a numeric scale.
    pub fn numeric(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            labels: Vec::new(),
        }
    }

    /// Creates a categorical scale over the given ordered labels.
    pub fn categorical(labels: Vec<String>) -> Self {
        Self {
            min: 0.0,
            max: labels.len().saturating_sub(1) as f64,
            labels,
        }
    }

    /// Width of the scale.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Whether a score lies on the scale (inclusive).
    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && score >= self.min && score <= self.max
    }

    /// Whether the bounds are whole numbers a small number of points apart.
    pub fn has_whole_bounds(&self) -> bool {
        self.min.fract() == 0.0
            && self.max.fract() == 0.0
            && self.span() + 1.0 <= MAX_DISCRETE_POINTS
    }

    /// Number of points of a labelled scale.
    pub fn label_points(&self) -> Option<usize> {
        (!self.labels.is_empty()).then_some(self.labels.len())
    }

    /// Number of discrete points `scores` fall on, if they are discrete.
    ///
    /// Labelled scales are always discrete. A numeric scale is discrete only
    /// when its bounds and every one of `scores` are whole numbers; a `0–1`
    /// scale carrying `0.8` is continuous.
    pub fn discrete_points(&self, scores: &[f64]) -> Option<usize> {
        if let Some(points) = self.label_points() {
            return Some(points);
        }
        (self.has_whole_bounds() && scores.iter().all(|s| s.fract() == 0.0))
            .then(|| self.span() as usize + 1)
    }

    /// Position of a categorical label on the scale.
    pub fn label_position(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.min + i as f64)
    }

    /// Label for a score, when the scale is categorical.
    pub fn label_for(&self, score: f64) -> Option<&str> {
        if self.labels.is_empty() || !self.contains(score) {
            return None;
        }
        let index = (score - self.min).round() as usize;
        self.labels.get(index).map(String::as_str)
    }
}

impl fmt::Display for ScoreScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            write!(f, "{}–{}", self.min, self.max)
        } else {
            write!(f, "[{}]", self.labels.join(", "))
        }
    }
}

/// Optional descriptive data attached to a submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionMetadata {
    /// When the submission was handed in.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Cohort tag (class, section, year group).
    pub cohort: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// One student submission from an EDF.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Identifier, unique within the dataset.
    pub id: String,
    /// Reference to the submitting student.
    pub submitter: String,
    /// Prompt or question the submission answers.
    pub prompt: Option<String>,
    /// Submitted text.
    pub content: String,
    /// Reference (human) score on the dataset scale.
    pub reference_score: Option<f64>,
    /// Optional metadata.
    pub metadata: SubmissionMetadata,
}

/// An ordered collection of submissions read from one EDF.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Source path.
    pub path: PathBuf,
    /// Declared schema version.
    pub version: String,
    /// Task the submissions belong to.
    pub task_id: String,
    /// Human description of the dataset.
    pub description: Option<String>,
    /// Scale of the reference grades.
    pub scale: Option<ScoreScale>,
    /// Submissions in file order.
    pub submissions: Vec<Submission>,
}

impl Dataset {
    /// Number of submissions carrying a reference score.
    pub fn reference_count(&self) -> usize {
        self.submissions
            .iter()
            .filter(|s| s.reference_score.is_some())
            .count()
    }
}

/// Identity of the algorithm that produced a grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    /// Algorithm name.
    pub name: String,
    /// Algorithm version, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(ref v) => write!(f, "{} {}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One algorithm score for one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingRecord {
    /// Identifier of the graded submission.
    pub submission_id: String,
    /// Score on the grading set's scale.
    pub score: f64,
    /// Categorical label when the score was given as one.
    pub label: Option<String>,
    /// Probability assigned to each scale point.
    pub distribution: Option<Vec<f64>>,
    /// Per-criterion sub-scores.
    pub criteria: BTreeMap<String, f64>,
    /// Free-text explanation.
    pub explanation: Option<String>,
    /// LLM calls that produced this grade.
    pub call_ids: Vec<String>,
    /// When the grade was produced.
    pub graded_at: Option<DateTime<Utc>>,
    /// 1-based record number in `grades.jsonl`.
    pub record: usize,
}

impl GradingRecord {
    /// Highest probability in the grade distribution.
    pub fn peak_probability(&self) -> Option<f64> {
        self.distribution
            .as_ref()
            .and_then(|d| d.iter().copied().reduce(f64::max))
    }
}

/// Winner of a pairwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    A,
    B,
}

/// A pairwise judgement between two submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub id: String,
    pub submission_a: String,
    pub submission_b: String,
    pub winner: Winner,
    pub confidence: Option<f64>,
    pub justification: Option<String>,
    pub call_ids: Vec<String>,
}

impl Comparison {
    /// Identifier of the winning submission.
    pub fn winner_id(&self) -> &str {
        match self.winner {
            Winner::A => &self.submission_a,
            Winner::B => &self.submission_b,
        }
    }
}

/// Usage record of one LLM call made during grading.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCall {
    pub call_id: String,
    pub model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: Option<u64>,
}

/// Reference from a grading set back to the dataset it graded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdfReference {
    pub task_id: Option<String>,
    pub path: Option<String>,
}

/// All grading records produced by one algorithm run, read from one EGF.
#[derive(Debug, Clone)]
pub struct GradingSet {
    /// Source path.
    pub path: PathBuf,
    /// Declared schema version.
    pub version: String,
    /// Human description of the run.
    pub description: Option<String>,
    /// Producing algorithm.
    pub algorithm: Algorithm,
    /// Scale of every score in the set.
    pub scale: ScoreScale,
    /// Dataset this run claims to have graded.
    pub edf_reference: EdfReference,
    /// Grading records in file order.
    pub records: Vec<GradingRecord>,
    /// Pairwise comparisons, if any were made.
    pub comparisons: Vec<Comparison>,
    /// LLM calls, if recorded.
    pub llm_calls: Vec<LlmCall>,
}

impl GradingSet {
    /// Short display label: algorithm identity plus the file name.
    pub fn label(&self) -> String {
        let file = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if file.is_empty() {
            self.algorithm.to_string()
        } else {
            format!("{} ({})", self.algorithm, file)
        }
    }
}

/// A loaded input together with the non-fatal warnings raised while reading it.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_contains_and_discrete_points() {
        let scale = ScoreScale::numeric(0.0, 10.0);
        assert!(scale.contains(0.0));
        assert!(scale.contains(10.0));
        assert!(!scale.contains(10.5));
        assert!(!scale.contains(f64::NAN));
        assert!(scale.has_whole_bounds());
        assert_eq!(scale.discrete_points(&[0.0, 7.0, 10.0]), Some(11));
        assert_eq!(scale.discrete_points(&[7.5]), None);

        let continuous = ScoreScale::numeric(0.0, 0.5);
        assert!(!continuous.has_whole_bounds());
        assert_eq!(continuous.discrete_points(&[0.0]), None);
    }

    #[test]
    fn test_unit_scale_is_discrete_only_for_whole_scores() {
        let unit = ScoreScale::numeric(0.0, 1.0);
        assert_eq!(unit.discrete_points(&[0.8, 0.6]), None);
        assert_eq!(unit.discrete_points(&[0.1, 0.9, 1.0]), None);
        assert_eq!(unit.discrete_points(&[0.0, 1.0, 1.0]), Some(2));

        let labelled = ScoreScale::categorical(vec!["C".into(), "B".into(), "A".into()]);
        assert_eq!(labelled.label_points(), Some(3));
        assert_eq!(labelled.discrete_points(&[]), Some(3));
    }

    #[test]
    fn test_categorical_scale() {
        let scale = ScoreScale::categorical(vec!["C".into(), "B".into(), "A".into()]);
        assert_eq!(scale.min, 0.0);
        assert_eq!(scale.max, 2.0);
        assert_eq!(scale.label_position("B"), Some(1.0));
        assert_eq!(scale.label_position("F"), None);
        assert_eq!(scale.label_for(2.0), Some("A"));
        assert_eq!(scale.to_string(), "[C, B, A]");
    }

    #[test]
    fn test_peak_probability() {
        let record = GradingRecord {
            submission_id: "s1".into(),
            score: 3.0,
            label: None,
            distribution: Some(vec![0.15, 0.7, 0.15]),
            criteria: BTreeMap::new(),
            explanation: None,
            call_ids: Vec::new(),
            graded_at: None,
            record: 1,
        };
        assert_eq!(record.peak_probability(), Some(0.7));
    }

    #[test]
    fn test_comparison_winner_id() {
        let comparison = Comparison {
            id: "c1".into(),
            submission_a: "s1".into(),
            submission_b: "s2".into(),
            winner: Winner::B,
            confidence: None,
            justification: None,
            call_ids: Vec::new(),
        };
        assert_eq!(comparison.winner_id(), "s2");
    }
}

//! Joining grading records to dataset submissions.
//!
//! Receives fully loaded inputs and returns the joined view plus the list of
//! orphans. No I/O.

use crate::models::{Dataset, GradingRecord, GradingSet, Submission};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// State of one grading set for one submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    Graded(&'a GradingRecord),
    Ungraded,
}

impl<'a> Slot<'a> {
    pub fn record(&self) -> Option<&'a GradingRecord> {
        match *self {
            Slot::Graded(record) => Some(record),
            Slot::Ungraded => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.record().map(|r| r.score)
    }
}

/// One submission with one slot per grading set, in grading set input order.
#[derive(Debug, Clone)]
pub struct JoinedRecord<'a> {
    pub submission: &'a Submission,
    pub slots: Vec<Slot<'a>>,
}

impl<'a> JoinedRecord<'a> {
    /// Slot for the grading set at `index`; ungraded when out of range.
    pub fn slot(&self, index: usize) -> Slot<'a> {
        self.slots.get(index).copied().unwrap_or(Slot::Ungraded)
    }
}

/// A grading record whose submission is not in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    /// Input position of the grading set.
    pub grading_set: usize,
    /// Display label of the grading set.
    pub label: String,
    pub submission_id: String,
    /// 1-based record number in the grading file.
    pub record: usize,
}

/// Result of joining one dataset with its grading sets.
#[derive(Debug, Clone)]
pub struct Reconciliation<'a> {
    /// One entry per submission, in dataset order.
    pub records: Vec<JoinedRecord<'a>>,
    /// Grading records with no matching submission.
    pub orphans: Vec<Orphan>,
}

impl<'a> Reconciliation<'a> {
    /// Number of submissions graded by the set at `index`.
    pub fn graded_count(&self, index: usize) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.slot(index), Slot::Graded(_)))
            .count()
    }

    /// Number of submissions not graded by the set at `index`.
    pub fn ungraded_count(&self, index: usize) -> usize {
        self.records.len() - self.graded_count(index)
    }
}

/// Join every grading set against the dataset.
pub fn reconcile<'a>(dataset: &'a Dataset, grading_sets: &'a [GradingSet]) -> Reconciliation<'a> {
    let indexes: Vec<HashMap<&str, &GradingRecord>> = grading_sets
        .iter()
        .map(|set| {
            set.records
                .iter()
                .map(|r| (r.submission_id.as_str(), r))
                .collect()
        })
        .collect();

    let records: Vec<JoinedRecord<'a>> = dataset
        .submissions
        .iter()
        .map(|submission| JoinedRecord {
            submission,
            slots: indexes
                .iter()
                .map(|index| match index.get(submission.id.as_str()) {
                    Some(record) => Slot::Graded(*record),
                    None => Slot::Ungraded,
                })
                .collect(),
        })
        .collect();

    let known: HashSet<&str> = dataset.submissions.iter().map(|s| s.id.as_str()).collect();
    let mut orphans = Vec::new();
    for (i, set) in grading_sets.iter().enumerate() {
        let label = set.label();
        for record in &set.records {
            if !known.contains(record.submission_id.as_str()) {
                warn!(
                    "Orphan grade in {}: submission '{}' (record {}) is not in the dataset",
                    label, record.submission_id, record.record
                );
                orphans.push(Orphan {
                    grading_set: i,
                    label: label.clone(),
                    submission_id: record.submission_id.clone(),
                    record: record.record,
                });
            }
        }
    }

    debug!(
        "Reconciled {} submissions against {} grading set(s), {} orphan(s)",
        records.len(),
        grading_sets.len(),
        orphans.len()
    );

    Reconciliation { records, orphans }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Algorithm, EdfReference, ScoreScale, SubmissionMetadata};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    pub fn submission(id: &str, reference: Option<f64>) -> Submission {
        Submission {
            id: id.to_string(),
            submitter: format!("student-{}", id),
            prompt: Some("Evaluate the argument.".to_string()),
            content: format!("Essay text for {}.", id),
            reference_score: reference,
            metadata: SubmissionMetadata::default(),
        }
    }

    pub fn dataset(submissions: Vec<Submission>, scale: Option<ScoreScale>) -> Dataset {
        Dataset {
            path: PathBuf::from("essays.edf"),
            version: "1.0".to_string(),
            task_id: "task-1".to_string(),
            description: None,
            scale,
            submissions,
        }
    }

    pub fn record(id: &str, score: f64, line: usize) -> GradingRecord {
        GradingRecord {
            submission_id: id.to_string(),
            score,
            label: None,
            distribution: None,
            criteria: BTreeMap::new(),
            explanation: None,
            call_ids: Vec::new(),
            graded_at: None,
            record: line,
        }
    }

    pub fn grading_set(name: &str, scale: ScoreScale, scores: &[(&str, f64)]) -> GradingSet {
        GradingSet {
            path: PathBuf::from(format!("{}.egf", name)),
            version: "1.0".to_string(),
            description: None,
            algorithm: Algorithm {
                name: name.to_string(),
                version: None,
            },
            scale,
            edf_reference: EdfReference::default(),
            records: scores
                .iter()
                .enumerate()
                .map(|(i, (id, score))| record(id, *score, i + 1))
                .collect(),
            comparisons: Vec::new(),
            llm_calls: Vec::new(),
        }
    }

    #[test]
    fn test_every_submission_once_in_dataset_order() {
        let data = dataset(
            vec![submission("s3", None), submission("s1", None), submission("s2", None)],
            None,
        );
        let sets = vec![grading_set(
            "g",
            ScoreScale::numeric(0.0, 1.0),
            &[("s2", 0.5), ("s1", 0.1), ("s3", 0.9)],
        )];

        let result = reconcile(&data, &sets);
        let ids: Vec<_> = result.records.iter().map(|r| r.submission.id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s1", "s2"]);
        assert_eq!(result.records[0].slot(0).score(), Some(0.9));
        assert_eq!(result.records[1].slot(0).score(), Some(0.1));
        assert!(result.orphans.is_empty());
    }

    #[test]
    fn test_ungraded_submissions_are_kept() {
        let data = dataset(
            vec![submission("s1", None), submission("s2", None), submission("s3", None)],
            None,
        );
        let sets = vec![grading_set(
            "g",
            ScoreScale::numeric(0.0, 1.0),
            &[("s1", 0.8), ("s2", 0.6)],
        )];

        let result = reconcile(&data, &sets);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[2].slot(0), Slot::Ungraded);
        assert_eq!(result.graded_count(0), 2);
        assert_eq!(result.ungraded_count(0), 1);
    }

    #[test]
    fn test_orphans_collected_not_joined() {
        let data = dataset(vec![submission("s1", None), submission("s2", None)], None);
        let sets = vec![
            grading_set("a", ScoreScale::numeric(0.0, 1.0), &[("s1", 0.8), ("s9", 0.4)]),
            grading_set("b", ScoreScale::numeric(0.0, 1.0), &[("s7", 0.1), ("s2", 0.2)]),
        ];

        let result = reconcile(&data, &sets);
        assert_eq!(result.records.len(), 2);
        assert_eq!(
            result.orphans,
            vec![
                Orphan {
                    grading_set: 0,
                    label: "a (a.egf)".to_string(),
                    submission_id: "s9".to_string(),
                    record: 2,
                },
                Orphan {
                    grading_set: 1,
                    label: "b (b.egf)".to_string(),
                    submission_id: "s7".to_string(),
                    record: 1,
                },
            ]
        );
        for joined in &result.records {
            for slot in &joined.slots {
                let id = slot.record().map(|r| r.submission_id.as_str());
                assert_ne!(id, Some("s9"));
                assert_ne!(id, Some("s7"));
            }
        }
    }

    #[test]
    fn test_slots_follow_grading_set_order() {
        let data = dataset(vec![submission("s1", None)], None);
        let sets = vec![
            grading_set("a", ScoreScale::numeric(0.0, 1.0), &[]),
            grading_set("b", ScoreScale::numeric(0.0, 1.0), &[("s1", 0.3)]),
        ];
        let result = reconcile(&data, &sets);
        assert_eq!(result.records[0].slots.len(), 2);
        assert_eq!(result.records[0].slot(0), Slot::Ungraded);
        assert_eq!(result.records[0].slot(1).score(), Some(0.3));
        assert_eq!(result.records[0].slot(5), Slot::Ungraded);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let data = dataset(vec![submission("s1", None), submission("s2", None)], None);
        let sets = vec![grading_set(
            "g",
            ScoreScale::numeric(0.0, 1.0),
            &[("x1", 0.1), ("s2", 0.2), ("x2", 0.3), ("x3", 0.4)],
        )];
        let first = reconcile(&data, &sets);
        let second = reconcile(&data, &sets);
        assert_eq!(first.orphans, second.orphans);
        let ids: Vec<_> = first.orphans.iter().map(|o| o.submission_id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "x2", "x3"]);
    }
}

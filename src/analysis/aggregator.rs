//! Score aggregation and agreement statistics.
//!
//! This module turns joined records into per-grading-set summaries and
//! pairwise agreement between grading sets. It performs no I/O.

use super::stats::{self, HistogramBucket};
use crate::error::ScaleMismatchError;
use crate::models::{Dataset, GradingSet, ScoreScale};
use crate::reconcile::{JoinedRecord, Reconciliation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Breakdown key for submissions without a prompt.
pub const NO_PROMPT: &str = "(no prompt)";
/// Breakdown key for submissions without a cohort.
pub const NO_COHORT: &str = "(no cohort)";

/// Share of the scale span used as adjacent tolerance on continuous scales.
const ADJACENT_SPAN_FRACTION: f64 = 0.1;

/// Tunables for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Bucket count for continuous scales.
    pub histogram_buckets: usize,
    /// Largest difference still counted as exact agreement.
    pub exact_tolerance: f64,
    /// Largest difference still counted as adjacent agreement; derived from
    /// the scale when unset.
    pub adjacent_tolerance: Option<f64>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            histogram_buckets: 10,
            exact_tolerance: 0.0,
            adjacent_tolerance: None,
        }
    }
}

impl AggregateOptions {
    /// Adjacent tolerance for scores on `scale`: the configured value, else
    /// one point when the scores are discrete and a tenth of the span otherwise.
    pub fn adjacent_for(&self, scale: &ScoreScale, discrete: bool) -> f64 {
        match self.adjacent_tolerance {
            Some(tolerance) => tolerance,
            None if discrete => 1.0,
            None => scale.span() * ADJACENT_SPAN_FRACTION,
        }
    }
}

/// Descriptive statistics over graded scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

/// Score distribution of one grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Distribution {
    /// Nothing was graded.
    NoData,
    Summary(ScoreSummary),
}

impl Distribution {
    pub fn summary(&self) -> Option<&ScoreSummary> {
        match self {
            Distribution::Summary(summary) => Some(summary),
            Distribution::NoData => None,
        }
    }
}

/// Agreement between two score series on the same scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementMetrics {
    pub pairs: usize,
    pub mean_absolute_error: f64,
    pub root_mean_squared_error: f64,
    pub exact_agreement: f64,
    pub adjacent_agreement: f64,
    /// Tolerance used for `adjacent_agreement`.
    pub adjacent_tolerance: f64,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub quadratic_weighted_kappa: Option<f64>,
}

/// Agreement of one grading set with the dataset's reference grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferenceAgreement {
    /// No graded submission carries a reference grade.
    NoData,
    /// Reference grades exist but are on another scale.
    NotComparable { reason: String },
    Measured(AgreementMetrics),
}

impl ReferenceAgreement {
    pub fn metrics(&self) -> Option<&AgreementMetrics> {
        match self {
            ReferenceAgreement::Measured(metrics) => Some(metrics),
            _ => None,
        }
    }
}

/// Per-group figures for one grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub key: String,
    pub submissions: usize,
    pub graded: usize,
    pub mean_score: Option<f64>,
    pub mean_absolute_error: Option<f64>,
}

/// How well pairwise comparisons follow the reference grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAccuracy {
    pub total: usize,
    /// Comparisons with both sides referenced and distinct reference grades.
    pub scored: usize,
    pub correct: usize,
    /// Both sides carry the same reference grade.
    pub reference_ties: usize,
    /// At least one side is not in the dataset.
    pub external: usize,
    /// Both sides are in the dataset but a reference grade is missing.
    pub unreferenced: usize,
    pub accuracy: Option<f64>,
    pub mean_confidence: Option<f64>,
}

/// Figures for one named rubric criterion across a grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSummary {
    pub name: String,
    /// Graded submissions carrying this criterion.
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// LLM usage recorded by a grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub mean_latency_ms: Option<f64>,
    pub models: Vec<String>,
}

/// Aggregated figures for one grading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateView {
    /// Input position of the grading set.
    pub grading_set: usize,
    pub label: String,
    pub scale: ScoreScale,
    pub graded: usize,
    pub ungraded: usize,
    pub distribution: Distribution,
    pub histogram: Vec<HistogramBucket>,
    pub reference: ReferenceAgreement,
    pub by_prompt: Vec<Breakdown>,
    pub by_cohort: Vec<Breakdown>,
    /// Mean of the highest probability in each grade distribution.
    pub mean_peak_probability: Option<f64>,
    /// Per-criterion figures, ordered by name.
    pub criteria: Vec<CriterionSummary>,
    pub comparisons: Option<ComparisonAccuracy>,
    pub usage: Option<UsageSummary>,
}

/// Agreement between two grading sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseAgreement {
    pub left: usize,
    pub right: usize,
    pub left_label: String,
    pub right_label: String,
    /// Submissions graded by both sets.
    pub shared: usize,
    /// `None` when no submission is graded by both.
    pub agreement: Option<AgreementMetrics>,
}

/// Everything the aggregator produces for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub views: Vec<AggregateView>,
    pub pairwise: Vec<PairwiseAgreement>,
}

/// Aggregate one grading set over the joined records.
///
/// `index` is the grading set's input position; `dataset_scale` is the
/// scale of the reference grades, if declared.
pub fn aggregate(
    records: &[JoinedRecord],
    index: usize,
    set: &GradingSet,
    dataset_scale: Option<&ScoreScale>,
    options: &AggregateOptions,
) -> AggregateView {
    let label = set.label();
    let scores: Vec<f64> = records.iter().filter_map(|r| r.slot(index).score()).collect();
    let graded = scores.len();
    let ungraded = records.len() - graded;

    if ungraded > 0 {
        warn!("{}: {} submission(s) ungraded", label, ungraded);
    }

    let comparable = dataset_scale.is_some_and(|scale| scale == &set.scale);
    let reference = reference_agreement(records, index, set, dataset_scale, options);

    let peaks: Vec<f64> = records
        .iter()
        .filter_map(|r| r.slot(index).record())
        .filter_map(|r| r.peak_probability())
        .collect();

    debug!("{}: {} graded, {} ungraded", label, graded, ungraded);

    AggregateView {
        grading_set: index,
        label,
        scale: set.scale.clone(),
        graded,
        ungraded,
        distribution: distribution(&scores),
        histogram: stats::histogram(&scores, &set.scale, options.histogram_buckets),
        reference,
        by_prompt: breakdown(&group_by_prompt(records), index, comparable),
        by_cohort: breakdown(&group_by_cohort(records), index, comparable),
        mean_peak_probability: stats::mean(&peaks),
        criteria: criterion_summaries(records, index),
        comparisons: comparison_accuracy(records, set),
        usage: usage_summary(set),
    }
}

/// Check that every grading set declares the same scale.
///
/// The first set is the baseline; the first differing set is reported.
pub fn check_scales(sets: &[GradingSet]) -> Result<(), ScaleMismatchError> {
    let Some(first) = sets.first() else {
        return Ok(());
    };
    for other in &sets[1..] {
        if other.scale != first.scale {
            return Err(scale_mismatch(first, other));
        }
    }
    Ok(())
}

/// Agreement between the grading sets at `left` and `right`.
pub fn pairwise(
    records: &[JoinedRecord],
    left: (usize, &GradingSet),
    right: (usize, &GradingSet),
    options: &AggregateOptions,
) -> Result<PairwiseAgreement, ScaleMismatchError> {
    let (li, lset) = left;
    let (ri, rset) = right;
    if lset.scale != rset.scale {
        return Err(scale_mismatch(lset, rset));
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| Some((r.slot(li).score()?, r.slot(ri).score()?)))
        .unzip();

    Ok(PairwiseAgreement {
        left: li,
        right: ri,
        left_label: lset.label(),
        right_label: rset.label(),
        shared: xs.len(),
        agreement: agreement(&xs, &ys, &lset.scale, options),
    })
}

/// Aggregate every grading set and every pair of grading sets.
///
/// Scales are checked before anything is computed.
pub fn aggregate_all(
    dataset: &Dataset,
    sets: &[GradingSet],
    reconciliation: &Reconciliation,
    options: &AggregateOptions,
) -> Result<AggregateReport, ScaleMismatchError> {
    check_scales(sets)?;

    let records = &reconciliation.records;
    let views = sets
        .iter()
        .enumerate()
        .map(|(i, set)| aggregate(records, i, set, dataset.scale.as_ref(), options))
        .collect();

    let mut pairs = Vec::new();
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            pairs.push(pairwise(records, (i, &sets[i]), (j, &sets[j]), options)?);
        }
    }

    Ok(AggregateReport {
        views,
        pairwise: pairs,
    })
}

/// Agreement metrics of `xs` against `ys`; `None` for empty input.
pub fn agreement(
    xs: &[f64],
    ys: &[f64],
    scale: &ScoreScale,
    options: &AggregateOptions,
) -> Option<AgreementMetrics> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let n = xs.len() as f64;
    let diffs: Vec<f64> = xs.iter().zip(ys).map(|(x, y)| (x - y).abs()).collect();
    let discrete = scale.discrete_points(xs).is_some() && scale.discrete_points(ys).is_some();
    let adjacent_tolerance = options.adjacent_for(scale, discrete);
    let within = |tolerance: f64| diffs.iter().filter(|&&d| d <= tolerance).count() as f64 / n;

    Some(AgreementMetrics {
        pairs: xs.len(),
        mean_absolute_error: diffs.iter().sum::<f64>() / n,
        root_mean_squared_error: (diffs.iter().map(|d| d * d).sum::<f64>() / n).sqrt(),
        exact_agreement: within(options.exact_tolerance),
        adjacent_agreement: within(adjacent_tolerance),
        adjacent_tolerance,
        pearson: stats::pearson(xs, ys),
        spearman: stats::spearman(xs, ys),
        quadratic_weighted_kappa: stats::quadratic_weighted_kappa(xs, ys, scale),
    })
}

/// Group joined records by prompt.
pub fn group_by_prompt<'r, 'a>(
    records: &'r [JoinedRecord<'a>],
) -> BTreeMap<String, Vec<&'r JoinedRecord<'a>>> {
    let mut grouped: BTreeMap<String, Vec<&JoinedRecord>> = BTreeMap::new();

    for record in records {
        let key = record
            .submission
            .prompt
            .clone()
            .unwrap_or_else(|| NO_PROMPT.to_string());
        grouped.entry(key).or_default().push(record);
    }

    grouped
}

/// Group joined records by cohort.
pub fn group_by_cohort<'r, 'a>(
    records: &'r [JoinedRecord<'a>],
) -> BTreeMap<String, Vec<&'r JoinedRecord<'a>>> {
    let mut grouped: BTreeMap<String, Vec<&JoinedRecord>> = BTreeMap::new();

    for record in records {
        let key = record
            .submission
            .metadata
            .cohort
            .clone()
            .unwrap_or_else(|| NO_COHORT.to_string());
        grouped.entry(key).or_default().push(record);
    }

    grouped
}

fn scale_mismatch(left: &GradingSet, right: &GradingSet) -> ScaleMismatchError {
    ScaleMismatchError {
        left: left.label(),
        left_scale: left.scale.clone(),
        right: right.label(),
        right_scale: right.scale.clone(),
    }
}

fn distribution(scores: &[f64]) -> Distribution {
    let (Some(mean), Some(median), Some(std_dev)) = (
        stats::mean(scores),
        stats::median(scores),
        stats::std_dev(scores),
    ) else {
        return Distribution::NoData;
    };

    Distribution::Summary(ScoreSummary {
        count: scores.len(),
        min: scores.iter().copied().fold(f64::INFINITY, f64::min),
        max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        median,
        std_dev,
    })
}

fn reference_agreement(
    records: &[JoinedRecord],
    index: usize,
    set: &GradingSet,
    dataset_scale: Option<&ScoreScale>,
    options: &AggregateOptions,
) -> ReferenceAgreement {
    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| Some((r.slot(index).score()?, r.submission.reference_score?)))
        .unzip();

    if xs.is_empty() {
        return ReferenceAgreement::NoData;
    }

    match dataset_scale {
        Some(scale) if scale == &set.scale => match agreement(&xs, &ys, &set.scale, options) {
            Some(metrics) => ReferenceAgreement::Measured(metrics),
            None => ReferenceAgreement::NoData,
        },
        Some(scale) => {
            let reason = format!(
                "reference grades are on {} but {} grades on {}",
                scale,
                set.label(),
                set.scale
            );
            warn!("Reference agreement not comparable: {}", reason);
            ReferenceAgreement::NotComparable { reason }
        }
        None => ReferenceAgreement::NotComparable {
            reason: "the dataset declares no score scale".to_string(),
        },
    }
}

fn breakdown(
    groups: &BTreeMap<String, Vec<&JoinedRecord>>,
    index: usize,
    comparable: bool,
) -> Vec<Breakdown> {
    groups
        .iter()
        .map(|(key, records)| {
            let scores: Vec<f64> = records.iter().filter_map(|r| r.slot(index).score()).collect();
            let errors: Vec<f64> = records
                .iter()
                .filter_map(|r| {
                    Some((r.slot(index).score()? - r.submission.reference_score?).abs())
                })
                .collect();

            Breakdown {
                key: key.clone(),
                submissions: records.len(),
                graded: scores.len(),
                mean_score: stats::mean(&scores),
                mean_absolute_error: if comparable { stats::mean(&errors) } else { None },
            }
        })
        .collect()
}

fn criterion_summaries(records: &[JoinedRecord], index: usize) -> Vec<CriterionSummary> {
    let mut values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records.iter().filter_map(|r| r.slot(index).record()) {
        for (name, &value) in &record.criteria {
            values.entry(name.as_str()).or_default().push(value);
        }
    }

    values
        .into_iter()
        .filter_map(|(name, values)| {
            Some(CriterionSummary {
                name: name.to_string(),
                count: values.len(),
                mean: stats::mean(&values)?,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect()
}

fn comparison_accuracy(records: &[JoinedRecord], set: &GradingSet) -> Option<ComparisonAccuracy> {
    if set.comparisons.is_empty() {
        return None;
    }

    let references: HashMap<&str, Option<f64>> = records
        .iter()
        .map(|r| (r.submission.id.as_str(), r.submission.reference_score))
        .collect();

    let mut accuracy = ComparisonAccuracy {
        total: set.comparisons.len(),
        scored: 0,
        correct: 0,
        reference_ties: 0,
        external: 0,
        unreferenced: 0,
        accuracy: None,
        mean_confidence: None,
    };

    for comparison in &set.comparisons {
        let (Some(a), Some(b)) = (
            references.get(comparison.submission_a.as_str()),
            references.get(comparison.submission_b.as_str()),
        ) else {
            accuracy.external += 1;
            continue;
        };
        let (Some(a), Some(b)) = (*a, *b) else {
            accuracy.unreferenced += 1;
            continue;
        };
        if a == b {
            accuracy.reference_ties += 1;
            continue;
        }

        accuracy.scored += 1;
        let better = if a > b {
            comparison.submission_a.as_str()
        } else {
            comparison.submission_b.as_str()
        };
        if comparison.winner_id() == better {
            accuracy.correct += 1;
        }
    }

    if accuracy.scored > 0 {
        accuracy.accuracy = Some(accuracy.correct as f64 / accuracy.scored as f64);
    }
    let confidences: Vec<f64> = set.comparisons.iter().filter_map(|c| c.confidence).collect();
    accuracy.mean_confidence = stats::mean(&confidences);

    Some(accuracy)
}

fn usage_summary(set: &GradingSet) -> Option<UsageSummary> {
    if set.llm_calls.is_empty() {
        return None;
    }

    let latencies: Vec<f64> = set
        .llm_calls
        .iter()
        .filter_map(|c| c.latency_ms)
        .map(|ms| ms as f64)
        .collect();
    let models: BTreeSet<String> = set.llm_calls.iter().filter_map(|c| c.model.clone()).collect();

    Some(UsageSummary {
        calls: set.llm_calls.len(),
        input_tokens: set.llm_calls.iter().map(|c| c.input_tokens).sum(),
        output_tokens: set.llm_calls.iter().map(|c| c.output_tokens).sum(),
        mean_latency_ms: stats::mean(&latencies),
        models: models.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, LlmCall, Winner};
    use crate::reconcile::reconcile;
    use crate::reconcile::tests::{dataset, grading_set, submission};

    fn first_view(data: &Dataset, sets: &[GradingSet]) -> AggregateView {
        let joined = reconcile(data, sets);
        aggregate(
            &joined.records,
            0,
            &sets[0],
            data.scale.as_ref(),
            &AggregateOptions::default(),
        )
    }

    fn unit() -> ScoreScale {
        ScoreScale::numeric(0.0, 1.0)
    }

    fn comparison(id: &str, a: &str, b: &str, winner: Winner, confidence: f64) -> Comparison {
        Comparison {
            id: id.to_string(),
            submission_a: a.to_string(),
            submission_b: b.to_string(),
            winner,
            confidence: Some(confidence),
            justification: None,
            call_ids: Vec::new(),
        }
    }

    #[test]
    fn test_partial_grading_scenario() {
        let data = dataset(
            vec![submission("s1", None), submission("s2", None), submission("s3", None)],
            None,
        );
        let sets = vec![grading_set("g", unit(), &[("s1", 0.8), ("s2", 0.6)])];
        let view = first_view(&data, &sets);
        assert_eq!(view.graded, 2);
        assert_eq!(view.ungraded, 1);
        let summary = view.distribution.summary().unwrap();
        assert!((summary.mean - 0.7).abs() < 1e-12);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.min, 0.6);
        assert_eq!(summary.max, 0.8);
        assert_eq!(view.reference, ReferenceAgreement::NoData);
    }

    #[test]
    fn test_criteria_summarised_by_name() {
        let data = dataset(
            vec![submission("s1", None), submission("s2", None), submission("s3", None)],
            None,
        );
        let mut set = grading_set("g", unit(), &[("s1", 0.8), ("s2", 0.6), ("s3", 0.4)]);
        set.records[0].criteria =
            BTreeMap::from([("style".to_string(), 3.0), ("argument".to_string(), 4.0)]);
        set.records[1].criteria = BTreeMap::from([("style".to_string(), 1.0)]);
        let view = first_view(&data, &[set]);

        let names: Vec<_> = view.criteria.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["argument", "style"]);
        assert_eq!(view.criteria[0].count, 1);
        assert_eq!(view.criteria[1].count, 2);
        assert_eq!(view.criteria[1].mean, 2.0);
        assert_eq!(view.criteria[1].min, 1.0);
        assert_eq!(view.criteria[1].max, 3.0);
    }

    #[test]
    fn test_no_graded_submissions_is_no_data() {
        let data = dataset(vec![submission("s1", Some(0.5))], Some(unit()));
        let sets = vec![grading_set("g", unit(), &[])];
        let view = first_view(&data, &sets);
        assert_eq!(view.graded, 0);
        assert_eq!(view.ungraded, 1);
        assert_eq!(view.distribution, Distribution::NoData);
        assert_eq!(view.reference, ReferenceAgreement::NoData);
        assert!(view.histogram.iter().all(|b| b.count == 0));
        assert_eq!(view.mean_peak_probability, None);
        assert!(view.criteria.is_empty());
    }

    #[test]
    fn test_reference_agreement_measured() {
        let scale = ScoreScale::numeric(0.0, 4.0);
        let data = dataset(
            vec![
                submission("s1", Some(0.0)),
                submission("s2", Some(1.0)),
                submission("s3", Some(2.0)),
                submission("s4", Some(4.0)),
                submission("s5", None),
            ],
            Some(scale.clone()),
        );
        let sets = vec![grading_set(
            "g",
            scale.clone(),
            &[("s1", 0.0), ("s2", 2.0), ("s3", 2.0), ("s4", 2.0), ("s5", 3.0)],
        )];
        let view = first_view(&data, &sets);
        let metrics = view.reference.metrics().unwrap();
        assert_eq!(metrics.pairs, 4);
        assert_eq!(metrics.mean_absolute_error, 0.75);
        assert_eq!(metrics.exact_agreement, 0.5);
        assert_eq!(metrics.adjacent_agreement, 0.75);
        assert_eq!(metrics.adjacent_tolerance, 1.0);
        assert!((metrics.root_mean_squared_error - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!(metrics.pearson.is_some());
        assert!(metrics.quadratic_weighted_kappa.is_some());
    }

    #[test]
    fn test_reference_on_other_scale_not_comparable() {
        let data = dataset(
            vec![submission("s1", Some(7.0))],
            Some(ScoreScale::numeric(0.0, 10.0)),
        );
        let sets = vec![grading_set("g", unit(), &[("s1", 0.7)])];
        let view = first_view(&data, &sets);
        assert!(matches!(view.reference, ReferenceAgreement::NotComparable { .. }));
        assert_eq!(view.by_prompt[0].mean_absolute_error, None);
    }

    #[test]
    fn test_adjacent_tolerance_defaults() {
        let options = AggregateOptions::default();
        assert_eq!(options.adjacent_for(&ScoreScale::numeric(0.0, 10.0), true), 1.0);
        assert_eq!(options.adjacent_for(&ScoreScale::numeric(0.0, 10.0), false), 1.0);
        assert_eq!(options.adjacent_for(&ScoreScale::numeric(0.0, 0.5), false), 0.05);
        assert_eq!(options.adjacent_for(&unit(), false), 0.1);

        let fixed = AggregateOptions {
            adjacent_tolerance: Some(2.0),
            ..AggregateOptions::default()
        };
        assert_eq!(fixed.adjacent_for(&ScoreScale::numeric(0.0, 10.0), true), 2.0);
    }

    #[test]
    fn test_fractional_scores_on_unit_scale_are_continuous() {
        let data = dataset(
            vec![submission("s1", Some(0.1)), submission("s2", Some(0.9))],
            Some(unit()),
        );
        let sets = vec![grading_set("g", unit(), &[("s1", 0.8), ("s2", 0.6)])];
        let view = first_view(&data, &sets);

        assert_eq!(view.histogram.len(), 10);
        assert_eq!(view.histogram.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(view.histogram[6].count, 1);
        assert_eq!(view.histogram[8].count, 1);

        let metrics = view.reference.metrics().unwrap();
        assert_eq!(metrics.adjacent_tolerance, 0.1);
        assert_eq!(metrics.adjacent_agreement, 0.0);
        assert_eq!(metrics.quadratic_weighted_kappa, None);
    }

    #[test]
    fn test_whole_scores_on_unit_scale_are_discrete() {
        let data = dataset(
            vec![submission("s1", Some(0.0)), submission("s2", Some(1.0))],
            Some(unit()),
        );
        let sets = vec![grading_set("g", unit(), &[("s1", 0.0), ("s2", 1.0)])];
        let view = first_view(&data, &sets);

        assert_eq!(view.histogram.len(), 2);
        let metrics = view.reference.metrics().unwrap();
        assert_eq!(metrics.adjacent_tolerance, 1.0);
        assert_eq!(metrics.quadratic_weighted_kappa, Some(1.0));
    }

    #[test]
    fn test_scale_mismatch_between_sets() {
        let data = dataset(vec![submission("s1", None)], None);
        let sets = vec![
            grading_set("a", unit(), &[("s1", 0.5)]),
            grading_set("b", ScoreScale::numeric(0.0, 100.0), &[("s1", 50.0)]),
        ];
        let joined = reconcile(&data, &sets);

        let err = aggregate_all(&data, &sets, &joined, &AggregateOptions::default()).unwrap_err();
        assert_eq!(err.left, "a (a.egf)");
        assert_eq!(err.right, "b (b.egf)");
        assert_eq!(err.left_scale.to_string(), "0–1");
        assert_eq!(err.right_scale, ScoreScale::numeric(0.0, 100.0));
    }

    #[test]
    fn test_pairwise_on_shared_submissions() {
        let data = dataset(
            vec![submission("s1", None), submission("s2", None), submission("s3", None)],
            None,
        );
        let sets = vec![
            grading_set("a", unit(), &[("s1", 0.2), ("s2", 0.4)]),
            grading_set("b", unit(), &[("s2", 0.4), ("s3", 0.9)]),
            grading_set("c", unit(), &[("s3", 0.1)]),
        ];
        let joined = reconcile(&data, &sets);

        let report = aggregate_all(&data, &sets, &joined, &AggregateOptions::default()).unwrap();
        assert_eq!(report.views.len(), 3);
        let pairs: Vec<_> = report.pairwise.iter().map(|p| (p.left, p.right, p.shared)).collect();
        assert_eq!(pairs, vec![(0, 1, 1), (0, 2, 0), (1, 2, 1)]);

        let ab = report.pairwise[0].agreement.as_ref().unwrap();
        assert_eq!(ab.mean_absolute_error, 0.0);
        assert_eq!(ab.exact_agreement, 1.0);
        assert_eq!(ab.pearson, None);
        assert!(report.pairwise[1].agreement.is_none());
    }

    #[test]
    fn test_breakdowns_sorted_by_key() {
        let mut s1 = submission("s1", None);
        s1.metadata.cohort = Some("year-9".to_string());
        let mut s2 = submission("s2", None);
        s2.prompt = Some("Describe a place.".to_string());
        s2.metadata.cohort = Some("year-8".to_string());
        let s3 = submission("s3", None);
        let data = dataset(vec![s1, s2, s3], None);
        let sets = vec![grading_set("g", unit(), &[("s1", 1.0), ("s2", 0.5)])];
        let view = first_view(&data, &sets);
        let cohorts: Vec<_> = view.by_cohort.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(cohorts, vec![NO_COHORT, "year-8", "year-9"]);
        assert_eq!(view.by_cohort[0].graded, 0);
        assert_eq!(view.by_cohort[0].mean_score, None);

        let prompts: Vec<_> = view
            .by_prompt
            .iter()
            .map(|b| (b.key.as_str(), b.submissions))
            .collect();
        assert_eq!(
            prompts,
            vec![("Describe a place.", 1), ("Evaluate the argument.", 2)]
        );
    }

    #[test]
    fn test_comparison_accuracy() {
        let data = dataset(
            vec![
                submission("s1", Some(8.0)),
                submission("s2", Some(3.0)),
                submission("s3", Some(3.0)),
                submission("s4", None),
            ],
            Some(ScoreScale::numeric(0.0, 10.0)),
        );
        let mut set = grading_set("g", ScoreScale::numeric(0.0, 10.0), &[("s1", 7.0)]);
        set.comparisons = vec![
            comparison("c1", "s1", "s2", Winner::A, 0.9),
            comparison("c2", "s2", "s1", Winner::A, 0.5),
            comparison("c3", "s2", "s3", Winner::B, 0.7),
            comparison("c4", "s1", "anchor-1", Winner::A, 0.8),
            comparison("c5", "s1", "s4", Winner::B, 0.6),
        ];
        let sets = vec![set];
        let view = first_view(&data, &sets);
        let accuracy = view.comparisons.unwrap();
        assert_eq!(accuracy.total, 5);
        assert_eq!(accuracy.scored, 2);
        assert_eq!(accuracy.correct, 1);
        assert_eq!(accuracy.reference_ties, 1);
        assert_eq!(accuracy.external, 1);
        assert_eq!(accuracy.unreferenced, 1);
        assert_eq!(accuracy.accuracy, Some(0.5));
        assert!((accuracy.mean_confidence.unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_usage_summary() {
        let data = dataset(vec![submission("s1", None)], None);
        let mut set = grading_set("g", unit(), &[("s1", 0.5)]);
        set.llm_calls = vec![
            LlmCall {
                call_id: "c1".into(),
                model: Some("model-b".into()),
                input_tokens: 100,
                output_tokens: 20,
                latency_ms: Some(1000),
            },
            LlmCall {
                call_id: "c2".into(),
                model: Some("model-a".into()),
                input_tokens: 50,
                output_tokens: 10,
                latency_ms: None,
            },
            LlmCall {
                call_id: "c3".into(),
                model: Some("model-b".into()),
                input_tokens: 0,
                output_tokens: 0,
                latency_ms: Some(500),
            },
        ];
        let sets = vec![set];
        let view = first_view(&data, &sets);
        let usage = view.usage.unwrap();
        assert_eq!(usage.calls, 3);
        assert_eq!(usage.input_tokens, 150);
        assert_eq!(usage.output_tokens, 30);
        assert_eq!(usage.mean_latency_ms, Some(750.0));
        assert_eq!(usage.models, vec!["model-a", "model-b"]);
        assert!(view.comparisons.is_none());
    }

    #[test]
    fn test_mean_peak_probability() {
        let data = dataset(vec![submission("s1", None), submission("s2", None)], None);
        let mut set = grading_set("g", unit(), &[("s1", 1.0), ("s2", 0.0)]);
        set.records[0].distribution = Some(vec![0.2, 0.8]);
        set.records[1].distribution = Some(vec![0.6, 0.4]);
        let sets = vec![set];
        let view = first_view(&data, &sets);
        assert!((view.mean_peak_probability.unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_serializes_with_status() {
        let json = serde_json::to_value(Distribution::NoData).unwrap();
        assert_eq!(json, serde_json::json!({"status": "no_data"}));

        let reference = ReferenceAgreement::NotComparable {
            reason: "x".to_string(),
        };
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["status"], "not_comparable");
    }
}

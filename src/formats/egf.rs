//! Edexia Grading File reader.

use super::diagnostics::{Diagnostics, Fields};
use super::{check_version, json_lines, kind, Container, MANIFEST};
use crate::error::{Location, ReadError};
use crate::models::{
    Algorithm, Comparison, EdfReference, GradingRecord, GradingSet, LlmCall, Loaded, ScoreScale,
    Winner,
};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Member holding one grade result per line.
pub const GRADES: &str = "grades.jsonl";
/// Optional member holding pairwise comparisons.
pub const COMPARISONS: &str = "comparisons.jsonl";
/// Optional member holding LLM call records.
pub const LLM_CALLS: &str = "llm_calls.jsonl";

/// EGF schema versions this reader implements.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1"];

/// Allowed distance of a grade distribution's sum from 1.
const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// Read and validate an EGF.
pub fn read_grading_set(path: &Path) -> Result<Loaded<GradingSet>, ReadError> {
    info!("Reading grading file: {}", path.display());

    let mut container = Container::open(path)?;
    let manifest = container.manifest()?;
    let version = check_version(path, "EGF", &manifest, "egf_version", SUPPORTED_VERSIONS)?;
    let grades_text = container.read_text(GRADES)?;
    let comparisons_text = container.read_optional_text(COMPARISONS)?;
    let calls_text = container.read_optional_text(LLM_CALLS)?;

    let mut diag = Diagnostics::default();
    let manifest_location = Location::member(MANIFEST);
    let header = Fields::new(&manifest, &manifest_location);

    let description = header.optional_str(&mut diag, "description");
    let algorithm = read_algorithm(&header, &mut diag);
    let scale = header.optional_scale(&mut diag, "score_scale");
    if header.get("score_scale").is_none() {
        diag.error(&manifest_location, "score_scale", "required field is missing");
    }
    let edf_reference = header
        .optional_object(&mut diag, "edf_reference")
        .map(|object| {
            let fields = Fields::nested(object, &manifest_location, "edf_reference");
            EdfReference {
                task_id: fields.optional_str(&mut diag, "task_id"),
                path: fields.optional_str(&mut diag, "path"),
            }
        })
        .unwrap_or_default();

    let llm_calls = calls_text
        .as_deref()
        .map(|text| read_llm_calls(text, &mut diag))
        .unwrap_or_default();
    let known_calls: Option<HashSet<&str>> = calls_text
        .is_some()
        .then(|| llm_calls.iter().map(|c| c.call_id.as_str()).collect());

    let records = read_grades(&grades_text, scale.as_ref(), known_calls.as_ref(), &mut diag);
    let comparisons = comparisons_text
        .as_deref()
        .map(|text| read_comparisons(text, known_calls.as_ref(), &mut diag))
        .unwrap_or_default();

    debug!(
        "Grading file {}: {} grades, {} comparisons, {} LLM calls, version {}",
        path.display(),
        records.len(),
        comparisons.len(),
        llm_calls.len(),
        version
    );

    let set = GradingSet {
        path: path.to_path_buf(),
        version,
        description,
        algorithm: algorithm.unwrap_or_else(|| Algorithm {
            name: String::new(),
            version: None,
        }),
        scale: scale.unwrap_or_else(|| ScoreScale::numeric(0.0, 1.0)),
        edf_reference,
        records,
        comparisons,
        llm_calls,
    };

    diag.finish(path, set)
}

fn read_algorithm(header: &Fields<'_>, diag: &mut Diagnostics) -> Option<Algorithm> {
    if header.get("algorithm").is_none() {
        diag.error(header.location(), "algorithm", "required field is missing");
        return None;
    }
    let object = header.optional_object(diag, "algorithm")?;
    let fields = Fields::nested(object, header.location(), "algorithm");
    let name = fields.required_str(diag, "name");
    let version = fields.optional_str(diag, "version");
    name.map(|name| Algorithm { name, version })
}

fn read_llm_calls(text: &str, diag: &mut Diagnostics) -> Vec<LlmCall> {
    let mut calls = Vec::new();
    let mut seen = HashSet::new();

    for (location, object) in json_lines(LLM_CALLS, text, diag) {
        let fields = Fields::new(&object, &location);
        let call_id = fields.required_str(diag, "call_id");
        let model = fields.optional_str(diag, "model");
        let input_tokens = fields.optional_u64(diag, "input_tokens").unwrap_or(0);
        let output_tokens = fields.optional_u64(diag, "output_tokens").unwrap_or(0);
        let latency_ms = fields.optional_u64(diag, "latency_ms");

        let Some(call_id) = call_id else { continue };
        if !seen.insert(call_id.clone()) {
            diag.error(&location, "call_id", format!("duplicate call id '{}'", call_id));
            continue;
        }
        calls.push(LlmCall {
            call_id,
            model,
            input_tokens,
            output_tokens,
            latency_ms,
        });
    }

    calls
}

fn check_call_ids(
    fields: &Fields<'_>,
    call_ids: &[String],
    known: Option<&HashSet<&str>>,
    diag: &mut Diagnostics,
) {
    let Some(known) = known else { return };
    for (i, id) in call_ids.iter().enumerate() {
        if !known.contains(id.as_str()) {
            diag.error(
                fields.location(),
                format!("call_ids[{}]", i),
                format!("references unknown LLM call '{}'", id),
            );
        }
    }
}

fn read_distribution(
    fields: &Fields<'_>,
    scale: Option<&ScoreScale>,
    diag: &mut Diagnostics,
) -> Option<Vec<f64>> {
    let value = fields.get("grade_distribution")?;
    let Value::Array(items) = value else {
        diag.error(
            fields.location(),
            "grade_distribution",
            format!("expected an array of probabilities, found {}", kind(value)),
        );
        return None;
    };

    let probabilities: Vec<f64> = items
        .iter()
        .filter_map(|v| v.as_f64())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .collect();
    if probabilities.len() != items.len() {
        diag.error(
            fields.location(),
            "grade_distribution",
            "every entry must be a non-negative number",
        );
        return None;
    }

    if let Some(points) = scale.and_then(ScoreScale::label_points) {
        if probabilities.len() != points {
            diag.error(
                fields.location(),
                "grade_distribution",
                format!(
                    "expected {} entries (one per label), found {}",
                    points,
                    probabilities.len()
                ),
            );
            return None;
        }
    }

    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        diag.error(
            fields.location(),
            "grade_distribution",
            format!("probabilities must sum to 1, found {}", sum),
        );
        return None;
    }

    Some(probabilities)
}

fn read_grades(
    text: &str,
    scale: Option<&ScoreScale>,
    known_calls: Option<&HashSet<&str>>,
    diag: &mut Diagnostics,
) -> Vec<GradingRecord> {
    let mut records = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (location, object) in json_lines(GRADES, text, diag) {
        let fields = Fields::new(&object, &location);
        let record = location.record.unwrap_or_default();

        let submission_id = fields.required_str(diag, "submission_id");
        // An invalid scale is already recorded; scores are then only type-checked.
        let score = fields.required_score(diag, "grade", scale);
        let distribution = read_distribution(&fields, scale, diag);
        let criteria = fields.optional_number_map(diag, "criteria");
        let explanation = fields.optional_str(diag, "explanation");
        let call_ids = fields.optional_str_array(diag, "call_ids");
        let graded_at = fields.optional_timestamp(diag, "graded_at");
        check_call_ids(&fields, &call_ids, known_calls, diag);

        let Some(submission_id) = submission_id else { continue };
        match seen.entry(submission_id.clone()) {
            Entry::Occupied(first) => {
                diag.error(
                    &location,
                    "submission_id",
                    format!(
                        "duplicate grade for submission '{}' (first at record {})",
                        submission_id,
                        first.get()
                    ),
                );
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        if let Some((score, label)) = score {
            records.push(GradingRecord {
                submission_id,
                score,
                label,
                distribution,
                criteria,
                explanation,
                call_ids,
                graded_at,
                record,
            });
        }
    }

    records
}

fn read_comparisons(
    text: &str,
    known_calls: Option<&HashSet<&str>>,
    diag: &mut Diagnostics,
) -> Vec<Comparison> {
    let mut comparisons = Vec::new();
    let mut seen = HashSet::new();

    for (location, object) in json_lines(COMPARISONS, text, diag) {
        let fields = Fields::new(&object, &location);

        let id = fields.required_str(diag, "comparison_id");
        let submission_a = fields.required_str(diag, "submission_a");
        let submission_b = fields.required_str(diag, "submission_b");
        let winner = match fields.get("winner") {
            None => {
                diag.error(&location, "winner", "required field is missing");
                None
            }
            Some(Value::String(w)) if w.eq_ignore_ascii_case("a") => Some(Winner::A),
            Some(Value::String(w)) if w.eq_ignore_ascii_case("b") => Some(Winner::B),
            Some(other) => {
                diag.error(
                    &location,
                    "winner",
                    format!("expected \"a\" or \"b\", found {}", other),
                );
                None
            }
        };
        let confidence = fields.optional_number(diag, "confidence");
        if confidence.is_some_and(|c| !(0.0..=1.0).contains(&c)) {
            diag.error(&location, "confidence", "must lie between 0 and 1");
        }
        let justification = fields.optional_str(diag, "justification");
        let call_ids = fields.optional_str_array(diag, "call_ids");
        check_call_ids(&fields, &call_ids, known_calls, diag);

        if let (Some(a), Some(b)) = (&submission_a, &submission_b) {
            if a == b {
                diag.error(&location, "submission_b", "a submission cannot be compared with itself");
                continue;
            }
        }
        if let Some(ref id) = id {
            if !seen.insert(id.clone()) {
                diag.error(&location, "comparison_id", format!("duplicate comparison id '{}'", id));
                continue;
            }
        }

        if let (Some(id), Some(submission_a), Some(submission_b), Some(winner)) =
            (id, submission_a, submission_b, winner)
        {
            comparisons.push(Comparison {
                id,
                submission_a,
                submission_b,
                winner,
                confidence,
                justification,
                call_ids,
            });
        }
    }

    comparisons
}

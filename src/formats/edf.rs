//! Edexia Dataset File reader.

use super::diagnostics::{Diagnostics, Fields};
use super::{check_version, json_lines, Container, MANIFEST};
use crate::error::{Location, ReadError};
use crate::models::{Dataset, Loaded, Submission, SubmissionMetadata};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Member holding one submission per line.
pub const SUBMISSIONS: &str = "submissions.jsonl";

/// EDF schema versions this reader implements.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1"];

/// Read and validate an EDF.
pub fn read_dataset(path: &Path) -> Result<Loaded<Dataset>, ReadError> {
    info!("Reading dataset: {}", path.display());

    let mut container = Container::open(path)?;
    let manifest = container.manifest()?;
    let version = check_version(path, "EDF", &manifest, "edf_version", SUPPORTED_VERSIONS)?;
    let submissions_text = container.read_text(SUBMISSIONS)?;

    let mut diag = Diagnostics::default();
    let manifest_location = Location::member(MANIFEST);
    let header = Fields::new(&manifest, &manifest_location);

    let task_id = header.required_str(&mut diag, "task_id");
    let description = header.optional_str(&mut diag, "description");
    let scale = header.optional_scale(&mut diag, "score_scale");
    let declared_count = header.optional_u64(&mut diag, "submission_count");
    let scale_declared = header.get("score_scale").is_some();

    let mut submissions = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut first_unscaled_grade: Option<Location> = None;

    for (location, object) in json_lines(SUBMISSIONS, &submissions_text, &mut diag) {
        let fields = Fields::new(&object, &location);

        let id = fields.required_str(&mut diag, "id");
        let submitter = fields.required_str(&mut diag, "student_id");
        let content = fields.required_text(&mut diag, "content");
        let prompt = fields.optional_str(&mut diag, "prompt");
        let reference = fields.optional_score(&mut diag, "grade", scale.as_ref());
        let metadata = SubmissionMetadata {
            submitted_at: fields.optional_timestamp(&mut diag, "submitted_at"),
            cohort: fields.optional_str(&mut diag, "cohort"),
            tags: fields.optional_str_array(&mut diag, "tags"),
        };

        if reference.is_some() && !scale_declared && first_unscaled_grade.is_none() {
            first_unscaled_grade = Some(location.clone());
        }

        if let Some(ref id) = id {
            match seen.entry(id.clone()) {
                Entry::Occupied(first) => {
                    diag.error(
                        &location,
                        "id",
                        format!(
                            "duplicate submission id '{}' (first defined at record {})",
                            id,
                            first.get()
                        ),
                    );
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(location.record.unwrap_or_default());
                }
            }
        }

        if let (Some(id), Some(submitter), Some(content)) = (id, submitter, content) {
            submissions.push(Submission {
                id,
                submitter,
                prompt,
                content,
                reference_score: reference.map(|(score, _)| score),
                metadata,
            });
        }
    }

    if let Some(location) = first_unscaled_grade {
        diag.error(
            &manifest_location,
            "score_scale",
            format!(
                "required when submissions carry reference grades (first at {})",
                location
            ),
        );
    }

    if let Some(expected) = declared_count {
        if expected as usize != submissions.len() && diag.errors().is_empty() {
            diag.warn(format!(
                "{}: manifest declares {} submissions but {} were found",
                path.display(),
                expected,
                submissions.len()
            ));
        }
    }

    debug!(
        "Dataset {}: {} submissions, version {}",
        path.display(),
        submissions.len(),
        version
    );

    let dataset = Dataset {
        path: path.to_path_buf(),
        version,
        task_id: task_id.unwrap_or_default(),
        description,
        scale,
        submissions,
    };

    diag.finish(path, dataset)
}

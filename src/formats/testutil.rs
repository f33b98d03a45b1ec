//! Builders for EDF/EGF fixtures used across the test suites.

use super::edf::SUBMISSIONS;
use super::egf::GRADES;
use super::MANIFEST;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write a ZIP archive with the given members.
pub fn write_archive(path: &Path, members: &[(&str, String)]) {
    let raw: Vec<(&str, &[u8])> = members
        .iter()
        .map(|(name, content)| (*name, content.as_bytes()))
        .collect();
    write_archive_bytes(path, &raw);
}

/// Write a ZIP archive whose members may hold arbitrary bytes.
pub fn write_archive_bytes(path: &Path, members: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, content) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

/// Join values into a JSON Lines document.
pub fn jsonl(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A minimal valid submission record.
pub fn submission(id: &str, grade: Option<f64>) -> Value {
    let mut value = json!({
        "id": id,
        "student_id": format!("student-{}", id),
        "content": format!("Essay text for {}.", id),
        "prompt": "Evaluate the argument."
    });
    if let Some(grade) = grade {
        value["grade"] = json!(grade);
    }
    value
}

/// A minimal valid grade record.
pub fn grade(submission_id: &str, score: f64) -> Value {
    json!({"submission_id": submission_id, "grade": score})
}

/// A valid EGF manifest for a numeric scale.
pub fn egf_manifest(algorithm: &str, min: f64, max: f64) -> Value {
    json!({
        "egf_version": "1.0",
        "description": format!("{} run", algorithm),
        "algorithm": {"name": algorithm, "version": "1.0"},
        "score_scale": {"min": min, "max": max},
        "edf_reference": {"task_id": "task-1"}
    })
}

/// Write an EDF with task id `task-1`.
pub fn write_edf(dir: &Path, name: &str, scale: Option<(f64, f64)>, submissions: &[Value]) -> PathBuf {
    let mut manifest = json!({"edf_version": "1.0", "task_id": "task-1"});
    if let Some((min, max)) = scale {
        manifest["score_scale"] = json!({"min": min, "max": max});
    }
    let path = dir.join(name);
    write_archive(
        &path,
        &[
            (MANIFEST, manifest.to_string()),
            (SUBMISSIONS, jsonl(submissions)),
        ],
    );
    path
}

/// Write an EGF holding only grades.
pub fn write_egf(
    dir: &Path,
    name: &str,
    algorithm: &str,
    scale: (f64, f64),
    grades: &[Value],
) -> PathBuf {
    let path = dir.join(name);
    write_archive(
        &path,
        &[
            (MANIFEST, egf_manifest(algorithm, scale.0, scale.1).to_string()),
            (GRADES, jsonl(grades)),
        ],
    );
    path
}

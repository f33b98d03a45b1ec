//! Error taxonomy for reading, comparing and rendering.
//!
//! Readers return [`ReadError`]; the pipeline wraps every stage failure in
//! [`PipelineError`], which also owns the mapping to process exit codes.

use crate::models::ScoreScale;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Success, including the minimal "no submissions" report.
pub const EXIT_SUCCESS: i32 = 0;
/// Runtime error: I/O, invalid arguments, configuration.
pub const EXIT_RUNTIME: i32 = 1;
/// An input container could not be parsed at all.
pub const EXIT_CORRUPT: i32 = 3;
/// An input has invalid fields or records.
pub const EXIT_FORMAT: i32 = 4;
/// An input declares a schema version this tool does not implement.
pub const EXIT_UNSUPPORTED_VERSION: i32 = 5;
/// Two grading sets declare different score scales.
pub const EXIT_SCALE_MISMATCH: i32 = 6;
/// The report could not be rendered.
pub const EXIT_RENDER: i32 = 7;

/// Where inside a container a problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Archive member, e.g. `grades.jsonl`.
    pub member: String,
    /// 1-based record (line) number, when the member holds records.
    pub record: Option<usize>,
    /// Byte offset of the record inside the member.
    pub offset: Option<usize>,
}

impl Location {
    /// Location of a whole member.
    pub fn member(member: &str) -> Self {
        Self {
            member: member.to_string(),
            record: None,
            offset: None,
        }
    }

    /// Location of one record inside a member.
    pub fn record(member: &str, record: usize, offset: usize) -> Self {
        Self {
            member: member.to_string(),
            record: Some(record),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.member)?;
        if let Some(record) = self.record {
            write!(f, " record {}", record)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (byte {})", offset)?;
        }
        Ok(())
    }
}

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub location: Location,
    /// Field path, e.g. `score_scale.max`.
    pub field: String,
    /// What was expected and what was found.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: field `{}`: {}", self.location, self.field, self.message)
    }
}

/// The container itself is unreadable: not an archive, missing members, bad encoding.
#[derive(Error, Debug)]
#[error("{}: corrupt file: {reason}", .path.display())]
pub struct CorruptFileError {
    pub path: PathBuf,
    pub reason: String,
}

/// Every invalid field found in one file, reported together.
#[derive(Error, Debug)]
pub struct FormatError {
    pub path: PathBuf,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} format error(s)",
            self.path.display(),
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

/// The declared schema version is not implemented.
#[derive(Error, Debug)]
#[error(
    "{}: unsupported {kind} version {} (supported: {})",
    .path.display(),
    .declared.as_deref().map(|v| format!("'{}'", v)).unwrap_or_else(|| "<missing>".to_string()),
    .supported.join(", ")
)]
pub struct UnsupportedVersionError {
    pub path: PathBuf,
    /// `EDF` or `EGF`.
    pub kind: &'static str,
    pub declared: Option<String>,
    pub supported: Vec<&'static str>,
}

/// Two grading sets being compared declare different scales.
#[derive(Error, Debug)]
#[error("score scale mismatch: '{left}' uses {left_scale} but '{right}' uses {right_scale}")]
pub struct ScaleMismatchError {
    pub left: String,
    pub left_scale: ScoreScale,
    pub right: String,
    pub right_scale: ScoreScale,
}

/// The report could not be rendered from the given view data.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no submissions found in the dataset")]
    NoSubmissions,

    #[error("failed to serialize embedded report data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document holds no embedded report data")]
    MissingData,
}

/// Failure of a format reader.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Corrupt(#[from] CorruptFileError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    UnsupportedVersion(#[from] UnsupportedVersionError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        CorruptFileError {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
        .into()
    }
}

/// Any failure that aborts a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    ScaleMismatch(#[from] ScaleMismatchError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("no grading files given")]
    NoGradingFiles,

    #[error("input task failed: {0}")]
    Task(String),

    #[error("failed to write report to {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Read(ReadError::Corrupt(_)) => EXIT_CORRUPT,
            PipelineError::Read(ReadError::Format(_)) => EXIT_FORMAT,
            PipelineError::Read(ReadError::UnsupportedVersion(_)) => EXIT_UNSUPPORTED_VERSION,
            PipelineError::ScaleMismatch(_) => EXIT_SCALE_MISMATCH,
            PipelineError::Render(_) => EXIT_RENDER,
            PipelineError::Read(ReadError::Io { .. })
            | PipelineError::NoGradingFiles
            | PipelineError::Task(_)
            | PipelineError::Output { .. } => EXIT_RUNTIME,
        }
    }
}

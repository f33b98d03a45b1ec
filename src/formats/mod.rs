//! Readers for Edexia dataset (EDF) and grading (EGF) files.
//!
//! Both formats are ZIP containers holding a `manifest.json` object and one
//! or more JSON Lines record members. A container that cannot be opened is a
//! [`CorruptFileError`](crate::error::CorruptFileError); everything wrong
//! inside an intact container is collected and reported as one
//! [`FormatError`](crate::error::FormatError).

pub mod diagnostics;
pub mod edf;
pub mod egf;

#[cfg(test)]
pub(crate) mod testutil;

pub use edf::read_dataset;
pub use egf::read_grading_set;

use crate::error::{Location, ReadError, UnsupportedVersionError};
use diagnostics::Diagnostics;
use serde_json::{Map, Value};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

/// Name of the manifest member in both formats.
pub const MANIFEST: &str = "manifest.json";

/// An opened container, fully read into memory.
pub(crate) struct Container {
    path: PathBuf,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl Container {
    /// Read the whole file and open it as a ZIP archive.
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());

        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ReadError::corrupt(path, format!("not a valid ZIP container: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Whether the archive holds a member with this name.
    pub fn has(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Read a required member as UTF-8 text, without a leading byte order mark.
    pub fn read_text(&mut self, name: &str) -> Result<String, ReadError> {
        if !self.has(name) {
            return Err(ReadError::corrupt(
                &self.path,
                format!("missing required member '{}'", name),
            ));
        }
        let mut member = self
            .archive
            .by_name(name)
            .map_err(|e| ReadError::corrupt(&self.path, format!("cannot open '{}': {}", name, e)))?;

        let mut bytes = Vec::new();
        member
            .read_to_end(&mut bytes)
            .map_err(|e| ReadError::corrupt(&self.path, format!("cannot read '{}': {}", name, e)))?;

        let text = String::from_utf8(bytes)
            .map_err(|e| ReadError::corrupt(&self.path, format!("'{}' is not UTF-8: {}", name, e)))?;
        Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }

    /// Read an optional member as UTF-8 text.
    pub fn read_optional_text(&mut self, name: &str) -> Result<Option<String>, ReadError> {
        if self.has(name) {
            self.read_text(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read and parse `manifest.json`, which must be a JSON object.
    pub fn manifest(&mut self) -> Result<Map<String, Value>, ReadError> {
        let text = self.read_text(MANIFEST)?;
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ReadError::corrupt(
                &self.path,
                format!("{} must be a JSON object, found {}", MANIFEST, kind(&other)),
            )),
            Err(e) => Err(ReadError::corrupt(
                &self.path,
                format!("{} is not valid JSON: {}", MANIFEST, e),
            )),
        }
    }
}

/// Check the declared schema version against the supported `MAJOR.MINOR` list.
///
/// Returns the declared version string on success.
pub(crate) fn check_version(
    path: &Path,
    kind_name: &'static str,
    manifest: &Map<String, Value>,
    field: &str,
    supported: &[&'static str],
) -> Result<String, ReadError> {
    let declared = manifest.get(field).and_then(Value::as_str);

    let accepted = declared.is_some_and(|v| {
        let mut parts = v.trim().split('.');
        let major_minor = match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("{}.{}", major, minor),
            (Some(major), None) => format!("{}.0", major),
            _ => return false,
        };
        let rest_numeric = parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        rest_numeric && supported.contains(&major_minor.as_str())
    });

    match declared {
        Some(v) if accepted => Ok(v.trim().to_string()),
        _ => Err(UnsupportedVersionError {
            path: path.to_path_buf(),
            kind: kind_name,
            declared: declared.map(String::from),
            supported: supported.to_vec(),
        }
        .into()),
    }
}

/// Split a JSON Lines member into objects, recording the location of each.
///
/// Blank lines are skipped. A line that is not a JSON object is recorded as
/// an error and left out of the result.
pub(crate) fn json_lines(
    member: &str,
    text: &str,
    diag: &mut Diagnostics,
) -> Vec<(Location, Map<String, Value>)> {
    let mut records = Vec::new();
    let mut offset = 0;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let location = Location::record(member, index + 1, offset);
        offset += line.len();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => records.push((location, map)),
            Ok(other) => diag.error(
                &location,
                "<record>",
                format!("expected a JSON object, found {}", kind(&other)),
            ),
            Err(e) => diag.error(&location, "<record>", format!("invalid JSON: {}", e)),
        }
    }

    records
}

/// Human name of a JSON value's type.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

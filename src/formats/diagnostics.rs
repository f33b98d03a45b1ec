//! Error collection for format validation.
//!
//! Readers never stop at the first bad field. Every accessor on [`Fields`]
//! records what it found wrong in a [`Diagnostics`] and returns `None`, and
//! the reader inspects the collector once at the end.

use super::kind;
use crate::error::{FieldError, FormatError, Location, ReadError};
use crate::models::{Loaded, ScoreScale};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Collected errors and warnings for one file.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<FieldError>,
    warnings: Vec<String>,
}

impl Diagnostics {
    /// Record an invalid field.
    pub fn error(&mut self, location: &Location, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            location: location.clone(),
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record a non-fatal observation.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Close the collector: the value if nothing was wrong, otherwise every error at once.
    pub fn finish<T>(self, path: &Path, value: T) -> Result<Loaded<T>, ReadError> {
        if self.errors.is_empty() {
            Ok(Loaded {
                value,
                warnings: self.warnings,
            })
        } else {
            Err(FormatError {
                path: path.to_path_buf(),
                errors: self.errors,
            }
            .into())
        }
    }
}

/// Typed access to the fields of one JSON object.
pub struct Fields<'a> {
    object: &'a Map<String, Value>,
    location: &'a Location,
    prefix: String,
}

impl<'a> Fields<'a> {
    pub fn new(object: &'a Map<String, Value>, location: &'a Location) -> Self {
        Self {
            object,
            location,
            prefix: String::new(),
        }
    }

    /// Accessor for a nested object, with field paths prefixed by `name.`.
    pub fn nested(object: &'a Map<String, Value>, location: &'a Location, name: &str) -> Self {
        Self {
            object,
            location,
            prefix: format!("{}.", name),
        }
    }

    pub fn location(&self) -> &'a Location {
        self.location
    }

    /// Full dotted path of a field.
    pub fn path(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    /// Raw value of a field; `null` counts as absent.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn wrong_type(&self, diag: &mut Diagnostics, field: &str, expected: &str, found: &Value) {
        diag.error(
            self.location,
            self.path(field),
            format!("expected {}, found {}", expected, kind(found)),
        );
    }

    fn missing(&self, diag: &mut Diagnostics, field: &str) {
        diag.error(self.location, self.path(field), "required field is missing");
    }

    /// A required, non-empty string.
    pub fn required_str(&self, diag: &mut Diagnostics, field: &str) -> Option<String> {
        match self.get(field) {
            None => {
                self.missing(diag, field);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                diag.error(self.location, self.path(field), "must be a non-empty string");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.wrong_type(diag, field, "a string", other);
                None
            }
        }
    }

    /// A required string that may be empty.
    pub fn required_text(&self, diag: &mut Diagnostics, field: &str) -> Option<String> {
        match self.get(field) {
            None => {
                self.missing(diag, field);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.wrong_type(diag, field, "a string", other);
                None
            }
        }
    }

    pub fn optional_str(&self, diag: &mut Diagnostics, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            other => {
                self.wrong_type(diag, field, "a string", other);
                None
            }
        }
    }

    /// An optional finite number.
    pub fn optional_number(&self, diag: &mut Diagnostics, field: &str) -> Option<f64> {
        let value = self.get(field)?;
        match value.as_f64() {
            Some(n) if n.is_finite() => Some(n),
            _ => {
                self.wrong_type(diag, field, "a number", value);
                None
            }
        }
    }

    /// An optional non-negative integer.
    pub fn optional_u64(&self, diag: &mut Diagnostics, field: &str) -> Option<u64> {
        let value = self.get(field)?;
        match value.as_u64() {
            Some(n) => Some(n),
            None => {
                self.wrong_type(diag, field, "a non-negative integer", value);
                None
            }
        }
    }

    /// An optional array of strings; absent means empty.
    pub fn optional_str_array(&self, diag: &mut Diagnostics, field: &str) -> Vec<String> {
        let Some(value) = self.get(field) else {
            return Vec::new();
        };
        let Value::Array(items) = value else {
            self.wrong_type(diag, field, "an array of strings", value);
            return Vec::new();
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                other => {
                    diag.error(
                        self.location,
                        format!("{}[{}]", self.path(field), i),
                        format!("expected a string, found {}", kind(other)),
                    );
                }
            }
        }
        out
    }

    /// An optional object whose values are all numbers.
    pub fn optional_number_map(&self, diag: &mut Diagnostics, field: &str) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        let Some(value) = self.get(field) else {
            return out;
        };
        let Value::Object(map) = value else {
            self.wrong_type(diag, field, "an object of numbers", value);
            return out;
        };

        for (name, v) in map {
            match v.as_f64() {
                Some(n) if n.is_finite() => {
                    out.insert(name.clone(), n);
                }
                _ => diag.error(
                    self.location,
                    format!("{}.{}", self.path(field), name),
                    format!("expected a number, found {}", kind(v)),
                ),
            }
        }
        out
    }

    /// An optional nested object.
    pub fn optional_object(&self, diag: &mut Diagnostics, field: &str) -> Option<&'a Map<String, Value>> {
        match self.get(field)? {
            Value::Object(map) => Some(map),
            other => {
                self.wrong_type(diag, field, "an object", other);
                None
            }
        }
    }

    /// An optional timestamp: RFC 3339 text or integer epoch milliseconds.
    pub fn optional_timestamp(&self, diag: &mut Diagnostics, field: &str) -> Option<DateTime<Utc>> {
        let value = self.get(field)?;
        let parsed = match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        };
        if parsed.is_none() {
            diag.error(
                self.location,
                self.path(field),
                format!(
                    "expected an RFC 3339 timestamp or epoch milliseconds, found {}",
                    kind(value)
                ),
            );
        }
        parsed
    }

    /// An optional score scale object.
    pub fn optional_scale(&self, diag: &mut Diagnostics, field: &str) -> Option<ScoreScale> {
        let object = self.optional_object(diag, field)?;
        let path = self.path(field);
        let fields = Fields::nested(object, self.location, &path);
        let before = diag.errors().len();

        let labels = fields.optional_str_array(diag, "labels");
        let min = fields.optional_number(diag, "min");
        let max = fields.optional_number(diag, "max");

        if !labels.is_empty() {
            let unique: HashSet<&str> = labels.iter().map(String::as_str).collect();
            if labels.len() < 2 {
                diag.error(self.location, fields.path("labels"), "needs at least two labels");
            } else if unique.len() != labels.len() {
                diag.error(self.location, fields.path("labels"), "labels must be unique");
            }
            let scale = ScoreScale::categorical(labels);
            if min.is_some_and(|m| m != scale.min) || max.is_some_and(|m| m != scale.max) {
                diag.error(
                    self.location,
                    path.clone(),
                    format!(
                        "min/max must be 0 and {} when labels are declared",
                        scale.max
                    ),
                );
            }
            return (diag.errors().len() == before).then_some(scale);
        }

        match (min, max) {
            (Some(min), Some(max)) if min < max => {
                (diag.errors().len() == before).then(|| ScoreScale::numeric(min, max))
            }
            (Some(min), Some(max)) => {
                diag.error(
                    self.location,
                    path,
                    format!("min ({}) must be lower than max ({})", min, max),
                );
                None
            }
            (min, max) => {
                if min.is_none() && fields.get("min").is_none() {
                    diag.error(self.location, fields.path("min"), "required field is missing");
                }
                if max.is_none() && fields.get("max").is_none() {
                    diag.error(self.location, fields.path("max"), "required field is missing");
                }
                None
            }
        }
    }

    /// A score: a number on the scale, or one of the scale's labels.
    ///
    /// Without a scale only plain numbers are accepted. Returns the numeric
    /// position and the label, if one was given.
    pub fn optional_score(
        &self,
        diag: &mut Diagnostics,
        field: &str,
        scale: Option<&ScoreScale>,
    ) -> Option<(f64, Option<String>)> {
        let value = self.get(field)?;
        match value {
            Value::Number(n) => {
                let score = n.as_f64().filter(|s| s.is_finite());
                match (score, scale) {
                    (Some(score), Some(scale)) if !scale.contains(score) => {
                        diag.error(
                            self.location,
                            self.path(field),
                            format!("score {} is outside the declared scale {}", score, scale),
                        );
                        None
                    }
                    (Some(score), _) => Some((score, None)),
                    (None, _) => {
                        self.wrong_type(diag, field, "a finite number", value);
                        None
                    }
                }
            }
            Value::String(label) => match scale.and_then(|s| s.label_position(label)) {
                Some(position) => Some((position, Some(label.clone()))),
                None => {
                    let declared = scale
                        .filter(|s| !s.labels.is_empty())
                        .map(|s| s.labels.join(", "))
                        .unwrap_or_else(|| "none".to_string());
                    diag.error(
                        self.location,
                        self.path(field),
                        format!("unknown score label '{}' (declared labels: {})", label, declared),
                    );
                    None
                }
            },
            other => {
                self.wrong_type(diag, field, "a number or a scale label", other);
                None
            }
        }
    }

    /// Like [`Fields::optional_score`], but a missing value is an error.
    pub fn required_score(
        &self,
        diag: &mut Diagnostics,
        field: &str,
        scale: Option<&ScoreScale>,
    ) -> Option<(f64, Option<String>)> {
        if self.get(field).is_none() {
            self.missing(diag, field);
            return None;
        }
        self.optional_score(diag, field, scale)
    }
}

//! Validation outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which validator rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Required,
    Type,
    Length,
    Range,
    Options,
    Pattern,
    Same,
    /// More than one candidate of a `oneOf` variant matched.
    OneOf,
}

impl ErrorKind {
    pub const ALL: [Self; 8] = [
        Self::Required,
        Self::Type,
        Self::Length,
        Self::Range,
        Self::Options,
        Self::Pattern,
        Self::Same,
        Self::OneOf,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::Length => "length",
            Self::Range => "range",
            Self::Options => "options",
            Self::Pattern => "pattern",
            Self::Same => "same",
            Self::OneOf => "one_of",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field's validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the field that failed.
    pub field: String,
    pub kind: ErrorKind,
    /// Rendered, localized message.
    pub message: String,
}

/// Result of validating one value against a field.
///
/// `value` is always the converted value, even when validation failed,
/// so callers can show the attempted input.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub value: Value,
    pub error: Option<ValidationError>,
}

impl Validation {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

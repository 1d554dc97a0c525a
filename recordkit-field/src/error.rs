//! Error types for field construction.

use thiserror::Error;

/// Result type for field construction.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while building fields from their declarations.
///
/// Validation failures are not errors; see [`crate::ValidationError`].
#[derive(Debug, Error)]
pub enum FieldError {
    /// The declared pattern is not a valid regular expression.
    #[error("field \"{field}\": invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// `item_of` was declared on a field that is neither an array nor an object.
    #[error("field \"{field}\": item shape requires an {expected} field, got {actual}")]
    ItemOfType {
        field: String,
        expected: &'static str,
        actual: String,
    },

    /// A variant field was declared without candidates.
    #[error("variant field \"{0}\" has no candidate fields")]
    EmptyVariant(String),

    /// A template set was registered without any language.
    #[error("validation message templates are empty")]
    EmptyTemplates,

    /// A language was registered without any template.
    #[error("validation message templates for lang \"{0}\" are empty")]
    EmptyLangTemplates(String),
}

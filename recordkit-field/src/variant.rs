//! Variant fields: one value checked against several candidate fields.

use std::sync::Arc;

use recordkit_types::value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field::FieldDefault;
use crate::spec::{FieldSpec, Fieldable};
use crate::templates::{ErrorContext, MessageTemplates};
use crate::validation::{ErrorKind, Validation, ValidationError};

/// How candidate results combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Combinator {
    /// At least one candidate accepts the value.
    AnyOf,
    /// Every candidate accepts the value.
    AllOf,
    /// Exactly one candidate accepts the value.
    OneOf,
}

/// Outcome of validating a variant field.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantValidation {
    /// Converted value of the first accepting candidate, or the raw value.
    pub value: Value,
    /// Per-candidate errors in declaration order. A `oneOf` with several
    /// matches has a synthetic [`ErrorKind::OneOf`] entry in front.
    pub errors: Vec<Option<ValidationError>>,
    pub valid: bool,
}

impl VariantValidation {
    /// The first candidate error, `None` when the variant accepted the value.
    #[must_use]
    pub fn error(&self) -> Option<&ValidationError> {
        if self.valid {
            return None;
        }
        self.errors.iter().flatten().next()
    }
}

#[derive(Debug, Clone)]
pub struct VariantField {
    pub(crate) name: String,
    pub(crate) label: Option<String>,
    pub(crate) required: bool,
    pub(crate) combinator: Combinator,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) always_send: bool,
    pub(crate) empty_string_is_empty: bool,
    pub(crate) templates: Arc<MessageTemplates>,
}

impl VariantField {
    #[must_use]
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    #[must_use]
    pub fn candidates(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn validate_variants(&self, v: &Value, values: &Map<String, Value>) -> VariantValidation {
        if !self.required && value::is_empty(v, self.empty_string_is_empty) {
            return VariantValidation {
                value: v.clone(),
                errors: Vec::new(),
                valid: true,
            };
        }

        let results: Vec<Validation> = self.fields.iter().map(|f| f.validate(v, values)).collect();
        let passing = results.iter().filter(|r| r.is_ok()).count();
        let mut errors: Vec<Option<ValidationError>> =
            results.iter().map(|r| r.error.clone()).collect();

        let valid = match self.combinator {
            Combinator::AnyOf => passing > 0,
            Combinator::AllOf => passing == results.len(),
            Combinator::OneOf => passing == 1,
        };
        if self.combinator == Combinator::OneOf && passing > 1 {
            errors.insert(0, Some(self.one_of_error()));
        }

        let value = self
            .fields
            .iter()
            .zip(&results)
            .find(|(_, r)| r.is_ok())
            .map_or_else(|| v.clone(), |(f, _)| f.convert_type_with_default(v));

        VariantValidation {
            value,
            errors,
            valid,
        }
    }

    fn one_of_error(&self) -> ValidationError {
        let ctx = ErrorContext::new(self.label_or_name());
        ValidationError {
            field: self.name.clone(),
            kind: ErrorKind::OneOf,
            message: self.templates.message(ErrorKind::OneOf, &ctx),
        }
    }
}

impl Fieldable for VariantField {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn always_send(&self) -> bool {
        self.always_send
    }

    fn default_value(&self) -> Value {
        self.default.as_ref().map_or(Value::Null, FieldDefault::get)
    }

    /// The converted value of the first candidate that accepts `v`, or `v`
    /// unchanged when none does.
    fn convert_type(&self, v: &Value) -> Value {
        let empty = Map::new();
        self.fields
            .iter()
            .find(|f| f.is_valid(v, &empty))
            .map_or_else(|| v.clone(), |f| f.convert_type_with_default(v))
    }

    fn validate(&self, v: &Value, values: &Map<String, Value>) -> Validation {
        let outcome = self.validate_variants(v, values);
        let error = outcome.error().cloned();
        Validation {
            value: outcome.value,
            error,
        }
    }
}

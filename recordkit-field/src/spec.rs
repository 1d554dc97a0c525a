//! The field capability shared by scalar and variant fields.

use serde_json::{Map, Value};

use crate::field::{Field, FieldOptions, FieldType};
use crate::validation::Validation;
use crate::variant::VariantField;

/// Capability interface of every field kind.
pub trait Fieldable {
    fn name(&self) -> &str;

    fn label(&self) -> Option<&str>;

    /// The label when set and non-empty, otherwise the name.
    fn label_or_name(&self) -> &str {
        self.label().filter(|l| !l.is_empty()).unwrap_or(self.name())
    }

    fn is_required(&self) -> bool;

    /// Whether the field is sent with every insert/update payload.
    fn always_send(&self) -> bool;

    /// The declared default, `null` when there is none.
    fn default_value(&self) -> Value;

    fn convert_type(&self, v: &Value) -> Value;

    /// Substitutes the default for `null`, then converts.
    fn convert_type_with_default(&self, v: &Value) -> Value {
        if v.is_null() {
            self.convert_type(&self.default_value())
        } else {
            self.convert_type(v)
        }
    }

    /// Validates `v`; `values` holds the sibling values for cross-field checks.
    fn validate(&self, v: &Value, values: &Map<String, Value>) -> Validation;

    fn is_valid(&self, v: &Value, values: &Map<String, Value>) -> bool {
        self.validate(v, values).is_ok()
    }
}

/// A declared field of either kind.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Scalar(Field),
    Variant(VariantField),
}

impl FieldSpec {
    #[must_use]
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Self::Scalar(f) => Some(f),
            Self::Variant(_) => None,
        }
    }

    #[must_use]
    pub fn as_variant(&self) -> Option<&VariantField> {
        match self {
            Self::Scalar(_) => None,
            Self::Variant(v) => Some(v),
        }
    }

    /// Declared type of a scalar field; variants have none.
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        self.as_field().and_then(Field::field_type)
    }

    #[must_use]
    pub fn options(&self) -> Option<&FieldOptions> {
        self.as_field().and_then(Field::options)
    }

    fn inner(&self) -> &dyn Fieldable {
        match self {
            Self::Scalar(f) => f,
            Self::Variant(v) => v,
        }
    }
}

impl Fieldable for FieldSpec {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn label(&self) -> Option<&str> {
        self.inner().label()
    }

    fn is_required(&self) -> bool {
        self.inner().is_required()
    }

    fn always_send(&self) -> bool {
        self.inner().always_send()
    }

    fn default_value(&self) -> Value {
        self.inner().default_value()
    }

    fn convert_type(&self, v: &Value) -> Value {
        self.inner().convert_type(v)
    }

    fn convert_type_with_default(&self, v: &Value) -> Value {
        self.inner().convert_type_with_default(v)
    }

    fn validate(&self, v: &Value, values: &Map<String, Value>) -> Validation {
        self.inner().validate(v, values)
    }
}

impl From<Field> for FieldSpec {
    fn from(f: Field) -> Self {
        Self::Scalar(f)
    }
}

impl From<VariantField> for FieldSpec {
    fn from(v: VariantField) -> Self {
        Self::Variant(v)
    }
}

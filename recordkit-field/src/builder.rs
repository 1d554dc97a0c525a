//! Fluent field declarations.
//!
//! Builders are plain data until [`FieldBuilder::build`] binds them to a
//! name and a [`BuildEnv`], compiling patterns and resolving nested item
//! shapes. The resulting fields are immutable.

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::{FieldError, FieldResult};
use crate::field::{Field, FieldDefault, FieldOptions, FieldType, ItemOf};
use crate::spec::FieldSpec;
use crate::templates::MessageTemplates;
use crate::variant::{Combinator, VariantField};

/// Settings shared by every field of a schema.
#[derive(Debug, Clone)]
pub struct BuildEnv {
    pub templates: Arc<MessageTemplates>,
    /// Default for fields that do not set it explicitly.
    pub empty_string_is_empty: bool,
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self {
            templates: Arc::new(MessageTemplates::english()),
            empty_string_is_empty: true,
        }
    }
}

/// Either kind of field builder.
#[derive(Debug, Clone)]
pub enum AnyFieldBuilder {
    Field(FieldBuilder),
    Variant(VariantFieldBuilder),
}

impl AnyFieldBuilder {
    pub fn build(self, name: impl Into<String>, env: &BuildEnv) -> FieldResult<FieldSpec> {
        match self {
            Self::Field(b) => b.build(name, env),
            Self::Variant(b) => b.build(name, env),
        }
    }

    fn label(&self) -> Option<&str> {
        match self {
            Self::Field(b) => b.label.as_deref(),
            Self::Variant(b) => b.label.as_deref(),
        }
    }

    fn with_label(self, label: Option<String>) -> Self {
        match (self, label) {
            (Self::Field(b), Some(l)) => Self::Field(b.label(l)),
            (Self::Variant(b), Some(l)) => Self::Variant(b.label(l)),
            (other, None) => other,
        }
    }
}

impl From<FieldBuilder> for AnyFieldBuilder {
    fn from(b: FieldBuilder) -> Self {
        Self::Field(b)
    }
}

impl From<VariantFieldBuilder> for AnyFieldBuilder {
    fn from(b: VariantFieldBuilder) -> Self {
        Self::Variant(b)
    }
}

#[derive(Debug, Clone)]
enum ItemOfBuilder {
    Each(Box<AnyFieldBuilder>),
    Members(IndexMap<String, AnyFieldBuilder>),
}

/// Builder for a scalar, array or object [`Field`].
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    label: Option<String>,
    required: bool,
    field_type: Option<FieldType>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<String>,
    options: Option<FieldOptions>,
    same: Option<String>,
    same_label: Option<String>,
    default: Option<FieldDefault>,
    item_of: Option<ItemOfBuilder>,
    always_send: bool,
    empty_string_is_empty: Option<bool>,
}

impl Default for FieldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldBuilder {
    /// A required, untyped field.
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: None,
            required: true,
            field_type: None,
            min: None,
            max: None,
            pattern: None,
            options: None,
            same: None,
            same_label: None,
            default: None,
            item_of: None,
            always_send: false,
            empty_string_is_empty: None,
        }
    }

    #[must_use]
    pub fn of_type(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::of_type(FieldType::String)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::of_type(FieldType::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::of_type(FieldType::Boolean)
    }

    #[must_use]
    pub fn array() -> Self {
        Self::of_type(FieldType::Array)
    }

    #[must_use]
    pub fn object() -> Self {
        Self::of_type(FieldType::Object)
    }

    #[must_use]
    pub fn untyped() -> Self {
        Self::new()
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        self.required(false)
    }

    /// Minimum length (strings) or value (numbers).
    #[must_use]
    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Maximum length (strings) or value (numbers).
    #[must_use]
    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    /// Regular expression the value must match somewhere. Anchor it for a
    /// full match.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl Into<FieldOptions>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// The value must equal the value of sibling field `other`.
    #[must_use]
    pub fn same(mut self, other: impl Into<String>) -> Self {
        self.same = Some(other.into());
        self
    }

    #[must_use]
    pub fn same_label(mut self, label: impl Into<String>) -> Self {
        self.same_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Default computed on every use.
    #[must_use]
    pub fn default_with(mut self, produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(FieldDefault::Producer(Arc::new(produce)));
        self
    }

    /// Shape of every array element.
    #[must_use]
    pub fn item_of(mut self, item: impl Into<AnyFieldBuilder>) -> Self {
        self.item_of = Some(ItemOfBuilder::Each(Box::new(item.into())));
        self
    }

    /// Shape of one object member.
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, member: impl Into<AnyFieldBuilder>) -> Self {
        let mut members = match self.item_of.take() {
            Some(ItemOfBuilder::Members(members)) => members,
            _ => IndexMap::new(),
        };
        members.insert(name.into(), member.into());
        self.item_of = Some(ItemOfBuilder::Members(members));
        self
    }

    #[must_use]
    pub fn members<I, K, B>(self, members: I) -> Self
    where
        I: IntoIterator<Item = (K, B)>,
        K: Into<String>,
        B: Into<AnyFieldBuilder>,
    {
        members
            .into_iter()
            .fold(self, |builder, (name, member)| builder.member(name, member))
    }

    #[must_use]
    pub fn always_send(mut self) -> Self {
        self.always_send = true;
        self
    }

    #[must_use]
    pub fn empty_string_is_empty(mut self, yes: bool) -> Self {
        self.empty_string_is_empty = Some(yes);
        self
    }

    pub fn build(self, name: impl Into<String>, env: &BuildEnv) -> FieldResult<FieldSpec> {
        self.build_field(name, env).map(FieldSpec::Scalar)
    }

    pub fn build_field(self, name: impl Into<String>, env: &BuildEnv) -> FieldResult<Field> {
        let name = name.into();

        let pattern = self
            .pattern
            .map(|p| Regex::new(&p))
            .transpose()
            .map_err(|source| FieldError::InvalidPattern {
                field: name.clone(),
                source,
            })?;

        let actual = self.field_type.map_or("untyped", FieldType::name);
        let item_of = match self.item_of {
            None => None,
            Some(ItemOfBuilder::Each(item)) => {
                if self.field_type != Some(FieldType::Array) {
                    return Err(FieldError::ItemOfType {
                        field: name,
                        expected: "array",
                        actual: actual.to_string(),
                    });
                }
                let item = item.build(name.clone(), env)?;
                Some(ItemOf::Each(Box::new(item)))
            }
            Some(ItemOfBuilder::Members(members)) => {
                if self.field_type != Some(FieldType::Object) {
                    return Err(FieldError::ItemOfType {
                        field: name,
                        expected: "object",
                        actual: actual.to_string(),
                    });
                }
                let built = members
                    .into_iter()
                    .map(|(key, member)| member.build(key.clone(), env).map(|spec| (key, spec)))
                    .collect::<FieldResult<IndexMap<_, _>>>()?;
                Some(ItemOf::Members(built))
            }
        };

        Ok(Field {
            name,
            label: self.label,
            required: self.required,
            field_type: self.field_type,
            min: self.min,
            max: self.max,
            pattern,
            options: self.options,
            same: self.same,
            same_label: self.same_label,
            default: self.default,
            item_of,
            always_send: self.always_send,
            empty_string_is_empty: self
                .empty_string_is_empty
                .unwrap_or(env.empty_string_is_empty),
            templates: Arc::clone(&env.templates),
        })
    }
}

/// Builder for a [`VariantField`].
#[derive(Debug, Clone)]
pub struct VariantFieldBuilder {
    combinator: Combinator,
    fields: Vec<AnyFieldBuilder>,
    label: Option<String>,
    required: bool,
    default: Option<FieldDefault>,
    always_send: bool,
}

impl VariantFieldBuilder {
    fn with(combinator: Combinator, fields: impl IntoIterator<Item = AnyFieldBuilder>) -> Self {
        Self {
            combinator,
            fields: fields.into_iter().collect(),
            label: None,
            required: true,
            default: None,
            always_send: false,
        }
    }

    pub fn any_of(fields: impl IntoIterator<Item = AnyFieldBuilder>) -> Self {
        Self::with(Combinator::AnyOf, fields)
    }

    pub fn all_of(fields: impl IntoIterator<Item = AnyFieldBuilder>) -> Self {
        Self::with(Combinator::AllOf, fields)
    }

    pub fn one_of(fields: impl IntoIterator<Item = AnyFieldBuilder>) -> Self {
        Self::with(Combinator::OneOf, fields)
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        self.required(false)
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    #[must_use]
    pub fn always_send(mut self) -> Self {
        self.always_send = true;
        self
    }

    pub fn build(self, name: impl Into<String>, env: &BuildEnv) -> FieldResult<FieldSpec> {
        self.build_variant(name, env).map(FieldSpec::Variant)
    }

    /// Candidates share the variant's name and inherit its label unless
    /// they declare their own.
    pub fn build_variant(self, name: impl Into<String>, env: &BuildEnv) -> FieldResult<VariantField> {
        let name = name.into();
        if self.fields.is_empty() {
            return Err(FieldError::EmptyVariant(name));
        }
        let fields = self
            .fields
            .into_iter()
            .map(|candidate| {
                let candidate = if candidate.label().is_some() {
                    candidate
                } else {
                    candidate.with_label(self.label.clone())
                };
                candidate.build(name.clone(), env)
            })
            .collect::<FieldResult<Vec<_>>>()?;

        Ok(VariantField {
            name,
            label: self.label,
            required: self.required,
            combinator: self.combinator,
            fields,
            default: self.default,
            always_send: self.always_send,
            empty_string_is_empty: env.empty_string_is_empty,
            templates: Arc::clone(&env.templates),
        })
    }
}

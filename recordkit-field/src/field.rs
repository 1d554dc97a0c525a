//! Scalar, array and object fields.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use recordkit_types::value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::{FieldSpec, Fieldable};
use crate::templates::{ErrorContext, MessageTemplates};
use crate::validation::{ErrorKind, Validation, ValidationError};

/// Declared type of a field. A field without a type accepts any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl FieldType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    /// Returns true when `v` is of this type.
    #[must_use]
    pub const fn matches(self, v: &Value) -> bool {
        matches!(
            (self, v),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Array, Value::Array(_))
                | (Self::Object, Value::Object(_))
                | (Self::Null, Value::Null)
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value of a field: a constant or a zero-arg producer.
#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    #[must_use]
    pub fn get(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Enumerated allowed values.
///
/// A list allows its members; a map allows its keys and carries a display
/// label per key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOptions {
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl FieldOptions {
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn contains(&self, v: &Value) -> bool {
        match self {
            Self::List(items) => items.iter().any(|item| value::strict_eq(item, v)),
            Self::Map(entries) => option_key(v).is_some_and(|k| entries.contains_key(k.as_ref())),
        }
    }

    /// Display form of an allowed value: the map label, or the value
    /// itself for list options. `None` when the value is not allowed.
    #[must_use]
    pub fn display(&self, v: &Value) -> Option<Value> {
        match self {
            Self::List(_) => self.contains(v).then(|| v.clone()),
            Self::Map(entries) => option_key(v).and_then(|k| entries.get(k.as_ref()).cloned()),
        }
    }
}

impl From<Vec<Value>> for FieldOptions {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<String, Value>> for FieldOptions {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

fn option_key(v: &Value) -> Option<Cow<'_, str>> {
    match v {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// Shape of array elements or object members.
#[derive(Debug, Clone)]
pub enum ItemOf {
    /// Every array element is validated against this field.
    Each(Box<FieldSpec>),
    /// Each declared member of an object is validated against its field.
    Members(IndexMap<String, FieldSpec>),
}

/// A typed, validatable value descriptor.
///
/// Built once per declared field and shared by every record of the
/// entity type. Validation never mutates the field.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) label: Option<String>,
    pub(crate) required: bool,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) options: Option<FieldOptions>,
    pub(crate) same: Option<String>,
    pub(crate) same_label: Option<String>,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) item_of: Option<ItemOf>,
    pub(crate) always_send: bool,
    pub(crate) empty_string_is_empty: bool,
    pub(crate) templates: Arc<MessageTemplates>,
}

impl Field {
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> Option<&FieldOptions> {
        self.options.as_ref()
    }

    #[must_use]
    pub fn same(&self) -> Option<&str> {
        self.same.as_deref()
    }

    #[must_use]
    pub fn same_label_or_name(&self) -> Option<&str> {
        self.same_label
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.same.as_deref())
    }

    #[must_use]
    pub fn item_of(&self) -> Option<&ItemOf> {
        self.item_of.as_ref()
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Returns true when `v` counts as not provided for this field.
    #[must_use]
    pub fn is_empty_value(&self, v: &Value) -> bool {
        value::is_empty(v, self.empty_string_is_empty)
    }

    fn convert_number(v: &Value) -> Value {
        match v {
            Value::Bool(b) => Value::from(u8::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::from(i)
                } else {
                    value::as_number(v).map_or_else(|| v.clone(), value::number_value)
                }
            }
            _ => v.clone(),
        }
    }

    fn convert_string(v: &Value) -> Value {
        match v {
            Value::Null => Value::String(String::new()),
            Value::String(_) => v.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => Value::String(other.to_string()),
        }
    }

    fn convert_array(&self, v: &Value) -> Value {
        let items: Vec<Value> = match v {
            Value::Null => return Value::Null,
            Value::Array(items) => items.clone(),
            Value::Object(members) => members.values().cloned().collect(),
            scalar => vec![scalar.clone()],
        };
        match &self.item_of {
            Some(ItemOf::Each(item)) => Value::Array(
                items
                    .iter()
                    .map(|i| item.convert_type_with_default(i))
                    .collect(),
            ),
            _ => Value::Array(items),
        }
    }

    fn convert_object(&self, v: &Value) -> Value {
        match (v, &self.item_of) {
            (Value::Object(obj), Some(ItemOf::Members(members))) => {
                let mut out = obj.clone();
                for (key, member) in members {
                    let current = obj.get(key).unwrap_or(&Value::Null);
                    out.insert(key.clone(), member.convert_type_with_default(current));
                }
                Value::Object(out)
            }
            _ => v.clone(),
        }
    }

    fn context(&self, v: &Value) -> ErrorContext {
        ErrorContext {
            label_or_name: self.label_or_name().to_string(),
            min: self.min,
            max: self.max,
            same_label_or_name: self.same_label_or_name().map(str::to_string),
            expected_type: self.field_type.map(|t| t.name().to_string()),
            current_type: Some(value::type_name(v).to_string()),
            pattern: self.pattern.as_ref().map(|p| p.as_str().to_string()),
        }
    }

    fn fail(&self, kind: ErrorKind, v: &Value) -> ValidationError {
        ValidationError {
            field: self.name.clone(),
            kind,
            message: self.templates.message(kind, &self.context(v)),
        }
    }

    fn out_of_bounds(&self, n: f64) -> bool {
        self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max)
    }

    fn check(&self, v: &Value, values: &Map<String, Value>) -> Result<(), ValidationError> {
        if self.is_empty_value(v) {
            return if self.required {
                Err(self.fail(ErrorKind::Required, v))
            } else {
                Ok(())
            };
        }

        if let Some(expected) = self.field_type {
            if !expected.matches(v) {
                return Err(self.fail(ErrorKind::Type, v));
            }
        }

        let untyped_or = |t: FieldType| self.field_type.is_none_or(|ft| ft == t);
        match v {
            Value::String(s) if untyped_or(FieldType::String) => {
                if self.out_of_bounds(s.chars().count() as f64) {
                    return Err(self.fail(ErrorKind::Length, v));
                }
            }
            Value::Number(n) if untyped_or(FieldType::Number) => {
                if n.as_f64().is_some_and(|n| self.out_of_bounds(n)) {
                    return Err(self.fail(ErrorKind::Range, v));
                }
            }
            _ => {}
        }

        if let Some(options) = &self.options {
            if !options.contains(v) {
                return Err(self.fail(ErrorKind::Options, v));
            }
        }

        if let Some(pattern) = &self.pattern {
            let text = match v {
                Value::String(s) => Cow::Borrowed(s.as_str()),
                other => Cow::Owned(other.to_string()),
            };
            if !pattern.is_match(&text) {
                return Err(self.fail(ErrorKind::Pattern, v));
            }
        }

        if let Some(other) = &self.same {
            let matches = values.get(other).is_some_and(|o| value::loose_eq(v, o));
            if !matches {
                return Err(self.fail(ErrorKind::Same, v));
            }
        }

        match (v, &self.item_of) {
            (Value::Array(items), Some(ItemOf::Each(item))) => {
                for element in items {
                    if let Some(err) = item.validate(element, values).error {
                        return Err(self.nested(err));
                    }
                }
            }
            (Value::Object(obj), Some(ItemOf::Members(members))) => {
                for (key, member) in members {
                    let current = obj.get(key).unwrap_or(&Value::Null);
                    if let Some(err) = member.validate(current, obj).error {
                        return Err(self.nested(err));
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Re-targets a nested item failure at this field.
    fn nested(&self, err: ValidationError) -> ValidationError {
        ValidationError {
            field: self.name.clone(),
            ..err
        }
    }
}

impl Fieldable for Field {
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

    /// Coerces `v` to the field's type.
    ///
    /// Empty values of optional fields pass through. `null` never becomes a
    /// non-empty value: strings map it to `""`, other types keep it.
    fn convert_type(&self, v: &Value) -> Value {
        if !self.required && self.is_empty_value(v) {
            return v.clone();
        }
        match self.field_type {
            Some(FieldType::String) => Self::convert_string(v),
            Some(FieldType::Number) => Self::convert_number(v),
            Some(FieldType::Boolean) if !v.is_null() => Value::Bool(value::truthy(v)),
            Some(FieldType::Array) => self.convert_array(v),
            Some(FieldType::Object) => self.convert_object(v),
            _ => v.clone(),
        }
    }

    /// Runs `required → type → length → range → options → pattern → same →
    /// items`; the first failing validator wins.
    fn validate(&self, v: &Value, values: &Map<String, Value>) -> Validation {
        let converted = self.convert_type(v);
        let error = self.check(&converted, values).err();
        Validation {
            value: converted,
            error,
        }
    }
}

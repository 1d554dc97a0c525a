//! Field visibility.
//!
//! The validation scope of a record depends on which fields are currently
//! displayed. [`DisplayRules`] supplies that list; [`ConditionalDisplay`]
//! is a small rule table for the common "show B when A equals x" case.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use recordkit_field::Fieldable;
use recordkit_types::value;
use serde_json::Value;

use crate::record::Record;

pub trait DisplayRules: Send + Sync {
    /// Names of the fields currently shown for `record`. `None` means every
    /// declared field is shown.
    fn displayed_fields(&self, record: &Record) -> Option<Vec<String>>;
}

/// Visibility condition of one field.
#[derive(Clone)]
pub enum DisplayRule {
    /// Shown when `parent`, converted through its field, equals `value`.
    WhenEquals { parent: String, value: Value },
    Predicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl DisplayRule {
    fn holds(&self, record: &Record) -> bool {
        match self {
            Self::WhenEquals { parent, value } => match record.schema().fields().get(parent) {
                Some(field) => value::strict_eq(
                    &field.convert_type(record.value(parent)),
                    &field.convert_type(value),
                ),
                None => value::strict_eq(record.value(parent), value),
            },
            Self::Predicate(check) => check(record),
        }
    }
}

impl fmt::Debug for DisplayRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WhenEquals { parent, value } => f
                .debug_struct("WhenEquals")
                .field("parent", parent)
                .field("value", value)
                .finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Fields without a rule are always shown.
#[derive(Debug, Clone, Default)]
pub struct ConditionalDisplay {
    rules: IndexMap<String, DisplayRule>,
}

impl ConditionalDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn when_equals(
        mut self,
        field: impl Into<String>,
        parent: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.rules.insert(
            field.into(),
            DisplayRule::WhenEquals {
                parent: parent.into(),
                value: value.into(),
            },
        );
        self
    }

    #[must_use]
    pub fn when(
        mut self,
        field: impl Into<String>,
        check: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.rules
            .insert(field.into(), DisplayRule::Predicate(Arc::new(check)));
        self
    }

    /// Whether `field` is shown for `record`.
    #[must_use]
    pub fn is_displayed(&self, field: &str, record: &Record) -> bool {
        self.rules.get(field).is_none_or(|rule| rule.holds(record))
    }
}

impl DisplayRules for ConditionalDisplay {
    fn displayed_fields(&self, record: &Record) -> Option<Vec<String>> {
        Some(
            record
                .schema()
                .fields()
                .keys()
                .filter(|name| self.is_displayed(name, record))
                .cloned()
                .collect(),
        )
    }
}

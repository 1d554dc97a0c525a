//! Entity instances.
//!
//! A [`Record`] holds the current values of one entity instance, a
//! snapshot taken at the last clean point and the errors of the last
//! validation. It has two independent axes of state:
//!
//! - persistence: new until the primary-key field holds a key
//! - cleanliness: dirty when current values differ from the snapshot
//!
//! A record that has never been snapshotted is dirty.

use std::collections::BTreeMap;
use std::sync::Arc;

use recordkit_field::{Fieldable, ValidationError};
use recordkit_types::{RecordKey, value};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::relation::Relation;
use crate::schema::EntitySchema;

static NULL: Value = Value::Null;

#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<EntitySchema>,
    values: Map<String, Value>,
    state: Option<Map<String, Value>>,
    errors: Vec<ValidationError>,
}

/// `null` and `""` are interchangeable for dirty checks.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

type RelatedIndex<'a> = (BTreeMap<RecordKey, Option<&'a Value>>, Vec<&'a Value>);

/// Splits a relation value into keyed entries (by foreign primary key) and
/// entries without a usable key.
fn related_index<'a>(v: &'a Value, primary: &str) -> RelatedIndex<'a> {
    fn add<'a>(item: &'a Value, primary: &str, index: &mut RelatedIndex<'a>) {
        if is_blank(item) {
            return;
        }
        match item {
            Value::Object(obj) => match obj.get(primary).and_then(RecordKey::from_value) {
                Some(key) => {
                    index.0.insert(key, Some(item));
                }
                None => index.1.push(item),
            },
            scalar => match RecordKey::from_value(scalar) {
                Some(key) => {
                    index.0.entry(key).or_insert(None);
                }
                None => index.1.push(item),
            },
        }
    }

    let mut index = (BTreeMap::new(), Vec::new());
    match v {
        Value::Array(items) => items.iter().for_each(|item| add(item, primary, &mut index)),
        other => add(other, primary, &mut index),
    }
    index
}

impl Record {
    /// A record with every field at its default.
    #[must_use]
    pub fn new(schema: Arc<EntitySchema>) -> Self {
        Self::from_map(schema, &Map::new())
    }

    /// A record filled from `data`. See [`fill_fields`](Self::fill_fields).
    #[must_use]
    pub fn from_map(schema: Arc<EntitySchema>, data: &Map<String, Value>) -> Self {
        let mut record = Self {
            schema,
            values: Map::new(),
            state: None,
            errors: Vec::new(),
        };
        record.fill_fields(data);
        record
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        self.schema.name()
    }

    /// Current value of `name`, `null` when unset or undeclared.
    #[must_use]
    pub fn value(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&NULL)
    }

    /// Current value of a declared field or relation.
    pub fn get(&self, name: &str) -> ModelResult<&Value> {
        self.ensure_declared(name)?;
        Ok(self.value(name))
    }

    /// Assigns a declared field (converted to its type) or relation (as given).
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> ModelResult<()> {
        let value = value.into();
        let value = match self.schema.fields().get(name) {
            Some(field) => field.convert_type(&value),
            None if self.schema.relation(name).is_some() => value,
            None => return Err(self.unknown(name)),
        };
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Value of the primary-key field.
    #[must_use]
    pub fn id(&self) -> &Value {
        self.value(self.schema.primary_key())
    }

    /// Collection key, `None` while the record is new.
    #[must_use]
    pub fn key(&self) -> Option<RecordKey> {
        RecordKey::from_value(self.id())
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        let pk = self.schema.primary_key().to_string();
        self.values.insert(pk, id.into());
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.key().is_none()
    }

    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The snapshot taken by the last [`save_state`](Self::save_state).
    #[must_use]
    pub fn state(&self) -> Option<&Map<String, Value>> {
        self.state.as_ref()
    }

    /// Snapshots every declared field and relation.
    pub fn save_state(&mut self) {
        let snapshot = self
            .declared_names()
            .map(|name| (name.clone(), self.value(name).clone()))
            .collect();
        self.state = Some(snapshot);
    }

    fn declared_names(&self) -> impl Iterator<Item = &String> {
        self.schema
            .fields()
            .keys()
            .chain(self.schema.relations().keys())
    }

    fn state_value(&self, name: &str) -> &Value {
        self.state
            .as_ref()
            .and_then(|s| s.get(name))
            .unwrap_or(&NULL)
    }

    fn unknown(&self, name: &str) -> ModelError {
        ModelError::UnknownField {
            entity: self.entity().to_string(),
            name: name.to_string(),
        }
    }

    fn ensure_declared(&self, name: &str) -> ModelResult<()> {
        if self.schema.is_declared(name) {
            Ok(())
        } else {
            Err(self.unknown(name))
        }
    }

    fn field_changed(&self, name: &str) -> bool {
        let current = self.value(name);
        let before = self.state_value(name);
        if is_blank(current) && is_blank(before) {
            return false;
        }
        !value::strict_eq(current, before)
    }

    /// Related records are identified by the foreign primary key; a record
    /// present on both sides is changed when its embedded content differs.
    fn related_changed(&self, relation: &Relation) -> bool {
        let (current, current_keyless) =
            related_index(self.value(&relation.name), &relation.foreign_primary);
        let (before, before_keyless) =
            related_index(self.state_value(&relation.name), &relation.foreign_primary);

        if !current.keys().eq(before.keys()) {
            return true;
        }
        let content_changed = current.iter().any(|(key, now)| {
            matches!(
                (now, before.get(key)),
                (Some(now), Some(Some(then))) if !value::strict_eq(now, then)
            )
        });
        if content_changed {
            return true;
        }
        current_keyless.len() != before_keyless.len()
            || current_keyless
                .iter()
                .zip(&before_keyless)
                .any(|(a, b)| !value::strict_eq(a, b))
    }

    /// Whether field `name` differs from the snapshot.
    pub fn is_dirty_field(&self, name: &str) -> ModelResult<bool> {
        self.schema.field(name)?;
        Ok(self.field_changed(name))
    }

    /// Whether the records of relation `name` differ from the snapshot.
    pub fn is_dirty_related(&self, name: &str) -> ModelResult<bool> {
        let relation = self.schema.require_relation(name)?;
        Ok(self.related_changed(relation))
    }

    #[must_use]
    pub fn dirty_fields(&self) -> Vec<String> {
        self.schema
            .fields()
            .keys()
            .filter(|name| self.field_changed(name))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn dirty_relateds(&self) -> Vec<String> {
        self.schema
            .relations()
            .values()
            .filter(|relation| self.related_changed(relation))
            .map(|relation| relation.name.clone())
            .collect()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.is_none()
            || self.schema.fields().keys().any(|name| self.field_changed(name))
            || self
                .schema
                .relations()
                .values()
                .any(|relation| self.related_changed(relation))
    }

    /// Values of every dirty field and relation.
    #[must_use]
    pub fn dirty_data(&self) -> Map<String, Value> {
        self.dirty_fields()
            .into_iter()
            .chain(self.dirty_relateds())
            .map(|name| {
                let v = self.value(&name).clone();
                (name, v)
            })
            .collect()
    }

    /// The payload sent on insert/update: dirty data plus every
    /// `always_send` field.
    #[must_use]
    pub fn send_data(&self) -> Map<String, Value> {
        let mut data = self.dirty_data();
        for (name, field) in self.schema.fields() {
            if field.always_send() && !data.contains_key(name) {
                data.insert(name.clone(), self.value(name).clone());
            }
        }
        data
    }

    /// Failures of the last [`validate`](Self::validate).
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Fields validated when no explicit list is given.
    ///
    /// Persisted records check dirty and `always_send` fields that are
    /// displayed; new records check dirty fields and every displayed field.
    #[must_use]
    pub fn validation_scope(&self) -> Vec<String> {
        let displayed = self
            .schema
            .display()
            .and_then(|rules| rules.displayed_fields(self));
        let shown = |name: &str| {
            displayed
                .as_ref()
                .is_none_or(|names| names.iter().any(|n| n == name))
        };
        let is_new = self.is_new();

        self.schema
            .fields()
            .iter()
            .filter(|(name, field)| {
                let dirty = self.field_changed(name);
                if is_new {
                    dirty || shown(name.as_str())
                } else {
                    (dirty || field.always_send()) && shown(name.as_str())
                }
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Validates `names` (or the default scope) against the current values.
    ///
    /// Replaces [`errors`](Self::errors) and reports each failure to the
    /// entity's `on_validation_error` hook. Returns whether all passed.
    pub fn validate(&mut self, names: Option<&[&str]>) -> ModelResult<bool> {
        let scope = match names {
            Some(names) => {
                for name in names {
                    self.schema.field(name)?;
                }
                names.iter().map(|n| (*n).to_string()).collect()
            }
            None => self.validation_scope(),
        };

        let schema = Arc::clone(&self.schema);
        let mut errors = Vec::new();
        for name in &scope {
            let field = schema.field(name)?;
            if let Some(err) = field.validate(self.value(name), &self.values).error {
                schema.hooks().on_validation_error(schema.name(), &err);
                errors.push(err);
            }
        }
        self.errors = errors;
        Ok(self.errors.is_empty())
    }

    /// Restores `names` (or every field and relation) from the snapshot.
    pub fn rollback_changes(&mut self, names: Option<&[&str]>) -> ModelResult<()> {
        let names: Vec<String> = match names {
            Some(names) => {
                for name in names {
                    self.ensure_declared(name)?;
                }
                names.iter().map(|n| (*n).to_string()).collect()
            }
            None => self.declared_names().cloned().collect(),
        };
        for name in names {
            let restored = self.state_value(&name).clone();
            self.values.insert(name, restored);
        }
        Ok(())
    }

    /// Restores `names` (or every field) from the snapshot, leaving the
    /// primary key untouched. Used to drop input of fields that are no
    /// longer displayed.
    pub fn clear_fields(&mut self, names: Option<&[&str]>) -> ModelResult<Vec<String>> {
        let names: Vec<String> = match names {
            Some(names) => {
                for name in names {
                    self.schema.field(name)?;
                }
                names.iter().map(|n| (*n).to_string()).collect()
            }
            None => self.schema.fields().keys().cloned().collect(),
        };
        let pk = self.schema.primary_key().to_string();
        for name in &names {
            if *name != pk {
                let restored = self.state_value(name).clone();
                self.values.insert(name.clone(), restored);
            }
        }
        Ok(names)
    }

    /// User-facing value of a field: the option label for fields with
    /// options, the value itself otherwise.
    pub fn display_value(&self, name: &str) -> ModelResult<Value> {
        let field = self.schema.field(name)?;
        let current = self.value(name);
        Ok(match field.options() {
            Some(options) => options.display(current).unwrap_or(Value::Null),
            None => current.clone(),
        })
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Sets every declared field from `data` (converted, defaults for
    /// missing values) and copies every relation present in `data`.
    pub fn fill_fields(&mut self, data: &Map<String, Value>) {
        let schema = Arc::clone(&self.schema);
        for (name, field) in schema.fields() {
            let raw = data.get(name).unwrap_or(&NULL);
            self.values
                .insert(name.clone(), field.convert_type_with_default(raw));
        }
        for name in schema.relations().keys() {
            if let Some(related) = data.get(name) {
                self.values.insert(name.clone(), related.clone());
            }
        }
    }

    /// Attaches resolved related data and marks it clean.
    pub(crate) fn attach_related(&mut self, name: &str, related: Value) {
        if let Some(state) = self.state.as_mut() {
            state.insert(name.to_string(), related.clone());
        }
        self.values.insert(name.to_string(), related);
    }
}

//! Record construction, storage and the save/delete lifecycle.
//!
//! Entities with `use_api` send inserts, updates and deletes to the
//! gateway and let the reply hydrate the store. Local-only entities apply
//! the change immediately, as if the call had succeeded.

use std::slice;
use std::sync::Arc;

use recordkit_types::{RecordKey, value};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LocalIds;
use crate::error::{ModelError, ModelResult};
use crate::gateway::{ApiResponse, RequestId};
use crate::record::Record;
use crate::registry::{FetchCallback, Registry};
use crate::schema::EntitySchema;

/// Result of [`Registry::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed since the last snapshot; nothing was sent.
    Clean,
    /// Validation failed; see `Record::errors`.
    Invalid,
    /// Stored locally and snapshotted.
    Saved,
    /// Sent to the gateway; the reply hydrates the store.
    Requested(RequestId),
}

impl Registry {
    /// Builds a record of `entity` from `data` without storing it.
    ///
    /// Related payloads embedded in `data` are stored in their own
    /// entities' collections as fetched (clean) records.
    pub fn make(&mut self, entity: &str, data: &Value) -> ModelResult<Record> {
        let schema = Arc::clone(self.schema(entity)?);
        let empty = Map::new();
        let map = data.as_object().unwrap_or(&empty);
        let record = Record::from_map(Arc::clone(&schema), map);
        self.absorb_related(&schema, map)?;
        Ok(record)
    }

    /// Re-fills `record` from `data`, storing embedded related payloads.
    pub fn fill(&mut self, record: &mut Record, data: &Value) -> ModelResult<()> {
        let schema = Arc::clone(record.schema());
        let empty = Map::new();
        let map = data.as_object().unwrap_or(&empty);
        record.fill_fields(map);
        self.absorb_related(&schema, map)
    }

    fn absorb_related(&mut self, schema: &EntitySchema, data: &Map<String, Value>) -> ModelResult<()> {
        for (name, relation) in schema.relations() {
            let rows: Vec<Value> = match data.get(name) {
                Some(Value::Array(items)) => items.iter().filter(|i| i.is_object()).cloned().collect(),
                Some(item @ Value::Object(_)) => vec![item.clone()],
                _ => continue,
            };
            if !rows.is_empty() {
                self.insert_or_update_value(&relation.foreign_entity, &Value::Array(rows), true)?;
            }
        }
        Ok(())
    }

    /// Builds a record from `data` and schedules it as locally authored:
    /// inserted when it has no id, updated otherwise.
    pub fn create(&mut self, entity: &str, data: &Value) -> ModelResult<Record> {
        let record = self.make(entity, data)?;
        self.insert_or_update(record, false)
    }

    fn mint_key(&self, entity: &str) -> RecordKey {
        match self.config.local_ids {
            LocalIds::Sequential => RecordKey::next_after(&self.store.keys(entity)),
            LocalIds::Uuid => RecordKey::generate(),
        }
    }

    fn store_record(&mut self, record: &Record) {
        if let Some(key) = record.key() {
            self.store.put(record.entity(), key, record.clone());
        }
    }

    /// Stores or sends `record`.
    ///
    /// With `after_fetch` the record came from the gateway: it is
    /// snapshotted and stored as is. Otherwise a remote entity sends an
    /// insert (no id) or update (id) call, and a local-only entity mints a
    /// key if needed, snapshots and stores.
    pub fn insert_or_update(&mut self, mut record: Record, after_fetch: bool) -> ModelResult<Record> {
        let schema = Arc::clone(record.schema());
        let entity = schema.name();

        if after_fetch {
            record.save_state();
            self.store_record(&record);
            return Ok(record);
        }

        match (record.key(), schema.use_api()) {
            (Some(_), true) => {
                self.store_record(&record);
                let mut args = record.send_data();
                args.insert(schema.primary_key().to_string(), record.id().clone());
                self.fetch_update(entity, Value::Object(args), None)?;
            }
            (None, true) => {
                self.fetch_insert(entity, Value::Object(record.send_data()), None)?;
            }
            (key, false) => {
                if key.is_none() {
                    record.set_id(self.mint_key(entity).to_value());
                }
                record.save_state();
                self.store_record(&record);
            }
        }
        Ok(record)
    }

    /// [`insert_or_update`](Self::insert_or_update) over an object or an
    /// array of objects. Non-object array items are skipped.
    pub fn insert_or_update_value(
        &mut self,
        entity: &str,
        data: &Value,
        after_fetch: bool,
    ) -> ModelResult<Vec<Record>> {
        let items: Vec<&Value> = match data {
            Value::Array(items) => items.iter().filter(|i| i.is_object()).collect(),
            Value::Object(_) => vec![data],
            other => {
                return Err(ModelError::InvalidPayload {
                    entity: entity.to_string(),
                    found: value::type_name(other),
                });
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let record = self.make(entity, item)?;
            records.push(self.insert_or_update(record, after_fetch)?);
        }
        Ok(records)
    }

    /// Inserts a record that has no id yet.
    pub fn insert(&mut self, record: Record) -> ModelResult<Record> {
        if !record.is_new() {
            return Err(ModelError::AlreadyPersisted {
                entity: record.entity().to_string(),
                id: record.id().to_string(),
            });
        }
        self.insert_or_update(record, false)
    }

    /// Updates a record that already has an id.
    pub fn update(&mut self, record: Record) -> ModelResult<Record> {
        if record.is_new() {
            return Err(ModelError::NotPersisted(record.entity().to_string()));
        }
        self.insert_or_update(record, false)
    }

    /// Validates and persists the changes of `record`.
    ///
    /// Runs the before/after insert or update hooks around the operation.
    /// A remote entity only sends the call; `record` keeps its local state
    /// and the store is updated when the reply is dispatched. A local-only
    /// entity gets its id (when new), is snapshotted and stored, and
    /// `callback` runs immediately.
    pub fn save(
        &mut self,
        record: &mut Record,
        callback: Option<FetchCallback>,
    ) -> ModelResult<SaveOutcome> {
        if !record.is_dirty() {
            return Ok(SaveOutcome::Clean);
        }
        let schema = Arc::clone(record.schema());
        let hooks = Arc::clone(schema.hooks());
        let entity = schema.name();
        let is_new = record.is_new();

        if is_new {
            hooks.before_insert(record);
        } else {
            hooks.before_update(record);
        }
        if !record.validate(None)? {
            debug!(entity, errors = record.errors().len(), "save rejected by validation");
            return Ok(SaveOutcome::Invalid);
        }

        let outcome = if schema.use_api() {
            let mut args = record.send_data();
            let request = if is_new {
                self.fetch_insert(entity, Value::Object(args), callback)?
            } else {
                args.insert(schema.primary_key().to_string(), record.id().clone());
                self.fetch_update(entity, Value::Object(args), callback)?
            };
            SaveOutcome::Requested(request)
        } else {
            if is_new {
                record.set_id(self.mint_key(entity).to_value());
            }
            record.save_state();
            self.store_record(record);
            if let Some(mut callback) = callback {
                callback(&record.to_json(), slice::from_ref(&*record), &ApiResponse::ok());
            }
            SaveOutcome::Saved
        };

        if is_new {
            hooks.after_insert(record);
        } else {
            hooks.after_update(record);
        }
        Ok(outcome)
    }

    /// Removes `record` from the store and, for remote entities, sends the
    /// delete call. Returns the request id when a call was sent.
    pub fn delete(
        &mut self,
        record: &Record,
        callback: Option<FetchCallback>,
    ) -> ModelResult<Option<RequestId>> {
        let schema = Arc::clone(record.schema());
        let hooks = Arc::clone(schema.hooks());
        let entity = schema.name();

        hooks.before_delete(record);
        let key = record.key();
        if let Some(key) = &key {
            if self.store.remove(entity, key).is_err() {
                debug!(entity, %key, "deleted record was not loaded");
            }
        }

        let request = match key {
            Some(_) if schema.use_api() => {
                let mut args = Map::new();
                args.insert(schema.primary_key().to_string(), record.id().clone());
                Some(self.fetch_delete(entity, Value::Object(args), callback)?)
            }
            _ => {
                if let Some(mut callback) = callback {
                    callback(&Value::Null, &[], &ApiResponse::ok());
                }
                None
            }
        };

        hooks.after_delete(record);
        Ok(request)
    }

    /// Removes a loaded record without hooks or gateway calls.
    pub fn delete_by_key(&mut self, entity: &str, key: &RecordKey) -> ModelResult<Record> {
        self.schema(entity)?;
        Ok(self.store.remove(entity, key)?)
    }
}

use std::collections::HashMap;

use indexmap::IndexMap;
use recordkit_types::RecordKey;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// The records of one entity type.
#[derive(Debug, Clone)]
pub struct Collection<R> {
    records: IndexMap<RecordKey, R>,
    total_rows: u64,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            records: IndexMap::new(),
            total_rows: 0,
        }
    }
}

impl<R> Collection<R> {
    #[must_use]
    pub fn get(&self, key: &RecordKey) -> Option<&R> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &RecordKey) -> Option<&mut R> {
        self.records.get_mut(key)
    }

    /// Stores `record`, returning the one it replaced.
    pub fn put(&mut self, key: RecordKey, record: R) -> Option<R> {
        self.records.insert(key, record)
    }

    pub fn remove(&mut self, key: &RecordKey) -> Option<R> {
        self.records.shift_remove(key)
    }

    #[must_use]
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &R)> {
        self.records.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.records.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn set_total_rows(&mut self, total: u64) {
        self.total_rows = total;
    }
}

/// Per-entity-type collections.
#[derive(Debug, Clone)]
pub struct CollectionStore<R> {
    collections: HashMap<String, Collection<R>>,
}

impl<R> Default for CollectionStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CollectionStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }

    #[must_use]
    pub fn collection(&self, entity: &str) -> Option<&Collection<R>> {
        self.collections.get(entity)
    }

    /// Returns the collection of `entity`, creating it when missing.
    pub fn collection_mut(&mut self, entity: &str) -> &mut Collection<R> {
        self.collections.entry(entity.to_string()).or_default()
    }

    #[must_use]
    pub fn get(&self, entity: &str, key: &RecordKey) -> Option<&R> {
        self.collection(entity)?.get(key)
    }

    pub fn get_mut(&mut self, entity: &str, key: &RecordKey) -> Option<&mut R> {
        self.collections.get_mut(entity)?.get_mut(key)
    }

    /// Like [`get`](Self::get), but a missing record is an error.
    pub fn require(&self, entity: &str, key: &RecordKey) -> StoreResult<&R> {
        self.collection(entity)
            .ok_or_else(|| StoreError::UnknownCollection(entity.to_string()))?
            .get(key)
            .ok_or_else(|| StoreError::NotFound {
                entity: entity.to_string(),
                key: key.clone(),
            })
    }

    pub fn put(&mut self, entity: &str, key: RecordKey, record: R) -> Option<R> {
        self.collection_mut(entity).put(key, record)
    }

    pub fn remove(&mut self, entity: &str, key: &RecordKey) -> StoreResult<R> {
        let removed = self
            .collections
            .get_mut(entity)
            .and_then(|c| c.remove(key))
            .ok_or_else(|| StoreError::NotFound {
                entity: entity.to_string(),
                key: key.clone(),
            })?;
        debug!(entity, key = %key, "record removed from collection");
        Ok(removed)
    }

    #[must_use]
    pub fn contains(&self, entity: &str, key: &RecordKey) -> bool {
        self.collection(entity).is_some_and(|c| c.contains(key))
    }

    #[must_use]
    pub fn len(&self, entity: &str) -> usize {
        self.collection(entity).map_or(0, Collection::len)
    }

    /// Keys of `entity` in collection order.
    #[must_use]
    pub fn keys(&self, entity: &str) -> Vec<RecordKey> {
        self.collection(entity)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn values<'a>(&'a self, entity: &str) -> impl Iterator<Item = &'a R> + use<'a, R> {
        self.collection(entity).into_iter().flat_map(Collection::values)
    }

    #[must_use]
    pub fn total_rows(&self, entity: &str) -> u64 {
        self.collection(entity).map_or(0, Collection::total_rows)
    }

    pub fn set_total_rows(&mut self, entity: &str, total: u64) {
        self.collection_mut(entity).set_total_rows(total);
    }

    /// Drops every record of `entity` and resets its counter.
    pub fn clear(&mut self, entity: &str) {
        if let Some(c) = self.collections.remove(entity) {
            debug!(entity, records = c.len(), "collection cleared");
        }
    }

    /// Entity types with a collection, sorted.
    #[must_use]
    pub fn entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

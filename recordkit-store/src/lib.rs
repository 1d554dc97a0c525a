//! In-memory collection store.
//!
//! Holds every loaded record, grouped per entity type into an ordered
//! key → record map, plus a per-entity "total rows" counter reported by
//! the remote source for pagination.
//!
//! # Ordering
//!
//! Records iterate in insertion order. Re-writing an existing key keeps
//! its slot; removal preserves the order of the remaining records.

mod collection;
mod error;

pub use collection::{Collection, CollectionStore};
pub use error::{StoreError, StoreResult};

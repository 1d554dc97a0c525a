//! Error types for the collection store.

use recordkit_types::RecordKey;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No collection has been created for the entity type.
    #[error("no collection for entity \"{0}\"")]
    UnknownCollection(String),

    /// The collection holds no record under the key.
    #[error("{entity} {key} not found")]
    NotFound { entity: String, key: RecordKey },
}

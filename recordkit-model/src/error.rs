//! Error types for the model layer.
//!
//! Every variant is a programmer or wiring error raised at the call site.
//! Validation failures are reported through [`crate::Record::errors`].

use recordkit_field::FieldError;
use recordkit_store::StoreError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("entity \"{0}\" is not registered")]
    UnknownEntity(String),

    #[error("entity \"{0}\" is registered twice")]
    DuplicateEntity(String),

    #[error("field \"{name}\" is not declared on entity \"{entity}\"")]
    UnknownField { entity: String, name: String },

    #[error("relation \"{name}\" is not declared on entity \"{entity}\"")]
    UnknownRelation { entity: String, name: String },

    #[error("\"{name}\" is declared both as a field and as a relation on entity \"{entity}\"")]
    DuplicateName { entity: String, name: String },

    #[error("entity \"{0}\" has no api routes")]
    NoRoutes(String),

    #[error("entity \"{entity}\" has no api route \"{route}\"")]
    UnknownRoute { entity: String, route: String },

    #[error("no api gateway provided for entity \"{0}\"")]
    MissingGateway(String),

    #[error("{entity} record already has id {id}")]
    AlreadyPersisted { entity: String, id: String },

    #[error("{0} record has no id")]
    NotPersisted(String),

    #[error("{entity} payload must be an object or an array of objects, {found} given")]
    InvalidPayload { entity: String, found: &'static str },

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("unknown comparator \"{0}\"")]
    UnknownComparator(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

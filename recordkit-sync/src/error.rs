//! Error types for the gateway layer.

use recordkit_model::ModelError;
use serde_json::{Value, json};
use thiserror::Error;

/// Result type for gateway operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A segment of a dotted route path has no entry.
    #[error("Api endpoint \"{part}\" for route path \"{path}\" not found")]
    EndpointNotFound { part: String, path: String },

    /// The route path names a group of endpoints rather than one.
    #[error("Api route path \"{0}\" names a group, not an endpoint")]
    NotAnEndpoint(String),

    /// Malformed request arguments or a missing row.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Backend misconfiguration, such as an unknown mock table.
    #[error("{0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// HTTP-like status of the error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::EndpointNotFound { .. } | Self::NotAnEndpoint(_) | Self::NotFound(_) => 404,
            Self::Internal(_) | Self::Serialization(_) => 500,
        }
    }

    /// The `{ "error": message }` reply body.
    #[must_use]
    pub fn to_reply(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<SyncError> for ModelError {
    fn from(e: SyncError) -> Self {
        ModelError::Gateway(e.to_string())
    }
}

//! Core type definitions for recordkit.
//!
//! This crate defines the small, schema-agnostic pieces every other crate
//! builds on:
//! - [`RecordKey`]: a primary-key value usable as a collection key
//! - [`value`]: helpers over `serde_json::Value` (emptiness, equality,
//!   ordering, truthiness) shared by validation, dirty tracking and queries
//!
//! Field, relation and record types live in their own crates.

mod key;
pub mod value;

pub use key::RecordKey;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Record keys.
//!
//! A record's primary-key value is arbitrary JSON on the wire, but only
//! integers and non-empty strings identify a record inside a collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::{Error, value};

/// Primary-key value of a stored record.
///
/// Integral numbers (including integral floats) map to [`RecordKey::Int`];
/// strings map to [`RecordKey::Str`]. `1` and `"1"` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Str(String),
}

impl RecordKey {
    /// Extracts a key from a JSON value. Returns `None` for empty or
    /// non-scalar values.
    #[must_use]
    pub fn from_value(v: &Value) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Creates a new string key from a time-ordered UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self::Str(Uuid::now_v7().to_string())
    }

    /// Returns the integer key following the largest integer key in `keys`,
    /// or `1` when there is none.
    pub fn next_after<'a>(keys: impl IntoIterator<Item = &'a RecordKey>) -> Self {
        let max = keys
            .into_iter()
            .filter_map(|k| match k {
                Self::Int(i) => Some(*i),
                Self::Str(_) => None,
            })
            .max()
            .unwrap_or(0);
        Self::Int(max.saturating_add(1))
    }

    /// Converts the key back into its JSON form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Returns true for integer keys.
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl TryFrom<&Value> for RecordKey {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) if !s.is_empty() => Ok(Self::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Self::Int(i));
                }
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Self::Int(f as i64))
                    }
                    _ => Ok(Self::Str(n.to_string())),
                }
            }
            other => Err(Error::InvalidKey(format!(
                "{} cannot identify a record",
                value::type_name(other)
            ))),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<RecordKey> for Value {
    fn from(key: RecordKey) -> Self {
        key.to_value()
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

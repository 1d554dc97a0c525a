//! Multi-section `$data` reply bodies.

use serde_json::{Map, Value};

/// Builds `{ "$data": [{ rows, totalRows, type? }, ...] }`.
///
/// A section without a `type` hydrates the entity that made the call.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    sections: Vec<Value>,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section. `total_rows` defaults to the number of rows.
    #[must_use]
    pub fn push_rows(mut self, rows: Vec<Value>, total_rows: Option<u64>, entity: Option<&str>) -> Self {
        let total = total_rows.unwrap_or(rows.len() as u64);
        let mut section = Map::new();
        section.insert("rows".into(), Value::Array(rows));
        section.insert("totalRows".into(), Value::from(total));
        if let Some(entity) = entity {
            section.insert("type".into(), Value::from(entity));
        }
        self.sections.push(Value::Object(section));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn build(self) -> Value {
        let mut body = Map::new();
        body.insert("$data".into(), Value::Array(self.sections));
        Value::Object(body)
    }
}

//! In-memory mock backend.
//!
//! [`MockApi`] keeps named tables of JSON rows and answers the five
//! conventional routes (`list`, `one`, `insert`, `update`, `delete`) the
//! way a real backend would: successful replies are `$data` bodies built
//! with [`ResponseBuilder`], failures are `{ "error": message }` bodies
//! carrying the error's status code.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use recordkit_model::{ApiResponse, Comparator, Replier};
use recordkit_types::value;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::endpoints::Endpoints;
use crate::error::{SyncError, SyncResult};
use crate::response::ResponseBuilder;

/// Named tables of rows behind a mutex, shareable across handlers.
#[derive(Debug, Default)]
pub struct MockApi {
    tables: Mutex<IndexMap<String, Vec<Value>>>,
}

impl MockApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table. A non-array value becomes a one-row table.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, rows: Value) -> Self {
        if let Ok(tables) = self.tables.get_mut() {
            tables.insert(name.into(), into_rows(rows));
        }
        self
    }

    /// Replaces (or adds) a table.
    pub fn set_table(&self, name: impl Into<String>, rows: Value) -> SyncResult<()> {
        self.lock()?.insert(name.into(), into_rows(rows));
        Ok(())
    }

    /// A copy of the table's rows.
    pub fn table(&self, name: &str) -> SyncResult<Vec<Value>> {
        let tables = self.lock()?;
        rows_of(&tables, name).cloned()
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, IndexMap<String, Vec<Value>>>> {
        self.tables
            .lock()
            .map_err(|_| SyncError::Internal("mock tables lock poisoned".into()))
    }

    /// Lists rows.
    ///
    /// `args.filters` may carry `wheres` (`{column, condition, value}` or an
    /// array of them; `condition` defaults to `=`), `search` (case-insensitive
    /// substring over string columns) and `orders` (`{column, desc}` list,
    /// the last entry is the primary key). `totalRows` counts the filtered
    /// rows before `limit`/`page` slicing; `page` is 1-based.
    pub fn list(&self, name: &str, args: &Value) -> SyncResult<Value> {
        debug!(table = name, %args, "mock list");
        let tables = self.lock()?;
        let mut rows: Vec<&Value> = rows_of(&tables, name)?.iter().collect();

        if let Some(filters) = args.get("filters") {
            if let Some(wheres) = filters.get("wheres") {
                let conditions = parse_wheres(wheres)?;
                rows.retain(|row| {
                    conditions
                        .iter()
                        .all(|(column, op, expected)| op.test(column_of(row, column), expected))
                });
            }
            if let Some(search) = filters.get("search").and_then(Value::as_str) {
                let needle = search.to_lowercase();
                if !needle.is_empty() {
                    rows.retain(|row| row_mentions(row, &needle));
                }
            }
            if let Some(orders) = filters.get("orders") {
                for (column, desc) in parse_orders(orders)? {
                    rows.sort_by(|a, b| {
                        let ord = value::sort_cmp(column_of(a, &column), column_of(b, &column));
                        if desc { ord.reverse() } else { ord }
                    });
                }
            }
        }

        let total = rows.len() as u64;
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(0) as usize;
        let page: Vec<Value> = if limit > 0 {
            let page = args.get("page").and_then(Value::as_u64).unwrap_or(1).max(1) as usize;
            rows.into_iter()
                .skip((page - 1).saturating_mul(limit))
                .take(limit)
                .cloned()
                .collect()
        } else {
            rows.into_iter().cloned().collect()
        };

        Ok(ResponseBuilder::new().push_rows(page, Some(total), None).build())
    }

    /// Returns the row with `args.id`.
    pub fn one(&self, name: &str, args: &Value) -> SyncResult<Value> {
        debug!(table = name, %args, "mock one");
        let tables = self.lock()?;
        let rows = rows_of(&tables, name)?;
        let id = required_id(args)?;
        let row = rows[position(rows, id)?].clone();
        Ok(single_row(row, rows.len()))
    }

    /// Appends `args` as a row, minting an id when none is given: the
    /// largest numeric id plus one, or a UUID when the table already uses
    /// string ids.
    pub fn insert(&self, name: &str, args: &Value) -> SyncResult<Value> {
        debug!(table = name, %args, "mock insert");
        let mut tables = self.lock()?;
        let rows = rows_of_mut(&mut tables, name)?;
        let Value::Object(fields) = args else {
            return Err(SyncError::BadRequest(format!(
                "insert payload must be an object, {} given",
                value::type_name(args)
            )));
        };
        let mut row = fields.clone();
        let id = match row.get("id").filter(|id| !value::is_empty(id, true)) {
            Some(id) => {
                if position(rows, id).is_ok() {
                    return Err(SyncError::BadRequest(format!(
                        "record with id={} already exists",
                        id_text(id)
                    )));
                }
                id.clone()
            }
            None => mint_id(rows),
        };
        row.insert("id".into(), id);
        rows.push(Value::Object(row.clone()));
        Ok(single_row(Value::Object(row), rows.len()))
    }

    /// Merges `args` into the row with `args.id`.
    pub fn update(&self, name: &str, args: &Value) -> SyncResult<Value> {
        debug!(table = name, %args, "mock update");
        let mut tables = self.lock()?;
        let rows = rows_of_mut(&mut tables, name)?;
        let id = required_id(args)?;
        let index = position(rows, id)?;
        if let (Value::Object(row), Value::Object(changes)) = (&mut rows[index], args) {
            for (k, v) in changes {
                row.insert(k.clone(), v.clone());
            }
        }
        let row = rows[index].clone();
        Ok(single_row(row, rows.len()))
    }

    /// Removes the row with `args.id`.
    pub fn remove(&self, name: &str, args: &Value) -> SyncResult<Value> {
        debug!(table = name, %args, "mock remove");
        let mut tables = self.lock()?;
        let rows = rows_of_mut(&mut tables, name)?;
        let id = required_id(args)?;
        let index = position(rows, id)?;
        rows.remove(index);
        Ok(ResponseBuilder::new()
            .push_rows(Vec::new(), Some(rows.len() as u64), None)
            .build())
    }

    /// Turns an operation result into a reply body and response.
    #[must_use]
    pub fn respond(result: SyncResult<Value>) -> (Value, ApiResponse) {
        match result {
            Ok(body) => (body, ApiResponse::ok()),
            Err(e) => {
                debug!(error = %e, status = e.status(), "mock error reply");
                (e.to_reply(), ApiResponse::with_status(e.status(), e.to_string()))
            }
        }
    }

    /// Wires `<table>.list/one/insert/update/delete` onto `endpoints`.
    #[must_use]
    pub fn mount(self: &Arc<Self>, table: &str, mut endpoints: Endpoints) -> Endpoints {
        type Op = fn(&MockApi, &str, &Value) -> SyncResult<Value>;
        let ops: [(&str, Op); 5] = [
            ("list", MockApi::list),
            ("one", MockApi::one),
            ("insert", MockApi::insert),
            ("update", MockApi::update),
            ("delete", MockApi::remove),
        ];
        for (route, op) in ops {
            let api = Arc::clone(self);
            let name = table.to_string();
            endpoints.insert(
                &format!("{table}.{route}"),
                Arc::new(move |args: Value, replier: Replier| {
                    let (data, response) = MockApi::respond(op(&api, &name, &args));
                    replier.reply(data, response)
                }),
            );
        }
        endpoints
    }
}

fn into_rows(rows: Value) -> Vec<Value> {
    match rows {
        Value::Array(rows) => rows,
        other => vec![other],
    }
}

fn rows_of<'t>(tables: &'t IndexMap<String, Vec<Value>>, name: &str) -> SyncResult<&'t Vec<Value>> {
    tables
        .get(name)
        .ok_or_else(|| SyncError::Internal(format!("mock table \"{name}\" does not exist")))
}

fn rows_of_mut<'t>(
    tables: &'t mut IndexMap<String, Vec<Value>>,
    name: &str,
) -> SyncResult<&'t mut Vec<Value>> {
    tables
        .get_mut(name)
        .ok_or_else(|| SyncError::Internal(format!("mock table \"{name}\" does not exist")))
}

fn column_of<'v>(row: &'v Value, column: &str) -> &'v Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn required_id(args: &Value) -> SyncResult<&Value> {
    args.get("id")
        .filter(|id| !value::is_empty(id, true))
        .ok_or_else(|| SyncError::BadRequest("record id is required".into()))
}

fn position(rows: &[Value], id: &Value) -> SyncResult<usize> {
    rows.iter()
        .position(|row| value::strict_eq(column_of(row, "id"), id))
        .ok_or_else(|| SyncError::BadRequest(format!("record with id={} not found", id_text(id))))
}

fn mint_id(rows: &[Value]) -> Value {
    let ids = rows.iter().map(|row| column_of(row, "id"));
    let mut max = 0.0_f64;
    for id in ids {
        match value::as_number(id) {
            Some(n) => max = max.max(n),
            None if id.is_string() => return Value::String(Uuid::new_v4().to_string()),
            None => {}
        }
    }
    value::number_value(max.floor() + 1.0)
}

fn single_row(row: Value, total: usize) -> Value {
    ResponseBuilder::new()
        .push_rows(vec![row], Some(total as u64), None)
        .build()
}

fn row_mentions(row: &Value, needle: &str) -> bool {
    row.as_object()
        .into_iter()
        .flat_map(Map::values)
        .filter_map(Value::as_str)
        .any(|s| s.to_lowercase().contains(needle))
}

fn parse_wheres(wheres: &Value) -> SyncResult<Vec<(String, Comparator, Value)>> {
    let list = match wheres {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    list.iter()
        .map(|w| {
            let column = w
                .get("column")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| SyncError::BadRequest("where condition needs a column".into()))?;
            let op = match w.get("condition").and_then(Value::as_str) {
                Some(symbol) => symbol
                    .parse::<Comparator>()
                    .map_err(|e| SyncError::BadRequest(e.to_string()))?,
                None => Comparator::default(),
            };
            let expected = w.get("value").cloned().unwrap_or(Value::Null);
            Ok((column.to_string(), op, expected))
        })
        .collect()
}

fn parse_orders(orders: &Value) -> SyncResult<Vec<(String, bool)>> {
    let list = match orders {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    list.iter()
        .map(|o| {
            let column = o
                .get("column")
                .and_then(Value::as_str)
                .ok_or_else(|| SyncError::BadRequest("order needs a column".into()))?;
            let desc = o.get("desc").is_some_and(value::truthy);
            Ok((column.to_string(), desc))
        })
        .collect()
}

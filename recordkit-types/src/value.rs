//! Helpers over `serde_json::Value`.
//!
//! Field values are plain JSON. These functions give validation, dirty
//! tracking and query evaluation one shared notion of emptiness, equality
//! and ordering. Numbers always compare by numeric value, so `20` and
//! `20.0` are equal.

use serde_json::Value;
use std::cmp::Ordering;

/// Returns the JSON type name of a value.
#[must_use]
pub const fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true when the value counts as "not provided".
///
/// `null` is always empty; `""` is empty only when `empty_string` is set.
#[must_use]
pub fn is_empty(v: &Value, empty_string: bool) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => empty_string && s.is_empty(),
        _ => false,
    }
}

/// JavaScript-style truthiness.
#[must_use]
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerces a value to a number the way relational comparisons do:
/// numbers as-is, booleans as 0/1, numeric strings parsed.
#[must_use]
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// Builds a JSON number, preferring an integer representation when the
/// float has no fractional part.
#[must_use]
pub fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

/// Deep structural equality with numeric normalization.
#[must_use]
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| strict_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| strict_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Loose equality: like [`strict_eq`] but numbers, numeric strings and
/// booleans compare by numeric value.
#[must_use]
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            strict_eq(a, b)
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Relational comparison used by `>`, `>=`, `<`, `<=`.
///
/// Two strings compare lexicographically; otherwise both sides are coerced
/// with [`as_number`]. Returns `None` when the values are not comparable,
/// which makes every relational predicate false.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Null, _) | (_, Value::Null) => None,
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting: values of different JSON types order by
/// type (`null < boolean < number < string < array < object`), values of
/// the same type by content.
#[must_use]
pub fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => xs
            .iter()
            .zip(ys)
            .map(|(x, y)| sort_cmp(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| xs.len().cmp(&ys.len())),
        (Value::Object(xs), Value::Object(ys)) => xs.len().cmp(&ys.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Returns true when `haystack` is an array containing a value equal
/// ([`strict_eq`]) to `needle`.
#[must_use]
pub fn array_contains(haystack: &Value, needle: &Value) -> bool {
    haystack
        .as_array()
        .is_some_and(|items| items.iter().any(|item| strict_eq(item, needle)))
}

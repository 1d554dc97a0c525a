//! Row predicates.
//!
//! A [`Filter`] accumulates predicates, each tagged as AND or OR. The two
//! groups are independent disjuncts: a row passes when every AND predicate
//! holds, or when at least one OR predicate holds. Nesting is done with
//! groups, not with per-predicate precedence.

use std::fmt;
use std::str::FromStr;

use recordkit_types::value;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::record::Record;

/// Column comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparator {
    /// `=`
    #[default]
    Eq,
    /// `==`
    LooseEq,
    /// `!=`
    LooseNe,
    /// `!==`
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::LooseEq => "==",
            Self::LooseNe => "!=",
            Self::Ne => "!==",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Applies the operator with the column value on the left.
    #[must_use]
    pub fn test(self, left: &Value, right: &Value) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => value::strict_eq(left, right),
            Self::LooseEq => value::loose_eq(left, right),
            Self::LooseNe => !value::loose_eq(left, right),
            Self::Ne => !value::strict_eq(left, right),
            Self::Gt => matches!(value::compare(left, right), Some(Greater)),
            Self::Ge => matches!(value::compare(left, right), Some(Greater | Equal)),
            Self::Lt => matches!(value::compare(left, right), Some(Less)),
            Self::Le => matches!(value::compare(left, right), Some(Less | Equal)),
        }
    }
}

impl FromStr for Comparator {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        Ok(match s {
            "=" => Self::Eq,
            "==" => Self::LooseEq,
            "!=" => Self::LooseNe,
            "!==" => Self::Ne,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "<" => Self::Lt,
            "<=" => Self::Le,
            other => return Err(ModelError::UnknownComparator(other.to_string())),
        })
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type ValueTest = Box<dyn Fn(&Value) -> bool + Send + Sync>;
type RowTest = Box<dyn Fn(&Record) -> bool + Send + Sync>;

enum Condition {
    Compare {
        column: String,
        op: Comparator,
        value: Value,
    },
    Value {
        column: String,
        test: ValueTest,
    },
    Row(RowTest),
    Group(Filter),
}

impl Condition {
    fn holds(&self, row: &Record) -> bool {
        match self {
            Self::Compare { column, op, value } => op.test(row.value(column), value),
            Self::Value { column, test } => test(row.value(column)),
            Self::Row(test) => test(row),
            Self::Group(filter) => filter.matches(row),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { column, op, value } => write!(f, "{column} {op} {value}"),
            Self::Value { column, .. } => write!(f, "{column} <fn>"),
            Self::Row(_) => f.write_str("<row fn>"),
            Self::Group(filter) => write!(f, "({filter:?})"),
        }
    }
}

#[derive(Debug)]
struct Where {
    condition: Condition,
    is_or: bool,
}

/// An accumulated predicate list.
#[derive(Debug, Default)]
pub struct Filter {
    wheres: Vec<Where>,
}

fn members(values: impl IntoIterator<Item = impl Into<Value>>) -> Vec<Value> {
    values.into_iter().map(Into::into).collect()
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wheres.is_empty()
    }

    fn push(&mut self, condition: Condition, is_or: bool) -> &mut Self {
        self.wheres.push(Where { condition, is_or });
        self
    }

    fn compare(column: &str, op: Comparator, value: impl Into<Value>) -> Condition {
        Condition::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    fn membership(column: &str, values: Vec<Value>, inside: bool) -> Condition {
        Condition::Value {
            column: column.to_string(),
            test: Box::new(move |v| values.iter().any(|m| value::strict_eq(v, m)) == inside),
        }
    }

    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push(Self::compare(column, Comparator::Eq, value), false)
    }

    pub fn where_op(&mut self, column: &str, op: Comparator, value: impl Into<Value>) -> &mut Self {
        self.push(Self::compare(column, op, value), false)
    }

    pub fn or_where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push(Self::compare(column, Comparator::Eq, value), true)
    }

    pub fn or_where_op(
        &mut self,
        column: &str,
        op: Comparator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(Self::compare(column, op, value), true)
    }

    /// A predicate over the whole row.
    pub fn where_fn(&mut self, test: impl Fn(&Record) -> bool + Send + Sync + 'static) -> &mut Self {
        self.push(Condition::Row(Box::new(test)), false)
    }

    pub fn or_where_fn(
        &mut self,
        test: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.push(Condition::Row(Box::new(test)), true)
    }

    /// A predicate over one column's value.
    pub fn where_value_fn(
        &mut self,
        column: &str,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.push(
            Condition::Value {
                column: column.to_string(),
                test: Box::new(test),
            },
            false,
        )
    }

    /// A nested filter evaluated as one AND predicate.
    pub fn where_group(&mut self, build: impl FnOnce(&mut Filter)) -> &mut Self {
        let mut nested = Filter::new();
        build(&mut nested);
        self.push(Condition::Group(nested), false)
    }

    pub fn or_where_group(&mut self, build: impl FnOnce(&mut Filter)) -> &mut Self {
        let mut nested = Filter::new();
        build(&mut nested);
        self.push(Condition::Group(nested), true)
    }

    pub fn where_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> &mut Self {
        self.push(Self::membership(column, members(values), true), false)
    }

    pub fn or_where_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> &mut Self {
        self.push(Self::membership(column, members(values), true), true)
    }

    pub fn where_not_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> &mut Self {
        self.push(Self::membership(column, members(values), false), false)
    }

    pub fn or_where_not_in(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> &mut Self {
        self.push(Self::membership(column, members(values), false), true)
    }

    /// `where_in` over a JSON array, failing on an empty column name or
    /// a non-array value list.
    pub fn where_in_value(&mut self, column: &str, values: &Value) -> ModelResult<&mut Self> {
        if column.is_empty() {
            return Err(ModelError::MalformedQuery(
                "where_in column must be a non-empty name".to_string(),
            ));
        }
        let Value::Array(items) = values else {
            return Err(ModelError::MalformedQuery(format!(
                "where_in values for \"{column}\" must be an array, {} given",
                value::type_name(values)
            )));
        };
        Ok(self.push(Self::membership(column, items.clone(), true), false))
    }

    /// Whether `row` passes. An empty filter passes everything.
    #[must_use]
    pub fn matches(&self, row: &Record) -> bool {
        if self.wheres.is_empty() {
            return true;
        }
        let (ors, ands): (Vec<&Where>, Vec<&Where>) = self.wheres.iter().partition(|w| w.is_or);

        let and_pass = !ands.is_empty() && ands.iter().all(|w| w.condition.holds(row));
        and_pass || ors.iter().any(|w| w.condition.holds(row))
    }
}

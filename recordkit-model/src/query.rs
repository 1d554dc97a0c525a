//! Queries over the records held by a [`Registry`].
//!
//! A query filters the stored records of one entity, sorts them, slices
//! them and attaches requested relations. It reads the store only; the
//! returned records are copies.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use recordkit_types::value;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ModelResult;
use crate::filter::{Comparator, Filter};
use crate::record::Record;
use crate::registry::Registry;
use crate::relation::{Relation, RelationKind};
use crate::schema::EntitySchema;

/// Row shape returned by [`Query::get_as`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// One column's value per row.
    Column(String),
    /// An array of column values per row.
    Columns(Vec<String>),
    /// An object per row, keyed by alias. Maps column → alias.
    Aliases(IndexMap<String, String>),
}

impl Projection {
    fn apply(&self, row: &Record) -> Value {
        match self {
            Self::Column(column) => row.value(column).clone(),
            Self::Columns(columns) => Value::Array(
                columns.iter().map(|c| row.value(c).clone()).collect(),
            ),
            Self::Aliases(aliases) => Value::Object(
                aliases
                    .iter()
                    .map(|(column, alias)| (alias.clone(), row.value(column).clone()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl From<&str> for Projection {
    fn from(column: &str) -> Self {
        Self::Column(column.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for Projection {
    fn from(columns: [&str; N]) -> Self {
        Self::Columns(columns.iter().map(|c| (*c).to_string()).collect())
    }
}

pub struct Query<'r> {
    registry: &'r Registry,
    schema: Arc<EntitySchema>,
    filter: Filter,
    orders: Vec<(String, bool)>,
    relations: Vec<String>,
    limit: Option<usize>,
    offset: usize,
}

impl<'r> Query<'r> {
    pub(crate) fn new(registry: &'r Registry, schema: Arc<EntitySchema>) -> Self {
        Self {
            registry,
            schema,
            filter: Filter::new(),
            orders: Vec::new(),
            relations: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        self.schema.name()
    }

    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filter.where_eq(column, value);
        self
    }

    #[must_use]
    pub fn where_op(mut self, column: &str, op: Comparator, value: impl Into<Value>) -> Self {
        self.filter.where_op(column, op, value);
        self
    }

    #[must_use]
    pub fn or_where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filter.or_where_eq(column, value);
        self
    }

    #[must_use]
    pub fn or_where_op(mut self, column: &str, op: Comparator, value: impl Into<Value>) -> Self {
        self.filter.or_where_op(column, op, value);
        self
    }

    #[must_use]
    pub fn where_fn(mut self, test: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.filter.where_fn(test);
        self
    }

    #[must_use]
    pub fn or_where_fn(mut self, test: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.filter.or_where_fn(test);
        self
    }

    #[must_use]
    pub fn where_value_fn(
        mut self,
        column: &str,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter.where_value_fn(column, test);
        self
    }

    #[must_use]
    pub fn where_group(mut self, build: impl FnOnce(&mut Filter)) -> Self {
        self.filter.where_group(build);
        self
    }

    #[must_use]
    pub fn or_where_group(mut self, build: impl FnOnce(&mut Filter)) -> Self {
        self.filter.or_where_group(build);
        self
    }

    #[must_use]
    pub fn where_in(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.filter.where_in(column, values);
        self
    }

    #[must_use]
    pub fn or_where_in(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.filter.or_where_in(column, values);
        self
    }

    #[must_use]
    pub fn where_not_in(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.filter.where_not_in(column, values);
        self
    }

    #[must_use]
    pub fn or_where_not_in(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        self.filter.or_where_not_in(column, values);
        self
    }

    /// `where_in` over a JSON array; malformed input fails immediately.
    pub fn where_in_value(mut self, column: &str, values: &Value) -> ModelResult<Self> {
        self.filter.where_in_value(column, values)?;
        Ok(self)
    }

    /// Adds a sort pass. Passes run in declaration order and are stable,
    /// so the last one decides the primary order.
    #[must_use]
    pub fn order_by(mut self, column: &str, desc: bool) -> Self {
        self.orders.push((column.to_string(), desc));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// 1-based page of `limit` rows.
    #[must_use]
    pub fn paging(self, page: usize, limit: usize) -> Self {
        self.offset(page.saturating_sub(1) * limit).limit(limit)
    }

    /// Attaches relation `name` to every returned row.
    #[must_use]
    pub fn with(mut self, name: &str) -> Self {
        self.relations.push(name.to_string());
        self
    }

    #[must_use]
    pub fn with_all(mut self) -> Self {
        self.relations = self.schema.relations().keys().cloned().collect();
        self
    }

    fn matching(&self) -> impl Iterator<Item = &'r Record> + use<'_, 'r> {
        self.registry
            .stored(self.schema.name())
            .filter(|row| self.filter.matches(row))
    }

    /// Number of matching rows, ignoring limit and offset.
    #[must_use]
    pub fn count(&self) -> usize {
        self.matching().count()
    }

    /// Matching rows, sorted, sliced, with relations attached.
    #[must_use]
    pub fn get(&self) -> Vec<Record> {
        let mut rows: Vec<&Record> = self.matching().collect();
        for (column, desc) in &self.orders {
            rows.sort_by(|a, b| {
                let ord = value::sort_cmp(a.value(column), b.value(column));
                if *desc { ord.reverse() } else { ord }
            });
        }

        let mut rows: Vec<Record> = rows
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        for name in &self.relations {
            let Some(relation) = self.schema.relation(name) else {
                warn!(entity = self.schema.name(), relation = %name, "relation not declared, skipped");
                continue;
            };
            for row in &mut rows {
                let related = self.related(relation, row);
                row.attach_related(name, related);
            }
        }
        rows
    }

    /// Rows mapped through `projection`.
    #[must_use]
    pub fn get_as(&self, projection: &Projection) -> Vec<Value> {
        self.get().iter().map(|row| projection.apply(row)).collect()
    }

    #[must_use]
    pub fn first(self) -> Option<Record> {
        self.limit(1).get().into_iter().next()
    }

    #[must_use]
    pub fn first_as(self, projection: &Projection) -> Option<Value> {
        self.limit(1).get_as(projection).into_iter().next()
    }

    fn related(&self, relation: &Relation, row: &Record) -> Value {
        let records = match &relation.link {
            Some(link) => {
                let mut seen = HashSet::new();
                self.resolve_hop(link, row)
                    .iter()
                    .flat_map(|link_row| self.resolve_hop(relation, link_row))
                    .filter(|r| r.key().is_none_or(|key| seen.insert(key)))
                    .collect()
            }
            None => self.resolve_hop(relation, row),
        };

        if relation.multiple {
            Value::Array(records.iter().map(Record::to_json).collect())
        } else {
            records.first().map_or(Value::Null, Record::to_json)
        }
    }

    /// Foreign rows linked to `row` by one hop of `relation`.
    fn resolve_hop(&self, relation: &Relation, row: &Record) -> Vec<Record> {
        let Ok(schema) = self.registry.schema(&relation.foreign_entity) else {
            warn!(entity = %relation.foreign_entity, "related entity not registered");
            return Vec::new();
        };
        let local = row.value(&relation.local).clone();
        let query = Query::new(self.registry, Arc::clone(schema));

        let query = match (relation.kind, local) {
            (_, Value::Null) => return Vec::new(),
            (RelationKind::HasManyList, Value::Array(ids)) => query.where_in(&relation.foreign, ids),
            (RelationKind::HasManyList, id) => {
                query.where_value_fn(&relation.foreign, move |column| value::array_contains(column, &id))
            }
            (_, local) => query.where_eq(&relation.foreign, local),
        };
        query.get()
    }
}

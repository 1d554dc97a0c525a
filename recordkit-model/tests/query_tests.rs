mod common;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use recordkit_model::{Comparator, ModelError, Projection, Registry};
use serde_json::{Value, json};

use common::{ids, rows_registry};

fn ages() -> Registry {
    rows_registry(json!([
        {"id": 1, "age": 20, "name": "ann"},
        {"id": 2, "age": 30, "name": "bob"},
        {"id": 3, "age": 40, "name": "cid"}
    ]))
}

// ── Reference examples ───────────────────────────────────────────

#[test]
fn where_greater_than() {
    let registry = ages();
    let rows = registry.query("Row").unwrap().where_op("age", Comparator::Gt, 20).get();
    assert_eq!(ids(&rows), vec![json!(2), json!(3)]);
}

#[test]
fn and_group_or_group_are_disjuncts() {
    let registry = ages();
    let rows = registry
        .query("Row")
        .unwrap()
        .where_op("age", Comparator::Gt, 20)
        .or_where_eq("id", 1)
        .get();
    assert_eq!(ids(&rows), vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn order_by_desc_first() {
    let registry = ages();
    let first = registry.query("Row").unwrap().order_by("age", true).first().unwrap();
    assert_eq!(first.id(), &json!(3));
}

#[test]
fn where_in_ids() {
    let registry = ages();
    let rows = registry.query("Row").unwrap().where_in("id", [1, 3]).get();
    assert_eq!(ids(&rows), vec![json!(1), json!(3)]);
}

// ── Predicates ───────────────────────────────────────────────────

#[test]
fn no_predicates_returns_everything() {
    let registry = ages();
    assert_eq!(registry.query("Row").unwrap().get().len(), 3);
    assert_eq!(registry.query("Row").unwrap().count(), 3);
}

#[test]
fn or_only_filter_still_requires_a_match() {
    let registry = ages();
    let rows = registry.query("Row").unwrap().or_where_eq("id", 2).get();
    assert_eq!(ids(&rows), vec![json!(2)]);
}

#[test]
fn where_not_in() {
    let registry = ages();
    let rows = registry.query("Row").unwrap().where_not_in("id", [2]).get();
    assert_eq!(ids(&rows), vec![json!(1), json!(3)]);
}

#[test]
fn strict_and_loose_equality() {
    let registry = ages();
    let strict = registry.query("Row").unwrap().where_eq("age", "30").get();
    assert!(strict.is_empty());

    let loose = registry
        .query("Row")
        .unwrap()
        .where_op("age", Comparator::LooseEq, "30")
        .get();
    assert_eq!(ids(&loose), vec![json!(2)]);

    let not_loose = registry
        .query("Row")
        .unwrap()
        .where_op("age", Comparator::LooseNe, "30")
        .get();
    assert_eq!(ids(&not_loose), vec![json!(1), json!(3)]);
}

#[test]
fn comparators_parse_from_symbols() {
    for symbol in ["=", "==", "!=", "!==", ">", ">=", "<", "<="] {
        let op: Comparator = symbol.parse().unwrap();
        assert_eq!(op.as_str(), symbol);
    }
    assert!(matches!(
        "<>".parse::<Comparator>(),
        Err(ModelError::UnknownComparator(s)) if s == "<>"
    ));
    assert_eq!(Comparator::default(), Comparator::Eq);
}

#[test]
fn row_and_value_closures() {
    let registry = ages();
    let rows = registry
        .query("Row")
        .unwrap()
        .where_fn(|row| row.value("name").as_str().is_some_and(|n| n.starts_with('b')))
        .get();
    assert_eq!(ids(&rows), vec![json!(2)]);

    let rows = registry
        .query("Row")
        .unwrap()
        .where_value_fn("age", |age| age.as_i64().is_some_and(|a| a % 20 == 0))
        .get();
    assert_eq!(ids(&rows), vec![json!(1), json!(3)]);
}

#[test]
fn nested_groups() {
    let registry = ages();
    // id = 1 AND (age = 30 OR name = "ann")
    let rows = registry
        .query("Row")
        .unwrap()
        .where_eq("id", 1)
        .where_group(|g| {
            g.or_where_eq("age", 30).or_where_eq("name", "ann");
        })
        .get();
    assert_eq!(ids(&rows), vec![json!(1)]);

    let rows = registry
        .query("Row")
        .unwrap()
        .where_eq("id", 2)
        .or_where_group(|g| {
            g.where_op("age", Comparator::Ge, 40);
        })
        .get();
    assert_eq!(ids(&rows), vec![json!(2), json!(3)]);
}

#[test]
fn where_in_value_checks_arguments() {
    let registry = ages();
    let rows = registry
        .query("Row")
        .unwrap()
        .where_in_value("id", &json!([2]))
        .unwrap()
        .get();
    assert_eq!(ids(&rows), vec![json!(2)]);

    let err = registry.query("Row").unwrap().where_in_value("id", &json!(2)).err().unwrap();
    assert!(matches!(err, ModelError::MalformedQuery(_)));
    assert!(err.to_string().contains("must be an array"));

    let err = registry.query("Row").unwrap().where_in_value("", &json!([1])).err().unwrap();
    assert!(matches!(err, ModelError::MalformedQuery(_)));
}

#[test]
fn unknown_entity_query_fails() {
    let registry = ages();
    assert!(matches!(registry.query("Nope"), Err(ModelError::UnknownEntity(_))));
}

// ── Ordering & slicing ───────────────────────────────────────────

#[test]
fn last_order_by_is_primary() {
    let registry = rows_registry(json!([
        {"id": 1, "age": 30, "name": "b"},
        {"id": 2, "age": 20, "name": "a"},
        {"id": 3, "age": 30, "name": "a"}
    ]));
    let rows = registry
        .query("Row")
        .unwrap()
        .order_by("name", false)
        .order_by("age", false)
        .get();
    assert_eq!(ids(&rows), vec![json!(2), json!(3), json!(1)]);
}

#[test]
fn ties_keep_collection_order() {
    let registry = rows_registry(json!([
        {"id": 3, "age": 1},
        {"id": 1, "age": 1},
        {"id": 2, "age": 0}
    ]));
    let rows = registry.query("Row").unwrap().order_by("age", true).get();
    assert_eq!(ids(&rows), vec![json!(3), json!(1), json!(2)]);
}

#[test]
fn limit_offset_and_paging() {
    let registry = rows_registry(json!((1..=7).map(|i| json!({"id": i})).collect::<Vec<_>>()));

    let rows = registry.query("Row").unwrap().limit(2).get();
    assert_eq!(ids(&rows), vec![json!(1), json!(2)]);

    let rows = registry.query("Row").unwrap().offset(5).get();
    assert_eq!(ids(&rows), vec![json!(6), json!(7)]);

    let rows = registry.query("Row").unwrap().paging(3, 3).get();
    assert_eq!(ids(&rows), vec![json!(7)]);

    let rows = registry.query("Row").unwrap().paging(0, 3).get();
    assert_eq!(ids(&rows), vec![json!(1), json!(2), json!(3)]);

    assert_eq!(registry.query("Row").unwrap().limit(2).count(), 7);
}

#[test]
fn first_on_empty_result() {
    let registry = ages();
    assert!(registry.query("Row").unwrap().where_eq("id", 9).first().is_none());
}

// ── Projection ───────────────────────────────────────────────────

#[test]
fn projections() {
    let registry = ages();
    let query = || registry.query("Row").unwrap().where_op("age", Comparator::Le, 30);

    assert_eq!(query().get_as(&Projection::from("name")), vec![json!("ann"), json!("bob")]);
    assert_eq!(
        query().get_as(&Projection::from(["id", "age"])),
        vec![json!([1, 20]), json!([2, 30])]
    );

    let aliases = IndexMap::from([("name".to_string(), "label".to_string())]);
    assert_eq!(
        query().first_as(&Projection::Aliases(aliases)),
        Some(json!({"label": "ann"}))
    );
}

#[test]
fn queries_return_copies() {
    let registry = ages();
    let mut row = registry.query("Row").unwrap().first().unwrap();
    row.set("age", 99).unwrap();
    let stored = registry.find("Row", 1).unwrap().unwrap();
    assert_eq!(stored.value("age"), &json!(20));
}

fn age_rows(ages: &[i64]) -> Value {
    Value::Array(
        ages.iter()
            .enumerate()
            .map(|(i, age)| json!({"id": i + 1, "age": age}))
            .collect(),
    )
}

proptest! {
    #[test]
    fn greater_than_matches_manual_filter(ages in prop::collection::vec(0i64..100, 0..20), pivot in 0i64..100) {
        let registry = rows_registry(age_rows(&ages));
        let rows = registry.query("Row").unwrap().where_op("age", Comparator::Gt, pivot).get();
        let expected: Vec<Value> = ages
            .iter()
            .enumerate()
            .filter(|(_, a)| **a > pivot)
            .map(|(i, _)| json!(i + 1))
            .collect();
        prop_assert_eq!(ids(&rows), expected);
    }

    #[test]
    fn order_by_sorts(ages in prop::collection::vec(0i64..100, 0..20)) {
        let registry = rows_registry(age_rows(&ages));
        let sorted: Vec<i64> = registry
            .query("Row")
            .unwrap()
            .order_by("age", false)
            .get()
            .iter()
            .map(|r| r.value("age").as_i64().unwrap())
            .collect();
        let mut expected = ages.clone();
        expected.sort_unstable();
        prop_assert_eq!(sorted, expected);
    }

    #[test]
    fn paging_partitions_rows(n in 0usize..25, per_page in 1usize..6) {
        let registry = rows_registry(age_rows(&vec![1; n]));
        let mut seen = Vec::new();
        let pages = n.div_ceil(per_page) + 1;
        for page in 1..=pages {
            seen.extend(ids(&registry.query("Row").unwrap().paging(page, per_page).get()));
        }
        prop_assert_eq!(seen.len(), n);
    }
}

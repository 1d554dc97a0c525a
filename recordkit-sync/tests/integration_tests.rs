use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use recordkit_field::FieldBuilder;
use recordkit_model::{EntityDef, FetchCallback, ModelError, Registry, SaveOutcome};
use recordkit_sync::{Endpoints, MockApi};
use recordkit_types::RecordKey;
use serde_json::{Value, json};

type Seen = Arc<Mutex<Vec<(Value, usize, u16)>>>;

fn recorder() -> (Seen, FetchCallback) {
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    let callback: FetchCallback = Box::new(move |data, records, response| {
        sink.lock()
            .unwrap()
            .push((data.clone(), records.len(), response.status));
    });
    (seen, callback)
}

fn backend() -> Arc<MockApi> {
    Arc::new(MockApi::new().with_table(
        "users",
        json!([
            {"id": 1, "name": "Ann", "age": 31},
            {"id": 2, "name": "Bob", "age": 25},
            {"id": 3, "name": "Cid", "age": 40}
        ]),
    ))
}

fn registry(api: &Arc<MockApi>) -> Registry {
    Registry::builder()
        .gateway(api.mount("users", Endpoints::new()))
        .entity(
            EntityDef::new("User")
                .field("name", FieldBuilder::string().min(2))
                .field("age", FieldBuilder::number().nullable())
                .routes("users"),
        )
        .entity(
            EntityDef::new("Post")
                .field("title", FieldBuilder::string())
                .routes("posts"),
        )
        .build()
        .unwrap()
}

// ── Reads ────────────────────────────────────────────────────────

#[test]
fn fetch_list_hydrates_page_and_total() {
    let api = backend();
    let mut registry = registry(&api);

    let (seen, callback) = recorder();
    registry
        .fetch_list(
            "User",
            json!({
                "filters": {"wheres": {"column": "age", "condition": ">", "value": 26}},
                "limit": 1
            }),
            Some(callback),
        )
        .unwrap();

    assert_eq!(registry.size("User"), 1);
    assert_eq!(registry.total_rows("User"), 2);
    assert!(registry.get("User", &RecordKey::Int(1)).is_some());
    assert_eq!(seen.lock().unwrap()[0].1, 1);
}

#[test]
fn fetch_one_error_reaches_the_callback() {
    let api = backend();
    let mut registry = registry(&api);

    let (seen, callback) = recorder();
    registry.fetch_one("User", json!({"id": 99}), Some(callback)).unwrap();

    assert_eq!(registry.size("User"), 0);
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], (json!({"error": "record with id=99 not found"}), 0, 400));
}

#[test]
fn unmounted_route_fails_at_the_call_site() {
    let api = backend();
    let mut registry = registry(&api);

    let err = registry.fetch_list("Post", json!({}), None).unwrap_err();
    assert!(matches!(err, ModelError::Gateway(ref m) if m.contains(r#"route path "posts.list""#)));
    assert!(registry.pending_calls().is_empty());
}

// ── Writes ───────────────────────────────────────────────────────

#[test]
fn save_new_record_inserts_remotely() {
    let api = backend();
    let mut registry = registry(&api);

    let mut user = registry.make("User", &json!({"name": "Dee", "age": 22})).unwrap();
    let outcome = registry.save(&mut user, None).unwrap();
    assert!(matches!(outcome, SaveOutcome::Requested(_)));

    let rows = api.table("users").unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3]["id"], json!(4));

    let stored = registry.get("User", &RecordKey::Int(4)).unwrap();
    assert_eq!(stored.value("name"), &json!("Dee"));
    assert!(!stored.is_dirty());
    assert_eq!(registry.total_rows("User"), 4);
}

#[test]
fn save_loaded_record_updates_remotely() {
    let api = backend();
    let mut registry = registry(&api);
    registry.fetch_one("User", json!({"id": 2}), None).unwrap();

    let mut user = registry.find("User", 2).unwrap().unwrap();
    user.set("age", 26).unwrap();
    registry.save(&mut user, None).unwrap();

    assert_eq!(api.table("users").unwrap()[1]["age"], json!(26));
    assert_eq!(
        registry.get("User", &RecordKey::Int(2)).unwrap().value("age"),
        &json!(26)
    );
}

#[test]
fn invalid_record_never_reaches_the_backend() {
    let api = backend();
    let mut registry = registry(&api);

    let mut user = registry.make("User", &json!({"name": "X"})).unwrap();
    assert_eq!(registry.save(&mut user, None).unwrap(), SaveOutcome::Invalid);
    assert_eq!(api.table("users").unwrap().len(), 3);
}

#[test]
fn delete_removes_locally_and_remotely() {
    let api = backend();
    let mut registry = registry(&api);
    registry.fetch_list("User", json!({}), None).unwrap();
    assert_eq!(registry.size("User"), 3);

    let user = registry.find("User", 3).unwrap().unwrap();
    let (seen, callback) = recorder();
    registry.delete(&user, Some(callback)).unwrap();

    assert_eq!(registry.size("User"), 2);
    assert_eq!(api.table("users").unwrap().len(), 2);
    assert_eq!(seen.lock().unwrap()[0].0["$data"][0]["totalRows"], json!(2));
}

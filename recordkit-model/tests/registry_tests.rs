mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use recordkit_field::{ErrorKind, FieldBuilder, MessageTemplates};
use recordkit_model::{
    EntityDef, EntityHooks, LocalIds, ModelError, Record, Registry, RegistryConfig, SaveOutcome,
};
use recordkit_types::RecordKey;
use serde_json::{Value, json};

use common::{ids, local_config, local_registry, post_def, user_def};

#[derive(Default)]
struct Trace(Mutex<Vec<String>>);

impl Trace {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, event: &str, record: &Record) {
        self.0.lock().unwrap().push(format!("{event}:{}", record.id()));
    }
}

struct TracingHooks(Arc<Trace>);

impl EntityHooks for TracingHooks {
    fn before_insert(&self, record: &mut Record) {
        self.0.push("before_insert", record);
        record.set("name", "Hooked").unwrap();
    }

    fn after_insert(&self, record: &Record) {
        self.0.push("after_insert", record);
    }

    fn before_update(&self, record: &mut Record) {
        self.0.push("before_update", record);
    }

    fn after_update(&self, record: &Record) {
        self.0.push("after_update", record);
    }

    fn before_delete(&self, record: &Record) {
        self.0.push("before_delete", record);
    }

    fn after_delete(&self, record: &Record) {
        self.0.push("after_delete", record);
    }
}

fn hooked_registry() -> (Registry, Arc<Trace>) {
    let trace = Arc::new(Trace::default());
    let registry = Registry::builder()
        .config(local_config())
        .entity(
            EntityDef::new("Note")
                .field("name", FieldBuilder::string())
                .hooks(TracingHooks(Arc::clone(&trace))),
        )
        .build()
        .unwrap();
    (registry, trace)
}

// ── Building ─────────────────────────────────────────────────────

#[test]
fn duplicate_entities_fail() {
    let err = Registry::builder()
        .entity(user_def())
        .entity(post_def())
        .entity(post_def())
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateEntity(name) if name == "Post"));
}

#[test]
fn invalid_field_fails_build() {
    let err = Registry::builder()
        .entity(EntityDef::new("X").field("code", FieldBuilder::string().pattern("(")))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::Field(_)));
}

#[test]
fn empty_templates_fail_build() {
    let err = Registry::builder()
        .templates(MessageTemplates::new("en"))
        .entity(EntityDef::new("X"))
        .build()
        .unwrap_err();
    assert!(matches!(err, ModelError::Field(_)));
}

#[test]
fn primary_key_is_declared_automatically() {
    let registry = Registry::builder()
        .entity(EntityDef::new("Group").primary_key("gid"))
        .build()
        .unwrap();
    let schema = registry.schema("Group").unwrap();
    assert_eq!(schema.primary_key(), "gid");
    assert!(schema.fields().contains_key("gid"));
    assert_eq!(registry.entities().collect::<Vec<_>>(), vec!["Group"]);
}

#[test]
fn entity_use_api_overrides_config() {
    let registry = Registry::builder()
        .config(local_config())
        .entity(EntityDef::new("A").use_api(true))
        .entity(EntityDef::new("B"))
        .build()
        .unwrap();
    assert!(registry.schema("A").unwrap().use_api());
    assert!(!registry.schema("B").unwrap().use_api());
}

#[test]
fn configured_language_is_pinned() {
    let templates = MessageTemplates::english()
        .with_template("de", ErrorKind::Required, |ctx| {
            format!("Feld \"{}\" ist erforderlich", ctx.label_or_name)
        });
    let mut registry = Registry::builder()
        .config(RegistryConfig {
            lang: Some("de".to_string()),
            ..local_config()
        })
        .templates(templates)
        .entity(user_def())
        .entity(post_def())
        .build()
        .unwrap();

    let mut user = registry.make("User", &json!({})).unwrap();
    assert_eq!(registry.save(&mut user, None).unwrap(), SaveOutcome::Invalid);
    assert_eq!(user.error_messages(), vec!["Feld \"Name\" ist erforderlich"]);
}

// ── Local CRUD ───────────────────────────────────────────────────

#[test]
fn create_mints_sequential_ids() {
    let mut registry = local_registry();
    let a = registry.create("User", &json!({"name": "Ada"})).unwrap();
    let b = registry.create("User", &json!({"name": "Bob"})).unwrap();
    assert_eq!(a.id(), &json!(1));
    assert_eq!(b.id(), &json!(2));
    assert!(!a.is_dirty());
    assert_eq!(registry.size("User"), 2);
}

#[test]
fn sequential_ids_follow_existing_keys() {
    let mut registry = local_registry();
    registry
        .insert_or_update_value("User", &json!({"id": 41, "name": "Old"}), true)
        .unwrap();
    let user = registry.create("User", &json!({"name": "New"})).unwrap();
    assert_eq!(user.id(), &json!(42));
}

#[test]
fn uuid_ids() {
    let mut registry = Registry::builder()
        .config(RegistryConfig {
            local_ids: LocalIds::Uuid,
            ..local_config()
        })
        .entity(user_def())
        .entity(post_def())
        .build()
        .unwrap();
    let user = registry.create("User", &json!({"name": "Ada"})).unwrap();
    assert!(matches!(user.key(), Some(RecordKey::Str(s)) if s.len() == 36));
}

#[test]
fn create_with_id_updates_in_place() {
    let mut registry = local_registry();
    registry.create("User", &json!({"id": 5, "name": "Ada"})).unwrap();
    registry.create("User", &json!({"id": 5, "name": "Grace"})).unwrap();
    assert_eq!(registry.size("User"), 1);
    let stored = registry.get("User", &RecordKey::Int(5)).unwrap();
    assert_eq!(stored.value("name"), &json!("Grace"));
}

#[test]
fn make_does_not_store() {
    let mut registry = local_registry();
    let user = registry.make("User", &json!({"id": 1, "name": "Ada"})).unwrap();
    assert_eq!(registry.size("User"), 0);
    assert!(user.is_dirty());
}

#[test]
fn fill_refreshes_a_record() {
    let mut registry = local_registry();
    let mut user = registry.make("User", &json!({"id": 1, "name": "Ada"})).unwrap();
    registry
        .fill(&mut user, &json!({"id": 1, "name": "Grace", "posts": [{"id": 3, "title": "t"}]}))
        .unwrap();
    assert_eq!(user.value("name"), &json!("Grace"));
    assert_eq!(registry.size("Post"), 1);
}

#[test]
fn insert_and_update_guard_persistence_state() {
    let mut registry = local_registry();
    let persisted = registry.make("User", &json!({"id": 1, "name": "Ada"})).unwrap();
    let fresh = registry.make("User", &json!({"name": "Bob"})).unwrap();

    assert!(matches!(
        registry.insert(persisted.clone()),
        Err(ModelError::AlreadyPersisted { .. })
    ));
    assert!(matches!(registry.update(fresh.clone()), Err(ModelError::NotPersisted(_))));

    assert_eq!(registry.insert(fresh).unwrap().id(), &json!(1));
    assert_eq!(registry.update(persisted).unwrap().id(), &json!(1));
    assert_eq!(registry.size("User"), 1);
}

#[test]
fn insert_or_update_value_rejects_scalars() {
    let mut registry = local_registry();
    let err = registry.insert_or_update_value("User", &json!(5), true).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload { found: "number", .. }));

    let records = registry
        .insert_or_update_value("User", &json!([{"id": 1, "name": "a"}, 7, null]), true)
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn unknown_entity_operations_fail() {
    let mut registry = local_registry();
    assert!(matches!(
        registry.make("Ghost", &json!({})),
        Err(ModelError::UnknownEntity(_))
    ));
    assert!(registry.find("Ghost", 1).is_err());
    assert_eq!(registry.size("Ghost"), 0);
}

// ── Lookups ──────────────────────────────────────────────────────

#[test]
fn find_and_find_many() {
    let mut registry = local_registry();
    registry
        .insert_or_update_value(
            "User",
            &json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}, {"id": 3, "name": "c"}]),
            true,
        )
        .unwrap();

    assert_eq!(registry.find("User", 2).unwrap().unwrap().value("name"), &json!("b"));
    assert!(registry.find("User", 9).unwrap().is_none());
    assert_eq!(
        ids(&registry.find_many("User", [3, 1]).unwrap()),
        vec![json!(1), json!(3)]
    );

    let names: Vec<&Value> = registry.all("User").iter().map(|r| r.value("name")).collect();
    assert_eq!(names, vec![&json!("a"), &json!("b"), &json!("c")]);

    let mut seen = 0;
    registry.each("User", |_| seen += 1);
    assert_eq!(seen, 3);
}

#[test]
fn total_rows_counter() {
    let mut registry = local_registry();
    assert_eq!(registry.total_rows("User"), 0);
    registry.set_total_rows("User", 120);
    assert_eq!(registry.total_rows("User"), 120);
}

// ── Save lifecycle ───────────────────────────────────────────────

#[test]
fn save_clean_record_is_a_no_op() {
    let mut registry = local_registry();
    let mut user = registry.create("User", &json!({"name": "Ada"})).unwrap();
    assert_eq!(registry.save(&mut user, None).unwrap(), SaveOutcome::Clean);
}

#[test]
fn save_invalid_new_record_keeps_it_new() {
    let mut registry = local_registry();
    let mut user = registry.make("User", &json!({})).unwrap();
    assert_eq!(registry.save(&mut user, None).unwrap(), SaveOutcome::Invalid);
    assert!(user.is_new());
    assert_eq!(user.errors()[0].kind, ErrorKind::Required);
    assert_eq!(registry.size("User"), 0);
}

#[test]
fn save_local_record() {
    let mut registry = local_registry();
    let mut user = registry.make("User", &json!({"name": "Ada"})).unwrap();

    let called = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&called);
    let outcome = registry
        .save(
            &mut user,
            Some(Box::new(move |data, records, response| {
                assert_eq!(data["name"], json!("Ada"));
                assert_eq!(records.len(), 1);
                assert!(response.is_success());
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();

    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(user.id(), &json!(1));
    assert!(!user.is_dirty());
    assert_eq!(registry.size("User"), 1);

    user.set("age", 30).unwrap();
    assert_eq!(registry.save(&mut user, None).unwrap(), SaveOutcome::Saved);
    assert_eq!(
        registry.get("User", &RecordKey::Int(1)).unwrap().value("age"),
        &json!(30)
    );
}

#[test]
fn hooks_run_around_save_and_delete() {
    let (mut registry, trace) = hooked_registry();
    let mut note = registry.make("Note", &json!({})).unwrap();

    // before_insert fills the required name, so validation passes
    assert_eq!(registry.save(&mut note, None).unwrap(), SaveOutcome::Saved);
    assert_eq!(note.value("name"), &json!("Hooked"));

    note.set("name", "Edited").unwrap();
    registry.save(&mut note, None).unwrap();
    registry.delete(&note, None).unwrap();

    assert_eq!(
        trace.events(),
        vec![
            "before_insert:null",
            "after_insert:1",
            "before_update:1",
            "after_update:1",
            "before_delete:1",
            "after_delete:1",
        ]
    );
    assert_eq!(registry.size("Note"), 0);
}

#[test]
fn local_delete_runs_callback() {
    let mut registry = local_registry();
    let user = registry.create("User", &json!({"name": "Ada"})).unwrap();
    let called = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&called);

    let request = registry
        .delete(
            &user,
            Some(Box::new(move |_, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
    assert_eq!(request, None);
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert_eq!(registry.size("User"), 0);
}

#[test]
fn delete_by_key() {
    let mut registry = local_registry();
    registry.create("User", &json!({"name": "Ada"})).unwrap();
    let removed = registry.delete_by_key("User", &RecordKey::Int(1)).unwrap();
    assert_eq!(removed.value("name"), &json!("Ada"));
    assert!(matches!(
        registry.delete_by_key("User", &RecordKey::Int(1)),
        Err(ModelError::Store(_))
    ));
}

// ── Routes ───────────────────────────────────────────────────────

#[test]
fn api_route_errors() {
    let registry = Registry::builder()
        .entity(EntityDef::new("Plain"))
        .entity(user_def())
        .entity(post_def())
        .build()
        .unwrap();

    assert!(matches!(registry.api_route("Plain", "list"), Err(ModelError::NoRoutes(_))));
    assert!(matches!(
        registry.api_route("User", "archive"),
        Err(ModelError::UnknownRoute { .. })
    ));
    assert!(matches!(
        registry.api_route("User", "list"),
        Err(ModelError::MissingGateway(_))
    ));
    assert!(!registry.has_api_route("User", "list"));
}

#[test]
fn routes_prefix_registers_crud_routes() {
    let registry = local_registry();
    let routes: Vec<String> = registry
        .schema("User")
        .unwrap()
        .routes()
        .values()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        routes,
        vec!["users.list", "users.one", "users.insert", "users.update", "users.delete"]
    );
}

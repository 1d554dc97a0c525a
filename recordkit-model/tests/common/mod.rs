#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use recordkit_field::FieldBuilder;
use recordkit_model::{
    ApiGateway, EntityDef, LinkDef, ModelResult, Record, Registry, RegistryConfig, RelationDef,
    Replier, RoutePath,
};
use serde_json::{Value, json};

pub type Responder = Box<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// Routes and arguments of every gateway call, in order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<(String, Value)>>>);

impl CallLog {
    pub fn push(&self, route: &str, args: Value) {
        self.0.lock().unwrap().push((route.to_string(), args));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.0.lock().unwrap().clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.calls().into_iter().map(|(r, _)| r).collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Gateway answering through a closure. Calls the closure declines
/// (`None`) are parked and can be answered later.
pub struct TestGateway {
    log: CallLog,
    responder: Responder,
    parked: Arc<Mutex<Vec<Replier>>>,
}

impl TestGateway {
    pub fn new(responder: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self {
            log: CallLog::default(),
            responder: Box::new(responder),
            parked: Arc::default(),
        }
    }

    /// Replies like a trivial backend: inserts get id 100, updates and
    /// reads echo their arguments, deletes reply null.
    pub fn echo() -> Self {
        Self::new(|route, args| {
            let mut reply = args.clone();
            match route.rsplit('.').next() {
                Some("insert") => {
                    reply["id"] = json!(100);
                    Some(reply)
                }
                Some("delete") => Some(Value::Null),
                _ => Some(reply),
            }
        })
    }

    /// Parks every call.
    pub fn silent() -> Self {
        Self::new(|_, _| None)
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn parked(&self) -> Arc<Mutex<Vec<Replier>>> {
        Arc::clone(&self.parked)
    }
}

impl ApiGateway for TestGateway {
    fn call(&self, route: &RoutePath, args: Value, replier: Replier) -> ModelResult<()> {
        self.log.push(route.as_str(), args.clone());
        match (self.responder)(route.as_str(), &args) {
            Some(data) => replier.ok(data),
            None => {
                self.parked.lock().unwrap().push(replier);
                Ok(())
            }
        }
    }
}

/// Routes `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn local_config() -> RegistryConfig {
    RegistryConfig {
        use_api: false,
        ..RegistryConfig::default()
    }
}

pub fn user_def() -> EntityDef {
    EntityDef::new("User")
        .field("name", FieldBuilder::string().label("Name").min(2))
        .field("email", FieldBuilder::string().nullable().pattern(r"^[^@]+@[^@]+$"))
        .field("age", FieldBuilder::number().nullable())
        .field("role", FieldBuilder::string().nullable().always_send())
        .relation("posts", RelationDef::has_many("Post"))
        .routes("users")
}

pub fn post_def() -> EntityDef {
    EntityDef::new("Post")
        .field("title", FieldBuilder::string())
        .field("user_id", FieldBuilder::number().nullable())
        .relation("user", RelationDef::belongs_to("User"))
        .routes("posts")
}

/// User/Post registry without a gateway.
pub fn local_registry() -> Registry {
    Registry::builder()
        .config(local_config())
        .entity(user_def())
        .entity(post_def())
        .build()
        .unwrap()
}

/// User/Post registry sending every change to `gateway`.
pub fn remote_registry(gateway: TestGateway) -> Registry {
    Registry::builder()
        .gateway(gateway)
        .entity(user_def())
        .entity(post_def())
        .build()
        .unwrap()
}

/// A local registry with one `Row` entity holding `rows` as fetched data.
pub fn rows_registry(rows: Value) -> Registry {
    let mut registry = Registry::builder()
        .config(local_config())
        .entity(
            EntityDef::new("Row")
                .field("age", FieldBuilder::number().nullable())
                .field("name", FieldBuilder::string().nullable()),
        )
        .build()
        .unwrap();
    registry.insert_or_update_value("Row", &rows, true).unwrap();
    registry
}

/// Author/Book/Tag/BookTag registry used by relation tests.
pub fn library_registry() -> Registry {
    Registry::builder()
        .config(local_config())
        .entity(
            EntityDef::new("Author")
                .field("name", FieldBuilder::string())
                .relation("books", RelationDef::has_many("Book"))
                .relation("profile", RelationDef::has_one("Profile")),
        )
        .entity(
            EntityDef::new("Book")
                .field("title", FieldBuilder::string())
                .field("author_id", FieldBuilder::number().nullable())
                .field("tag_ids", FieldBuilder::array().nullable())
                .relation("author", RelationDef::belongs_to("Author"))
                .relation(
                    "tags",
                    RelationDef::has_many_list("Tag").local("tag_ids").foreign("id"),
                )
                .relation(
                    "tagged",
                    RelationDef::has_many_to_many("Tag", LinkDef::new("BookTag")),
                ),
        )
        .entity(
            EntityDef::new("Tag")
                .field("label", FieldBuilder::string())
                .relation("books", RelationDef::has_many_list("Book").foreign("tag_ids")),
        )
        .entity(
            EntityDef::new("BookTag")
                .field("book_id", FieldBuilder::number())
                .field("tag_id", FieldBuilder::number()),
        )
        .entity(
            EntityDef::new("Profile")
                .field("bio", FieldBuilder::string())
                .field("author_id", FieldBuilder::number().nullable()),
        )
        .build()
        .unwrap()
}

pub fn ids(records: &[Record]) -> Vec<Value> {
    records.iter().map(|r| r.id().clone()).collect()
}

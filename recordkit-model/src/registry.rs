//! The entity registry.
//!
//! [`Registry`] builds every entity schema once, owns the collection store
//! holding the loaded records of every entity, and drives the remote
//! gateway. CRUD operations live in `crud.rs`, gateway calls and reply
//! hydration in `fetch.rs`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use indexmap::IndexMap;
use recordkit_field::{BuildEnv, MessageTemplates};
use recordkit_store::CollectionStore;
use recordkit_types::RecordKey;
use serde_json::Value;
use tracing::info;

use crate::config::RegistryConfig;
use crate::error::{ModelError, ModelResult};
use crate::gateway::{ApiGateway, ApiResponse, Delivery, RequestId};
use crate::query::Query;
use crate::record::Record;
use crate::schema::{EntityDef, EntitySchema};

/// Caller callback of a gateway call: `(data, records, response)`.
///
/// For hydrating calls it runs once per `$data` section (with the section
/// object) or once for a plain reply; `records` are the stored results.
/// For raw calls `records` is empty.
pub type FetchCallback = Box<dyn FnMut(&Value, &[Record], &ApiResponse) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyMode {
    /// Store the returned rows.
    Hydrate,
    /// Hand the reply to the callback untouched.
    Raw,
}

pub(crate) struct PendingCall {
    pub(crate) entity: String,
    pub(crate) route: String,
    pub(crate) mode: ReplyMode,
    pub(crate) callback: Option<FetchCallback>,
}

/// Owner of all schemas and loaded records.
pub struct Registry {
    pub(crate) config: RegistryConfig,
    pub(crate) templates: Arc<MessageTemplates>,
    pub(crate) schemas: IndexMap<String, Arc<EntitySchema>>,
    pub(crate) store: CollectionStore<Record>,
    pub(crate) gateway: Option<Arc<dyn ApiGateway>>,
    pub(crate) tx: Sender<Delivery>,
    pub(crate) rx: Receiver<Delivery>,
    pub(crate) pending: HashMap<RequestId, PendingCall>,
    pub(crate) next_request: RequestId,
}

#[derive(Default)]
pub struct RegistryBuilder {
    config: RegistryConfig,
    gateway: Option<Arc<dyn ApiGateway>>,
    templates: Option<MessageTemplates>,
    entities: Vec<EntityDef>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn gateway(mut self, gateway: impl ApiGateway + 'static) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    #[must_use]
    pub fn shared_gateway(mut self, gateway: Arc<dyn ApiGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Replaces the built-in English messages. `config.lang`, when set,
    /// still pins the current language.
    #[must_use]
    pub fn templates(mut self, templates: MessageTemplates) -> Self {
        self.templates = Some(templates);
        self
    }

    #[must_use]
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.entities.push(def);
        self
    }

    /// Builds every schema. Fails on duplicate or dangling entity names,
    /// invalid fields and an empty template set.
    pub fn build(self) -> ModelResult<Registry> {
        let config = self.config;
        let mut templates = self.templates.unwrap_or_else(|| {
            MessageTemplates::english().with_default_lang(config.default_lang.clone())
        });
        if let Some(lang) = &config.lang {
            templates = templates.with_fixed_lang(lang.clone());
        }
        templates.ensure_not_empty()?;
        let templates = Arc::new(templates);

        let env = BuildEnv {
            templates: Arc::clone(&templates),
            empty_string_is_empty: config.empty_string_is_empty,
        };

        let mut primaries = HashMap::new();
        for def in &self.entities {
            if primaries
                .insert(def.name().to_string(), def.primary().to_string())
                .is_some()
            {
                return Err(ModelError::DuplicateEntity(def.name().to_string()));
            }
        }

        let mut schemas = IndexMap::new();
        for def in self.entities {
            let schema = def.build(&env, &primaries, config.use_api)?;
            schemas.insert(schema.name().to_string(), Arc::new(schema));
        }
        info!(entities = schemas.len(), use_api = config.use_api, "registry built");

        let (tx, rx) = mpsc::channel();
        Ok(Registry {
            config,
            templates,
            schemas,
            store: CollectionStore::new(),
            gateway: self.gateway,
            tx,
            rx,
            pending: HashMap::new(),
            next_request: 1,
        })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("config", &self.config)
            .field("gateway", &self.gateway.is_some())
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    #[must_use]
    pub fn templates(&self) -> &Arc<MessageTemplates> {
        &self.templates
    }

    /// The schema of `entity`, or a schema error.
    pub fn schema(&self, entity: &str) -> ModelResult<&Arc<EntitySchema>> {
        self.schemas
            .get(entity)
            .ok_or_else(|| ModelError::UnknownEntity(entity.to_string()))
    }

    /// Registered entity names in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// A query over the loaded records of `entity`.
    pub fn query(&self, entity: &str) -> ModelResult<Query<'_>> {
        let schema = Arc::clone(self.schema(entity)?);
        Ok(Query::new(self, schema))
    }

    pub(crate) fn stored<'a>(&'a self, entity: &str) -> impl Iterator<Item = &'a Record> + use<'a> {
        self.store.values(entity)
    }

    /// Number of loaded records of `entity`.
    #[must_use]
    pub fn size(&self, entity: &str) -> usize {
        self.store.len(entity)
    }

    /// Loaded records of `entity` in collection order.
    #[must_use]
    pub fn all(&self, entity: &str) -> Vec<&Record> {
        self.stored(entity).collect()
    }

    pub fn each(&self, entity: &str, f: impl FnMut(&Record)) {
        self.stored(entity).for_each(f);
    }

    #[must_use]
    pub fn get(&self, entity: &str, key: &RecordKey) -> Option<&Record> {
        self.store.get(entity, key)
    }

    /// The loaded record whose primary key equals `id`.
    pub fn find(&self, entity: &str, id: impl Into<Value>) -> ModelResult<Option<Record>> {
        let schema = self.schema(entity)?;
        let pk = schema.primary_key().to_string();
        Ok(self.query(entity)?.where_eq(&pk, id).first())
    }

    /// Loaded records whose primary key is one of `ids`, in collection order.
    pub fn find_many(
        &self,
        entity: &str,
        ids: impl IntoIterator<Item = impl Into<Value>>,
    ) -> ModelResult<Vec<Record>> {
        let schema = self.schema(entity)?;
        let pk = schema.primary_key().to_string();
        Ok(self.query(entity)?.where_in(&pk, ids).get())
    }

    /// Total row count reported by the last list reply for `entity`.
    #[must_use]
    pub fn total_rows(&self, entity: &str) -> u64 {
        self.store.total_rows(entity)
    }

    pub fn set_total_rows(&mut self, entity: &str, total: u64) {
        self.store.set_total_rows(entity, total);
    }

    /// Ids of gateway calls still waiting for a reply.
    #[must_use]
    pub fn pending_calls(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("entities", &self.schemas.keys().collect::<Vec<_>>())
            .field("gateway", &self.gateway.is_some())
            .field("pending", &self.pending_calls())
            .finish_non_exhaustive()
    }
}

//! Entity declarations and their built schemas.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use recordkit_field::{AnyFieldBuilder, BuildEnv, FieldBuilder, FieldSpec};

use crate::display::DisplayRules;
use crate::error::{ModelError, ModelResult};
use crate::gateway::RoutePath;
use crate::hooks::{EntityHooks, NoHooks};
use crate::relation::{Relation, RelationDef};

/// Route names used by the CRUD and fetch helpers.
pub const CRUD_ROUTES: [&str; 5] = ["list", "one", "insert", "update", "delete"];

/// Declaration of an entity type, turned into an [`EntitySchema`] when the
/// registry is built.
pub struct EntityDef {
    name: String,
    primary_key: String,
    fields: Vec<(String, AnyFieldBuilder)>,
    relations: Vec<(String, RelationDef)>,
    routes: IndexMap<String, RoutePath>,
    use_api: Option<bool>,
    hooks: Option<Arc<dyn EntityHooks>>,
    display: Option<Arc<dyn DisplayRules>>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
            routes: IndexMap::new(),
            use_api: None,
            hooks: None,
            display: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: impl Into<AnyFieldBuilder>) -> Self {
        self.fields.push((name.into(), field.into()));
        self
    }

    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, relation: RelationDef) -> Self {
        self.relations.push((name.into(), relation));
        self
    }

    #[must_use]
    pub fn route(mut self, name: impl Into<String>, path: impl Into<RoutePath>) -> Self {
        self.routes.insert(name.into(), path.into());
        self
    }

    /// Registers `<prefix>.list`, `.one`, `.insert`, `.update` and `.delete`.
    #[must_use]
    pub fn routes(self, prefix: &str) -> Self {
        CRUD_ROUTES.iter().fold(self, |def, route| {
            def.route(*route, format!("{prefix}.{route}"))
        })
    }

    /// Overrides the registry-wide remote sync mode.
    #[must_use]
    pub fn use_api(mut self, use_api: bool) -> Self {
        self.use_api = Some(use_api);
        self
    }

    #[must_use]
    pub fn hooks(mut self, hooks: impl EntityHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    #[must_use]
    pub fn display(mut self, rules: impl DisplayRules + 'static) -> Self {
        self.display = Some(Arc::new(rules));
        self
    }

    pub(crate) fn primary(&self) -> &str {
        &self.primary_key
    }

    /// Builds the schema. `primaries` maps every registered entity to its
    /// primary-key name, for relation key inference.
    pub(crate) fn build(
        self,
        env: &BuildEnv,
        primaries: &HashMap<String, String>,
        default_use_api: bool,
    ) -> ModelResult<EntitySchema> {
        let mut fields = IndexMap::new();
        for (name, builder) in self.fields {
            let spec = builder.build(name.clone(), env)?;
            fields.insert(name, spec);
        }
        if !fields.contains_key(&self.primary_key) {
            let pk = FieldBuilder::untyped()
                .nullable()
                .build(self.primary_key.clone(), env)?;
            fields.insert(self.primary_key.clone(), pk);
        }

        let mut relations = IndexMap::new();
        for (name, def) in &self.relations {
            if fields.contains_key(name) {
                return Err(ModelError::DuplicateName {
                    entity: self.name.clone(),
                    name: name.clone(),
                });
            }
            let relation = Relation::resolve(name, &self.name, def, primaries)?;
            relations.insert(name.clone(), relation);
        }

        Ok(EntitySchema {
            name: self.name,
            primary_key: self.primary_key,
            fields,
            relations,
            routes: self.routes,
            use_api: self.use_api.unwrap_or(default_use_api),
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
            display: self.display,
        })
    }
}

impl fmt::Debug for EntityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDef")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("relations", &self.relations)
            .field("routes", &self.routes)
            .field("use_api", &self.use_api)
            .finish_non_exhaustive()
    }
}

/// The built, immutable schema of one entity type. Shared by reference
/// between the registry and every record of the type.
pub struct EntitySchema {
    name: String,
    primary_key: String,
    fields: IndexMap<String, FieldSpec>,
    relations: IndexMap<String, Relation>,
    routes: IndexMap<String, RoutePath>,
    use_api: bool,
    hooks: Arc<dyn EntityHooks>,
    display: Option<Arc<dyn DisplayRules>>,
}

impl EntitySchema {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// The declared field `name`, or a schema error.
    pub fn field(&self, name: &str) -> ModelResult<&FieldSpec> {
        self.fields.get(name).ok_or_else(|| ModelError::UnknownField {
            entity: self.name.clone(),
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn relations(&self) -> &IndexMap<String, Relation> {
        &self.relations
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// The declared relation `name`, or a schema error.
    pub fn require_relation(&self, name: &str) -> ModelResult<&Relation> {
        self.relation(name).ok_or_else(|| ModelError::UnknownRelation {
            entity: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Whether `name` is a declared field or relation.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.relations.contains_key(name)
    }

    #[must_use]
    pub fn routes(&self) -> &IndexMap<String, RoutePath> {
        &self.routes
    }

    #[must_use]
    pub fn use_api(&self) -> bool {
        self.use_api
    }

    #[must_use]
    pub fn hooks(&self) -> &Arc<dyn EntityHooks> {
        &self.hooks
    }

    #[must_use]
    pub fn display(&self) -> Option<&Arc<dyn DisplayRules>> {
        self.display.as_ref()
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("use_api", &self.use_api)
            .finish_non_exhaustive()
    }
}

//! Records, relations, queries and the entity registry.
//!
//! A [`Registry`] is built once from [`EntityDef`] declarations. It owns
//! the built [`EntitySchema`]s, the store of loaded [`Record`]s and the
//! optional [`ApiGateway`]:
//!
//! ```ignore
//! let mut registry = Registry::builder()
//!     .config(RegistryConfig::load_from("recordkit.toml"))
//!     .gateway(endpoints)
//!     .entity(
//!         EntityDef::new("User")
//!             .field("name", FieldBuilder::string().label("Name"))
//!             .relation("posts", RelationDef::has_many("Post"))
//!             .routes("users"),
//!     )
//!     .entity(EntityDef::new("Post").field("user_id", FieldBuilder::number()))
//!     .build()?;
//!
//! let mut user = registry.make("User", &json!({}))?;
//! user.set("name", "Ada")?;
//! registry.save(&mut user, None)?;
//!
//! let users = registry.query("User")?.with("posts").order_by("name", false).get();
//! ```
//!
//! Records are plain values: mutating one never touches the store until
//! it is saved, inserted or updated through the registry.

pub mod config;
mod crud;
pub mod display;
pub mod error;
mod fetch;
pub mod filter;
pub mod gateway;
pub mod hooks;
pub mod query;
pub mod record;
pub mod registry;
pub mod relation;
pub mod schema;

pub use config::{LocalIds, RegistryConfig};
pub use crud::SaveOutcome;
pub use display::{ConditionalDisplay, DisplayRule, DisplayRules};
pub use error::{ModelError, ModelResult};
pub use filter::{Comparator, Filter};
pub use gateway::{ApiGateway, ApiResponse, Delivery, Replier, RequestId, RoutePath};
pub use hooks::{EntityHooks, NoHooks};
pub use query::{Projection, Query};
pub use record::Record;
pub use registry::{FetchCallback, Registry, RegistryBuilder};
pub use relation::{LinkDef, Relation, RelationDef, RelationKind};
pub use schema::{CRUD_ROUTES, EntityDef, EntitySchema};

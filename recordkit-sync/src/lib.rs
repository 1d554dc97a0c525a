//! Concrete API gateways for recordkit registries.
//!
//! - [`Endpoints`]: a tree of handlers addressed by dotted route paths
//!   (`users.list`); implements [`recordkit_model::ApiGateway`]
//! - [`MockApi`]: in-memory tables answering `list`/`one`/`insert`/
//!   `update`/`delete`, mountable onto an [`Endpoints`] table
//! - [`ResponseBuilder`]: `{ "$data": [...] }` reply bodies
//!
//! ```ignore
//! let api = Arc::new(MockApi::new().with_table("users", json!([{"id": 1, "name": "ann"}])));
//! let endpoints = api.mount("users", Endpoints::new());
//! let mut registry = Registry::builder().gateway(endpoints).entity(user).build()?;
//! registry.fetch_list("User", json!({"limit": 10}), None)?;
//! ```

mod endpoints;
mod error;
mod mock;
mod response;

pub use endpoints::{Endpoints, Handler};
pub use error::{SyncError, SyncResult};
pub use mock::MockApi;
pub use response::ResponseBuilder;

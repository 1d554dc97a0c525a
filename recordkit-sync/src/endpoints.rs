//! Dotted-route endpoint table.
//!
//! Routes are nested groups of handlers: `users.list` resolves the group
//! `users`, then its handler `list`. An [`Endpoints`] table is itself an
//! [`ApiGateway`], so it can be handed straight to a registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use recordkit_model::{ApiGateway, ModelResult, Replier, RoutePath};
use serde_json::Value;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Handles one call: the arguments and the replier to answer through.
pub type Handler = Arc<dyn Fn(Value, Replier) -> ModelResult<()> + Send + Sync>;

#[derive(Clone)]
enum Node {
    Handler(Handler),
    Group(Endpoints),
}

/// A tree of named handlers addressed by dotted route paths.
#[derive(Clone, Default)]
pub struct Endpoints {
    nodes: IndexMap<String, Node>,
}

impl Endpoints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a single segment.
    #[must_use]
    pub fn handler<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, Replier) -> ModelResult<()> + Send + Sync + 'static,
    {
        self.nodes.insert(name.into(), Node::Handler(Arc::new(f)));
        self
    }

    /// Registers a nested group under a single segment.
    #[must_use]
    pub fn group(mut self, name: impl Into<String>, group: Endpoints) -> Self {
        self.nodes.insert(name.into(), Node::Group(group));
        self
    }

    /// Registers a handler under a dotted path, creating intermediate
    /// groups as needed. An existing handler on an intermediate segment
    /// is replaced by a group.
    #[must_use]
    pub fn route<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(Value, Replier) -> ModelResult<()> + Send + Sync + 'static,
    {
        self.insert(path, Arc::new(f));
        self
    }

    /// In-place form of [`Endpoints::route`].
    pub fn insert(&mut self, path: &str, handler: Handler) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        let mut table = self;
        for part in parts {
            let node = table
                .nodes
                .entry(part.to_string())
                .or_insert_with(|| Node::Group(Endpoints::new()));
            if matches!(node, Node::Handler(_)) {
                *node = Node::Group(Endpoints::new());
            }
            table = match node {
                Node::Group(group) => group,
                Node::Handler(_) => return,
            };
        }
        table.nodes.insert(last.to_string(), Node::Handler(handler));
    }

    /// Resolves a route path to its handler.
    pub fn endpoint(&self, route: &RoutePath) -> SyncResult<&Handler> {
        let not_found = |part: &str| SyncError::EndpointNotFound {
            part: part.to_string(),
            path: route.to_string(),
        };
        let mut table = self;
        let mut parts = route.parts().peekable();
        while let Some(part) = parts.next() {
            match table.nodes.get(part) {
                Some(Node::Handler(handler)) if parts.peek().is_none() => return Ok(handler),
                Some(Node::Handler(_)) => {
                    let next = parts.peek().copied().unwrap_or(part);
                    return Err(not_found(next));
                }
                Some(Node::Group(group)) => table = group,
                None => return Err(not_found(part)),
            }
        }
        Err(SyncError::NotAnEndpoint(route.to_string()))
    }

    /// Every registered handler path, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_routes("", &mut out);
        out
    }

    fn collect_routes(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, node) in &self.nodes {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match node {
                Node::Handler(_) => out.push(path),
                Node::Group(group) => group.collect_routes(&path, out),
            }
        }
    }
}

impl fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoints")
            .field("routes", &self.routes())
            .finish()
    }
}

impl ApiGateway for Endpoints {
    fn call(&self, route: &RoutePath, args: Value, replier: Replier) -> ModelResult<()> {
        let handler = self.endpoint(route)?;
        debug!(route = %route, request = replier.request_id(), "dispatching api call");
        handler(args, replier)
    }
}

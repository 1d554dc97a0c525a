//! The remote API contract.
//!
//! The registry never talks to a transport directly. It hands a dotted
//! [`RoutePath`], the call arguments and a [`Replier`] to an
//! [`ApiGateway`]; the gateway answers through the replier, immediately
//! or later from another thread. Replies are queued on a channel owned by
//! the registry and applied by `Registry::dispatch_replies`.

use std::fmt;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};

/// Identifies one gateway call.
pub type RequestId = u64;

/// A dotted route name such as `users.list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutePath(String);

impl RoutePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dot-separated segments.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Transport-level metadata of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: 200,
            message: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self::ok()
    }
}

/// A reply travelling back to the registry.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub request: RequestId,
    pub data: Value,
    pub response: ApiResponse,
}

/// One-shot handle for answering a gateway call.
#[derive(Debug)]
pub struct Replier {
    request: RequestId,
    route: RoutePath,
    tx: Sender<Delivery>,
}

impl Replier {
    pub fn new(request: RequestId, route: RoutePath, tx: Sender<Delivery>) -> Self {
        Self { request, route, tx }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request
    }

    #[must_use]
    pub fn route(&self) -> &RoutePath {
        &self.route
    }

    /// Sends the reply. Fails only when the registry has been dropped.
    pub fn reply(self, data: Value, response: ApiResponse) -> ModelResult<()> {
        self.tx
            .send(Delivery {
                request: self.request,
                data,
                response,
            })
            .map_err(|_| ModelError::Gateway(format!("reply channel closed for {}", self.route)))
    }

    /// Replies with a `200` response.
    pub fn ok(self, data: Value) -> ModelResult<()> {
        self.reply(data, ApiResponse::ok())
    }
}

/// Resolves route paths to remote operations.
pub trait ApiGateway: Send + Sync {
    /// Starts the call. Resolution failures are returned directly; the
    /// outcome of the remote operation arrives through `replier`.
    fn call(&self, route: &RoutePath, args: Value, replier: Replier) -> ModelResult<()>;
}

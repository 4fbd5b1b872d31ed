//! Query descriptors and loader function types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::data::client::DataClient;
use crate::data::coordinator::LoaderError;
use crate::routing::Params;
use crate::server::RequestMeta;

/// Identifies a GraphQL query: a stable name plus the query text sent
/// upstream. The client replays the same pair against its own cache.
#[derive(Debug, Clone, Serialize)]
pub struct QueryDescriptor {
    pub name: String,
    pub text: String,
}

impl QueryDescriptor {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// The result of preloading a query: the descriptor and variables that
/// produced it, plus the fetched data for server-side consumption.
#[derive(Debug, Clone)]
pub struct PreloadedQuery {
    pub query: QueryDescriptor,
    pub variables: Value,
    pub data: Value,
}

impl PreloadedQuery {
    /// The client-facing serialization: descriptor and variables only.
    /// Raw data never leaves the server this way; the client re-derives it
    /// from the record snapshot with a cache-only fetch policy.
    pub fn hydration_payload(&self) -> Value {
        json!({
            "query": self.query,
            "variables": self.variables,
        })
    }
}

/// Everything a loader receives. Loaders are plain function pointers; any
/// state they need arrives here rather than being captured.
pub struct LoaderArgs {
    /// Params extracted by the route matcher (empty for the root loader).
    pub params: Params,

    /// The inbound request, for headers and body.
    pub request: Arc<RequestMeta>,

    /// The per-request data client to preload into.
    pub client: Arc<DataClient>,
}

pub type LoaderFuture = Pin<Box<dyn Future<Output = Result<PreloadedQuery, LoaderError>> + Send>>;

/// A route or root data loader, resolved ahead of time.
pub type LoaderFn = fn(LoaderArgs) -> LoaderFuture;

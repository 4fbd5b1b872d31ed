//! Per-request upstream data client.
//!
//! # Responsibilities
//! - POST `{query, variables}` to the configured GraphQL endpoint
//! - Forward the inbound request's cookie header upstream
//! - Normalize responses into the request's record store
//! - Abort in-flight fetches when the request is cancelled
//!
//! # Design Decisions
//! - The underlying HTTP connection pool is shared process-wide; everything
//!   stateful (store, cookie, cancellation) lives here, one per request

use std::sync::RwLock;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::data::query::{PreloadedQuery, QueryDescriptor};
use crate::data::store::RecordStore;

/// Error type for upstream fetches.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream fetch cancelled")]
    Cancelled,

    #[error("upstream returned errors: {0}")]
    GraphQL(String),

    #[error("upstream response carried no data")]
    MissingData,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorEntry {
    message: String,
}

/// Data-fetching client bound to a single request.
pub struct DataClient {
    http: reqwest::Client,
    url: String,
    cookie: Option<String>,
    store: RwLock<RecordStore>,
    cancel: CancellationToken,
}

impl DataClient {
    pub fn new(
        http: reqwest::Client,
        url: String,
        cookie: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            http,
            url,
            cookie,
            store: RwLock::new(RecordStore::new()),
            cancel,
        }
    }

    /// Execute a query upstream and normalize the response into the store.
    pub async fn execute(
        &self,
        query: &QueryDescriptor,
        variables: &Value,
    ) -> Result<Value, UpstreamError> {
        let fetch = async {
            let mut request = self
                .http
                .post(&self.url)
                .json(&json!({ "query": query.text, "variables": variables }));
            if let Some(cookie) = &self.cookie {
                request = request.header(reqwest::header::COOKIE, cookie);
            }

            let response = request.send().await?;
            let body: GraphQLResponse = response.json().await?;
            Ok::<_, UpstreamError>(body)
        };

        let body = tokio::select! {
            body = fetch => body?,
            _ = self.cancel.cancelled() => {
                tracing::debug!(query = %query.name, "upstream fetch cancelled");
                return Err(UpstreamError::Cancelled);
            }
        };

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let joined = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(UpstreamError::GraphQL(joined));
        }

        let data = body.data.ok_or(UpstreamError::MissingData)?;

        self.store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .normalize(variables, &data);

        Ok(data)
    }

    /// Fetch a query and wrap it with its descriptor and variables so the
    /// client can replay the identical pair against its own cache.
    pub async fn preload(
        &self,
        query: QueryDescriptor,
        variables: Value,
    ) -> Result<PreloadedQuery, UpstreamError> {
        let data = self.execute(&query, &variables).await?;
        Ok(PreloadedQuery {
            query,
            variables,
            data,
        })
    }

    /// Snapshot of every record accumulated so far. Taken after the stream
    /// has flushed so hydration sees a superset of what was rendered.
    pub fn store_snapshot(&self) -> Value {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .snapshot()
    }

    pub fn record_count(&self) -> usize {
        self.store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

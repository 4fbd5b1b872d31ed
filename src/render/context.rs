//! Per-request render context.
//!
//! # Responsibilities
//! - Resolve the route match for the request's pathname
//! - Run the loading phase (root + route loaders, joined) to completion
//! - Construct the request-bound data client, forwarding the inbound
//!   cookie header to the upstream data source
//! - Attach the head metadata container and style sink side channels
//!
//! Exclusively owned by one in-flight request; never shared across
//! requests; dropped when the response finishes or aborts.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::data::{coordinate, DataClient, LoaderError, LoaderFn, LoaderOutcome};
use crate::render::head::HeadHandle;
use crate::render::styles::StyleSink;
use crate::routing::{match_route, Route, RouteMatch};
use crate::server::RequestMeta;

/// Error type for context construction.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Everything the context builder needs for one request.
pub struct ContextOptions<'a> {
    /// The inbound request.
    pub request: Arc<RequestMeta>,

    /// Registered routes, matched in declaration order.
    pub routes: &'a [Route],

    /// Optional root bootstrapping loader, independent of the route match.
    pub root_loader: Option<LoaderFn>,

    /// Upstream data source endpoint.
    pub upstream_url: &'a str,

    /// Shared HTTP connection pool; everything stateful stays per-request.
    pub http: reqwest::Client,

    /// Pathname with the configured base already stripped.
    pub pathname: String,

    /// Request-scoped cancellation; cancelled on disconnect or teardown.
    pub cancel: CancellationToken,
}

/// Per-request aggregate consumed by the rendering step.
pub struct RenderContext {
    /// Data-fetching client bound to this request.
    pub client: Arc<DataClient>,

    /// Mutable head metadata container, filled during rendering.
    pub head: HeadHandle,

    /// Style rule side channel.
    pub styles: StyleSink,

    /// The route match, when any route matched.
    pub route_match: Option<RouteMatch>,

    /// Loader results from the loading phase.
    pub loaders: LoaderOutcome,

    /// Resolved pathname.
    pub pathname: String,

    /// Request-scoped cancellation token.
    pub cancel: CancellationToken,
}

/// Build the context for one request: match the route, run the loading
/// phase, and assemble the side channels. Rendering never begins until the
/// returned future resolves.
pub async fn build_context(opts: ContextOptions<'_>) -> Result<RenderContext, ContextError> {
    let route_match = match_route(&opts.pathname, opts.routes);

    match &route_match {
        Some(m) => tracing::debug!(path = %opts.pathname, route = %m.path, "route matched"),
        None => tracing::debug!(path = %opts.pathname, "no route matched"),
    }

    let client = Arc::new(DataClient::new(
        opts.http,
        opts.upstream_url.to_string(),
        opts.request.cookie().map(str::to_string),
        opts.cancel.child_token(),
    ));

    let loaders = coordinate(
        opts.root_loader,
        route_match.as_ref(),
        opts.request.clone(),
        client.clone(),
    )
    .await?;

    tracing::debug!(
        path = %opts.pathname,
        records = client.record_count(),
        "loading phase complete"
    );

    Ok(RenderContext {
        client,
        head: HeadHandle::default(),
        styles: StyleSink::default(),
        route_match,
        loaders,
        pathname: opts.pathname,
        cancel: opts.cancel,
    })
}

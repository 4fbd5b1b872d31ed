//! Loader coordination.
//!
//! # Responsibilities
//! - Invoke a matched route's loader with its extracted params
//! - Join the optional root bootstrapping loader and the route loader
//!   concurrently, preserving which result belongs to which loader
//! - Log and propagate loader failures; expose no partial results

use std::sync::Arc;

use crate::data::client::{DataClient, UpstreamError};
use crate::data::query::{LoaderArgs, LoaderFn, PreloadedQuery};
use crate::routing::{Params, RouteMatch};
use crate::server::RequestMeta;

/// Error type for loader invocation.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("loader failed: {0}")]
    Failed(String),
}

/// Results of the loading phase, associated by name rather than position.
#[derive(Debug, Default)]
pub struct LoaderOutcome {
    /// Result of the root bootstrapping loader, when configured.
    pub root: Option<PreloadedQuery>,

    /// Result of the matched route's loader, when the route has one.
    pub route: Option<PreloadedQuery>,
}

/// Invoke the matched route's loader. Returns `Ok(None)` when the route has
/// no loader; failures are logged with request context and propagated.
pub async fn load_route_data(
    route_match: &RouteMatch,
    request: Arc<RequestMeta>,
    client: Arc<DataClient>,
) -> Result<Option<PreloadedQuery>, LoaderError> {
    let Some(loader) = route_match.loader else {
        return Ok(None);
    };

    let args = LoaderArgs {
        params: route_match.params.clone(),
        request,
        client,
    };

    match loader(args).await {
        Ok(data) => Ok(Some(data)),
        Err(err) => {
            tracing::error!(
                path = %route_match.pathname,
                route = %route_match.path,
                error = %err,
                "route loader failed"
            );
            Err(err)
        }
    }
}

/// Run the root loader (when configured) and the route loader (when the
/// match has one) concurrently and collect both results. Rendering must not
/// begin until this resolves. A failure in either loader fails the whole
/// step; partial results are discarded.
pub async fn coordinate(
    root_loader: Option<LoaderFn>,
    route_match: Option<&RouteMatch>,
    request: Arc<RequestMeta>,
    client: Arc<DataClient>,
) -> Result<LoaderOutcome, LoaderError> {
    let root_fut = {
        let request = request.clone();
        let client = client.clone();
        async move {
            match root_loader {
                Some(loader) => {
                    let args = LoaderArgs {
                        params: Params::new(),
                        request,
                        client,
                    };
                    match loader(args).await {
                        Ok(data) => Ok(Some(data)),
                        Err(err) => {
                            tracing::error!(error = %err, "root loader failed");
                            Err(err)
                        }
                    }
                }
                None => Ok(None),
            }
        }
    };

    let route_fut = async {
        match route_match {
            Some(m) => load_route_data(m, request, client).await,
            None => Ok(None),
        }
    };

    let (root, route) = tokio::try_join!(root_fut, route_fut)?;

    Ok(LoaderOutcome { root, route })
}

//! SSR request handler.
//!
//! # Responsibilities
//! - Distill the inbound request and resolve its pathname against the base
//! - Build the render context (route match + loading phase)
//! - Resolve the render target and start rendering
//! - Arm the abort timer and hand the stream to the lifecycle controller
//!
//! # Failure semantics
//! - No match and no fallback target: plain 404, never an error page
//! - Loader failure: request fails early with a 500-class response,
//!   diagnostic body outside production
//! - Everything downstream of readiness is the lifecycle controller's
//!   problem

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::document::DocumentSettings;
use crate::render::lifecycle::{drive, error_page};
use crate::render::{build_context, ContextError, ContextOptions};
use crate::server::request::{RequestMeta, X_REQUEST_ID};
use crate::server::setup::AppState;

pub(crate) async fn ssr_handler(State(state): State<AppState>, request: Request) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let meta = RequestMeta::from_request(request, state.config.ssr.max_body_bytes).await;
    let pathname = state.config.resolve_pathname(meta.url.path());

    tracing::debug!(
        request_id = %request_id,
        method = %meta.method,
        path = %pathname,
        "SSR request"
    );

    // Cancelled on disconnect (via the body's drop guard) or teardown;
    // in-flight upstream fetches observe it through the data client.
    let cancel = CancellationToken::new();

    let ctx = match build_context(ContextOptions {
        request: Arc::new(meta),
        routes: &state.routes,
        root_loader: state.root_loader,
        upstream_url: &state.config.upstream.url,
        http: state.http.clone(),
        pathname: pathname.clone(),
        cancel: cancel.clone(),
    })
    .await
    {
        Ok(ctx) => Arc::new(ctx),
        Err(ContextError::Loader(err)) => {
            tracing::error!(
                request_id = %request_id,
                path = %pathname,
                error = %err,
                "data loading failed"
            );
            cancel.cancel();
            return error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                &err.to_string(),
                state.config.is_production,
            );
        }
    };

    // A missing match renders through the fallback target (the
    // application's own not-found view) when one is configured.
    let target_id = ctx
        .route_match
        .as_ref()
        .map(|m| m.target.clone())
        .or_else(|| state.fallback_target.clone());
    let Some(target_id) = target_id else {
        tracing::debug!(request_id = %request_id, path = %pathname, "no route and no fallback target");
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    let Some(target) = state.targets.get(&target_id) else {
        // Registration is checked at setup; reaching this means routes were
        // built outside SsrServer::new.
        tracing::error!(request_id = %request_id, target = %target_id, "render target not registered");
        return error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "render target not registered",
            state.config.is_production,
        );
    };

    let stream = target.render(ctx.clone());

    // Safety net against stalled subtrees. Always fires; aborting an
    // already-finished render is a no-op.
    let abort = stream.abort_handle();
    let delay = Duration::from_millis(state.config.ssr.abort_delay_ms);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        abort.abort();
    });

    drive(
        stream,
        ctx,
        state.template.clone(),
        state.manifest.clone(),
        DocumentSettings::from_config(&state.config),
        request_id,
    )
    .await
}

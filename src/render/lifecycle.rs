//! Render lifecycle controller.
//!
//! # Responsibilities
//! - Drive the render event stream through an explicit state machine:
//!   `Pending → ShellFailed | Streaming → (Complete | Aborted | RenderFailed)`
//! - Hold the response uncommitted while pending, so shell failures still
//!   produce a clean error status and body
//! - Finalize status code and content type exactly once, at the streaming
//!   transition, based on whether an error occurred before that point
//! - Hand the stream to the document assembler once readiness is reached
//!
//! # Failure semantics
//! - Shell errors and loader errors: recoverable at the request level
//!   (error response), never fatal to the process
//! - Mid-stream render errors: logged, stream completes anyway
//! - Timeout: if it fires while pending, nothing was committed and the
//!   shell-error path applies; while streaming, the document truncates
//!   best-effort with headers already out

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::document::{AssetManifest, DocumentBody, DocumentSettings, TemplateSplit};
use crate::render::context::RenderContext;
use crate::render::head::escape_text;
use crate::render::target::{RenderEvent, RenderStream};

/// States of one render's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Render requested, no readiness or failure signal yet.
    Pending,
    /// Initial render failed before any bytes were committed. Terminal.
    ShellFailed,
    /// Shell succeeded; response committed, chunks flowing.
    Streaming,
    /// A render error after streaming began; the stream continues.
    RenderFailed,
    /// All output flushed, hydration scripts appended. Terminal.
    Complete,
    /// The abort timer ended the render mid-stream. Terminal.
    Aborted,
}

impl RenderState {
    /// Guarded transition: invalid moves are logged and refused.
    pub(crate) fn advance(self, next: RenderState, request_id: &str) -> RenderState {
        if !self.can_advance(next) {
            tracing::warn!(
                request_id = %request_id,
                from = ?self,
                to = ?next,
                "invalid render state transition refused"
            );
            return self;
        }
        tracing::debug!(request_id = %request_id, from = ?self, to = ?next, "render state");
        next
    }

    fn can_advance(self, next: RenderState) -> bool {
        use RenderState::*;
        matches!(
            (self, next),
            (Pending, ShellFailed)
                | (Pending, Streaming)
                | (Streaming, Complete)
                | (Streaming, Aborted)
                | (Streaming, RenderFailed)
                | (RenderFailed, Complete)
                | (RenderFailed, Aborted)
        )
    }
}

/// Drive a render stream to a response.
///
/// Waits in `Pending` for readiness or failure, then commits the response
/// and streams the assembled document. The caller owns the abort timer;
/// this function only observes its effect (the producer going away).
pub async fn drive(
    mut stream: RenderStream,
    ctx: Arc<RenderContext>,
    template: Arc<TemplateSplit>,
    manifest: Arc<AssetManifest>,
    settings: DocumentSettings,
    request_id: String,
) -> Response {
    let mut state = RenderState::Pending;
    let mut did_error = false;

    loop {
        match stream.recv().await {
            Some(RenderEvent::RenderError(err)) => {
                // Not yet committed: the eventual status can still reflect it.
                tracing::error!(
                    request_id = %request_id,
                    path = %ctx.pathname,
                    error = %err,
                    "render error before streaming"
                );
                did_error = true;
            }
            Some(RenderEvent::ShellError(err)) => {
                state = state.advance(RenderState::ShellFailed, &request_id);
                tracing::error!(
                    request_id = %request_id,
                    path = %ctx.pathname,
                    error = %err,
                    state = ?state,
                    "shell render failed"
                );
                ctx.cancel.cancel();
                return error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &err.message,
                    settings.is_production,
                );
            }
            Some(RenderEvent::AllReady) => {
                state = state.advance(RenderState::Streaming, &request_id);
                break;
            }
            Some(RenderEvent::Chunk(_)) => {
                tracing::warn!(
                    request_id = %request_id,
                    "chunk before readiness discarded"
                );
            }
            None => {
                // Producer went away without signalling readiness: the
                // abort timer reaped it, or its task died.
                let timed_out = stream.is_aborted();
                state = state.advance(RenderState::ShellFailed, &request_id);
                tracing::error!(
                    request_id = %request_id,
                    path = %ctx.pathname,
                    timed_out,
                    state = ?state,
                    "render ended before readiness"
                );
                ctx.cancel.cancel();
                let detail = if timed_out {
                    "render timed out"
                } else {
                    "render terminated unexpectedly"
                };
                return error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    detail,
                    settings.is_production,
                );
            }
        }
    }

    let status = if did_error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    tracing::debug!(
        request_id = %request_id,
        path = %ctx.pathname,
        state = ?state,
        status = %status,
        "streaming document"
    );

    let body = DocumentBody::new(stream, ctx, template, manifest, settings, request_id);

    match Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html")
        .body(Body::from_stream(body))
    {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "could not build streaming response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Minimal error page, sent only while the response is still uncommitted.
/// Diagnostic detail is shown outside production.
pub(crate) fn error_page(status: StatusCode, detail: &str, is_production: bool) -> Response {
    let body = if is_production {
        "<h1>Something went wrong</h1>".to_string()
    } else {
        format!("<h1>Something went wrong: {}</h1>", escape_text(detail))
    };
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

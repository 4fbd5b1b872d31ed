//! Streaming document assembly.
//!
//! # Responsibilities
//! - Emit the document prelude once streaming begins: html_start, head
//!   markup, stylesheet links, dev-mode inline styles, body_start
//! - Pipe render chunks through verbatim, order-preserving
//! - On stream completion, append the hydration scripts (record snapshot,
//!   loader descriptor) and html_end
//! - Propagate client disconnect to the request's cancellation token
//!
//! # Design Decisions
//! - The body is an explicit four-phase state machine implementing
//!   `Stream`, not a chain of callbacks
//! - The record snapshot is serialized at trailer time, after every chunk
//!   has been forwarded, so hydration sees the cache as of full flush
//! - Mid-stream render errors are logged and do not stop the document from
//!   completing

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio_util::sync::DropGuard;

use crate::config::ServerConfig;
use crate::document::manifest::AssetManifest;
use crate::document::template::TemplateSplit;
use crate::render::context::RenderContext;
use crate::render::target::{RenderEvent, RenderStream};

/// Document-level knobs extracted from the server config.
#[derive(Debug, Clone)]
pub struct DocumentSettings {
    pub base: String,
    pub is_dev: bool,
    pub is_production: bool,
    pub global_stylesheet: Option<String>,
}

impl DocumentSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            base: config.base.clone(),
            is_dev: config.is_dev,
            is_production: config.is_production,
            global_stylesheet: config.assets.global_stylesheet.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Prelude,
    Body,
    Trailer,
    Done,
}

/// The streamed response body.
pub struct DocumentBody {
    stream: RenderStream,
    ctx: Arc<RenderContext>,
    template: Arc<TemplateSplit>,
    manifest: Arc<AssetManifest>,
    settings: DocumentSettings,
    request_id: String,
    phase: Phase,
    // Cancels the request token when the body is dropped (client
    // disconnect or normal completion), reaping in-flight upstream fetches.
    _disconnect: DropGuard,
}

impl DocumentBody {
    pub fn new(
        stream: RenderStream,
        ctx: Arc<RenderContext>,
        template: Arc<TemplateSplit>,
        manifest: Arc<AssetManifest>,
        settings: DocumentSettings,
        request_id: String,
    ) -> Self {
        let disconnect = ctx.cancel.clone().drop_guard();
        Self {
            stream,
            ctx,
            template,
            manifest,
            settings,
            request_id,
            phase: Phase::Prelude,
            _disconnect: disconnect,
        }
    }

    /// Everything written before any streamed content: html_start, head
    /// metadata, stylesheet links, style payload, body_start. None of it
    /// may depend on render success; the status line is already out.
    fn prelude(&self) -> Bytes {
        let mut out = String::with_capacity(self.template.html_start.len() + 256);
        out.push_str(&self.template.html_start);
        out.push_str(&self.ctx.head.to_markup());
        out.push_str(&self.stylesheet_links());
        out.push_str(&self.style_payload());
        out.push_str(&self.template.body_start);
        Bytes::from(out)
    }

    fn stylesheet_links(&self) -> String {
        let Some(path) = &self.settings.global_stylesheet else {
            return String::new();
        };

        if self.settings.is_dev {
            // Dev servers resolve the source path directly.
            return format!(r#"<link rel="stylesheet" href="{path}">"#);
        }

        // Production: resolve the content-hashed filename from the build
        // manifest. An unresolvable asset emits nothing.
        let base = if self.settings.base.ends_with('/') {
            self.settings.base.clone()
        } else {
            format!("{}/", self.settings.base)
        };
        self.manifest
            .css_for(path)
            .iter()
            .map(|file| format!(r#"<link rel="stylesheet" href="{base}{file}">"#))
            .collect()
    }

    fn style_payload(&self) -> String {
        let css = self.ctx.styles.css();
        if self.settings.is_dev && !css.is_empty() {
            format!(r#"<style data-inline="true">{css}</style>"#)
        } else {
            // Production relies on static extraction; the marker only aids
            // debugging.
            "<!-- no inline styles outside dev mode -->".to_string()
        }
    }

    /// Appended only once the producer's stream has ended: the two
    /// hydration scripts, then the document tail.
    fn trailer(&self) -> Bytes {
        let snapshot = self.ctx.client.store_snapshot();
        let records = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());

        let loader = match &self.ctx.loaders.route {
            Some(preloaded) => serde_json::to_string(&preloaded.hydration_payload())
                .unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        };

        let mut out = String::with_capacity(records.len() + loader.len() + 128);
        out.push_str("<script>window.__RECORD_SOURCE = ");
        out.push_str(&escape_script(&records));
        out.push_str("</script>");
        out.push_str("<script>window.__LOADER_DATA = ");
        out.push_str(&escape_script(&loader));
        out.push_str("</script>");
        out.push_str(&self.template.html_end);
        Bytes::from(out)
    }
}

impl Stream for DocumentBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.phase {
                Phase::Prelude => {
                    this.phase = Phase::Body;
                    return Poll::Ready(Some(Ok(this.prelude())));
                }
                Phase::Body => match this.stream.poll_recv(cx) {
                    Poll::Ready(Some(RenderEvent::Chunk(bytes))) => {
                        return Poll::Ready(Some(Ok(bytes)));
                    }
                    Poll::Ready(Some(RenderEvent::RenderError(err))) => {
                        // Headers are committed; log and keep streaming.
                        tracing::error!(
                            request_id = %this.request_id,
                            path = %this.ctx.pathname,
                            error = %err,
                            "render error mid-stream"
                        );
                    }
                    Poll::Ready(Some(other)) => {
                        tracing::warn!(
                            request_id = %this.request_id,
                            event = ?other,
                            "unexpected render event while streaming"
                        );
                    }
                    Poll::Ready(None) => {
                        this.phase = Phase::Trailer;
                    }
                    Poll::Pending => return Poll::Pending,
                },
                Phase::Trailer => {
                    if this.stream.is_aborted() {
                        tracing::warn!(
                            request_id = %this.request_id,
                            path = %this.ctx.pathname,
                            "render aborted; document truncated best-effort"
                        );
                    } else {
                        tracing::debug!(
                            request_id = %this.request_id,
                            path = %this.ctx.pathname,
                            records = this.ctx.client.record_count(),
                            "stream complete; appending hydration scripts"
                        );
                    }
                    this.phase = Phase::Done;
                    return Poll::Ready(Some(Ok(this.trailer())));
                }
                Phase::Done => return Poll::Ready(None),
            }
        }
    }
}

/// Keep serialized JSON from terminating the surrounding script element.
/// `<\/` is a valid JSON string escape, so this is safe anywhere `</`
/// appears in the payload.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

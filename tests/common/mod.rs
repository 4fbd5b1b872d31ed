//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use tapped::render::{RenderContext, RenderStream, RenderTarget};
use tapped::SsrServer;

type Responder = Arc<dyn Fn(&HeaderMap, Value) -> Value + Send + Sync>;

/// Start a mock GraphQL upstream answering every `/graphql` POST through
/// `respond(headers, payload)`. Returns the bound address.
pub async fn start_mock_upstream<F>(respond: F) -> SocketAddr
where
    F: Fn(&HeaderMap, Value) -> Value + Send + Sync + 'static,
{
    let responder: Responder = Arc::new(respond);
    let app = Router::new()
        .route("/graphql", post(graphql_handler))
        .with_state(responder);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

async fn graphql_handler(
    State(responder): State<Responder>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<Value> {
    Json(responder(&headers, payload))
}

/// Serve an assembled SSR server on an ephemeral port.
pub async fn serve(server: SsrServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    addr
}

/// Template used across pipeline tests.
pub const TEMPLATE: &str = "<html><head><!--app-head--></head><body><div id=\"root\"><!--app-html--></div></body></html>";

/// Assert that `needles` occur in `haystack` in the given order.
#[allow(dead_code)]
pub fn assert_order(haystack: &str, needles: &[&str]) {
    let mut pos = 0;
    for needle in needles {
        match haystack[pos..].find(needle) {
            Some(offset) => pos += offset + needle.len(),
            None => panic!("expected {needle:?} after byte {pos}, body: {haystack}"),
        }
    }
}

/// Target emitting fixed chunks after readiness.
#[allow(dead_code)]
pub struct ChunksTarget(pub Vec<&'static str>);

impl RenderTarget for ChunksTarget {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        let chunks = self.0.clone();
        RenderStream::spawn(&ctx, move |producer| async move {
            producer.all_ready().await;
            for chunk in chunks {
                producer.chunk(chunk).await;
            }
        })
    }
}

/// Target printing the matched route params.
#[allow(dead_code)]
pub struct ParamsTarget;

impl RenderTarget for ParamsTarget {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        let page_ctx = ctx.clone();
        RenderStream::spawn(&ctx, move |producer| async move {
            producer.all_ready().await;
            if let Some(route_match) = &page_ctx.route_match {
                let mut params: Vec<_> = route_match.params.iter().collect();
                params.sort();
                for (name, value) in params {
                    producer.chunk(format!("{name}={value};")).await;
                }
            }
        })
    }
}

/// Target that never reaches readiness until aborted.
#[allow(dead_code)]
pub struct StalledTarget;

impl RenderTarget for StalledTarget {
    fn render(&self, ctx: Arc<RenderContext>) -> RenderStream {
        RenderStream::spawn(&ctx, move |producer| async move {
            producer.aborted().await;
        })
    }
}

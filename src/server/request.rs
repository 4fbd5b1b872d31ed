//! Inbound request handling.
//!
//! # Responsibilities
//! - Distill the axum request into the `RequestMeta` loaders receive
//! - Buffer the body for non-GET/HEAD requests, bounded
//! - Generate per-request ids for log correlation

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Uuid-backed request id source for the request-id layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// The parts of the inbound request the pipeline reads: method, absolute
/// URL, headers (notably the cookie header forwarded upstream), and the
/// buffered body for non-GET/HEAD requests.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestMeta {
    /// Consume an axum request. The URL is reconstructed from the Host
    /// header; bodies larger than `max_body_bytes` are dropped with a
    /// warning rather than failing the request.
    pub async fn from_request(request: Request, max_body_bytes: usize) -> Self {
        let (parts, body) = request.into_parts();

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = parse_or_local(&format!("http://{host}{path_and_query}"));

        let body = if parts.method == Method::GET || parts.method == Method::HEAD {
            None
        } else {
            match axum::body::to_bytes(body, max_body_bytes).await {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    tracing::warn!(error = %err, "could not buffer request body");
                    None
                }
            }
        };

        Self {
            method: parts.method,
            url,
            headers: parts.headers,
            body,
        }
    }

    /// A synthetic GET request, for tests and programmatic rendering.
    pub fn synthetic(url: &str) -> Self {
        Self {
            method: Method::GET,
            url: parse_or_local(url),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The session/credential cookie header, forwarded upstream verbatim.
    pub fn cookie(&self) -> Option<&str> {
        self.headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
    }
}

fn parse_or_local(input: &str) -> Url {
    Url::parse(input).unwrap_or_else(|err| {
        tracing::warn!(url = %input, error = %err, "unparseable request URL");
        // Statically valid.
        Url::parse("http://localhost/").expect("fallback URL parses")
    })
}

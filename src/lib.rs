//! SSR bridge library.
//!
//! Glues together a route matcher, a GraphQL data-fetching client, and an
//! HTTP server so component trees can be rendered on the server with
//! preloaded data, then hydrated on the client from the same cached records.
//!
//! # Architecture Overview
//!
//! ```text
//! Incoming request
//!     → routing   (pathname → RouteMatch with extracted params)
//!     → data      (root + route loaders joined concurrently,
//!                  upstream GraphQL fetches normalized into a record store)
//!     → render    (per-request RenderContext, render target produces an
//!                  event stream, lifecycle state machine drives it)
//!     → document  (template split + head/style injection + chunk piping
//!                  + hydration scripts appended at stream end)
//!     → HTTP response (streamed)
//! ```

pub mod config;
pub mod data;
pub mod document;
pub mod render;
pub mod routing;
pub mod server;

pub use config::ServerConfig;
pub use data::{DataClient, LoaderArgs, LoaderFn, PreloadedQuery, QueryDescriptor};
pub use render::{RenderContext, RenderEvent, RenderProducer, RenderStream, RenderTarget};
pub use routing::{match_route, Route, RouteMatch};
pub use server::{RequestMeta, SsrOptions, SsrServer, TargetRegistry};

//! Data-fetching subsystem.
//!
//! # Data Flow
//! ```text
//! LoaderFn (route or root bootstrap)
//!     → query.rs (descriptor + variables)
//!     → client.rs (POST {query, variables} upstream, cookie forwarded)
//!     → store.rs (response normalized into keyed records)
//!     → PreloadedQuery (descriptor + variables + data)
//!     → coordinator.rs (root and route loaders joined concurrently)
//! ```
//!
//! # Design Decisions
//! - The client, its record store, and its cancellation token are created
//!   fresh per request and never shared across requests
//! - Loaders are typed function pointers receiving everything they need via
//!   `LoaderArgs`; no environment is captured
//! - A failure in either concurrent loader fails the whole coordination
//!   step; no partial result is exposed

pub mod client;
pub mod coordinator;
pub mod query;
pub mod store;

pub use client::{DataClient, UpstreamError};
pub use coordinator::{coordinate, load_route_data, LoaderError, LoaderOutcome};
pub use query::{LoaderArgs, LoaderFn, LoaderFuture, PreloadedQuery, QueryDescriptor};
pub use store::RecordStore;

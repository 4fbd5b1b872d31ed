//! HTTP server subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → setup.rs (axum router, request-id + trace layers, static assets
//!       and compression in production)
//!     → request.rs (inbound request distilled into RequestMeta)
//!     → handler.rs (match → load → render → stream)
//!     → streamed response
//! ```

pub mod handler;
pub mod request;
pub mod setup;

pub use request::{RequestMeta, UuidRequestId, X_REQUEST_ID};
pub use setup::{SetupError, SsrOptions, SsrServer};

pub use crate::render::TargetRegistry;

//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! RenderContext (context.rs: match + loader results + side channels)
//!     → RenderTarget::render (target.rs: producer task, event stream)
//!     → lifecycle.rs (state machine: pending → shell-error | streaming)
//!     → document::DocumentBody (chunk piping + injections)
//! ```
//!
//! # Design Decisions
//! - Targets are a minimal capability interface: accept a context, produce
//!   a stream of render events; nothing about them is inspected at runtime
//! - The lifecycle is an explicit state machine with guarded transitions,
//!   not informally-once callbacks
//! - Abort is an idempotent token cancel; firing after completion is a
//!   harmless no-op

pub mod context;
pub mod head;
pub mod lifecycle;
pub mod styles;
pub mod target;

pub use context::{build_context, ContextError, ContextOptions, RenderContext};
pub use head::HeadHandle;
pub use lifecycle::{drive, RenderState};
pub use styles::StyleSink;
pub use target::{
    AbortHandle, RenderError, RenderEvent, RenderProducer, RenderStream, RenderTarget,
    TargetRegistry,
};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved pathname
//!     → matcher.rs (segment-wise pattern evaluation)
//!     → route.rs definitions (declaration order, children before parent)
//!     → Return: RouteMatch with extracted params, or None
//! ```
//!
//! # Design Decisions
//! - Routes are plain configuration structs; loaders are typed function
//!   pointers resolved ahead of time, never closures over ambient state
//! - No regex: segment-wise comparison keeps matching O(path length)
//! - Deterministic and side-effect-free: same input always matches the
//!   same route
//! - First match wins (declaration order); a parent only yields itself
//!   when none of its children match the same pathname

pub mod matcher;
pub mod route;

pub use matcher::match_route;
pub use route::{Params, Route, RouteMatch};

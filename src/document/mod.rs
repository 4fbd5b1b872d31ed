//! Document assembly subsystem.
//!
//! # Data Flow
//! ```text
//! template file → template.rs (split at head/body markers, fail fast)
//! build manifest → manifest.rs (hashed asset lookup, non-fatal)
//! render events → assembler.rs
//!     html_start → head markup → stylesheet links → inline styles
//!     → body_start → chunks (verbatim, order-preserving)
//!     → record snapshot script → loader descriptor script → html_end
//! ```

pub mod assembler;
pub mod manifest;
pub mod template;

pub use assembler::{DocumentBody, DocumentSettings};
pub use manifest::AssetManifest;
pub use template::{TemplateError, TemplateSplit, BODY_MARKER, HEAD_MARKER};

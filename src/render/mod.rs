//! Section rendering.
//!
//! # Data Flow
//! ```text
//! SessionState + HitCounters + Signals
//!     → context.rs (RenderContext, template field names)
//!     → template.rs (parse, execute, escape)
//!     → HTML fragment
//! ```

pub mod context;
pub mod template;

pub use context::RenderContext;
pub use template::{html_escape, render, RenderError, Template, TemplateData};

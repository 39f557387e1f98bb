//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Playground directory
//!     → scanner.rs (walk, derive URL path from directory)
//!     → classify.rs (filename stem → method, kind, sequence index)
//!     → template.rs (frontmatter + sections)
//!     → RouteTable: URL path → kind → method → [ParsedFile]
//! ```
//!
//! # Design Decisions
//! - The table is rebuilt on every request, so edits show up immediately
//! - No shared cache: each request owns the table it built
//! - Deterministic: the same directory always yields the same table

pub mod classify;
pub mod scanner;
pub mod template;

pub use classify::{classify, Classification, ResponseKind};
pub use scanner::{normalize_path, scan, RouteEntry, RouteTable, ScanError};
pub use template::{Frontmatter, ParsedFile};

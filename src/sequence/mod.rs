//! Section sequencing.
//!
//! # Data Flow
//! ```text
//! [ParsedFile] (one route/kind/method list)
//!     → entries.rs (flatten into SectionEntry, loop groups)
//!     → cursor.rs (read session cursor, clamp, advance)
//!     → selected SectionEntry → render
//! ```

pub mod cursor;
pub mod entries;

pub use cursor::{clamp, next_position, select_and_advance, sequence_key};
pub use entries::{flatten, group_at, next_group, Group, SectionEntry};

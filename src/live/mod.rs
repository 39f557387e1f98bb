//! Live-stream subsystem.
//!
//! # Data Flow
//! ```text
//! live request
//!     → engine.rs start_position (cursor settled, cookie written)
//!     → LiveEngine task ── rendered HTML ──▶ mpsc ──▶ sse.rs (patch events)
//!            ▲
//!            └── Inbox ◀── bridge subscriptions (session / tab subjects)
//! ```

pub mod engine;
pub mod sse;

pub use engine::{start_position, Inbox, LiveEngine, LiveSettings, StreamEnd};
pub use sse::{into_sse, patch_elements, PATCH_ELEMENTS_EVENT};

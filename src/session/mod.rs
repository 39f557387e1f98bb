//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Cookie header
//!     → store.rs (verify signature, check TTL, decode)
//!     → SessionState (mutated by the dispatcher / live engine)
//!     → store.rs (re-sign) → Set-Cookie
//!
//! counters.rs: process-wide hits, shared across all sessions
//! ```

pub mod counters;
pub mod names;
pub mod state;
pub mod store;

pub use counters::HitCounters;
pub use state::SessionState;
pub use store::{attach_cookie, CookieSessionStore, SessionError, SessionStore};

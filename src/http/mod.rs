//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, static files)
//!     → request.rs (request ID, live marker, signal extraction)
//!     → handler.rs (scan, session, counters, HTML or live dispatch)
//!     → response.rs (error → status + detail)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::PlaygroundError;
pub use server::{AppState, HttpServer};

//! dsplay: a playground server for Datastar template fragments.
//!
//! # Architecture Overview
//!
//! ```text
//!   request ──▶ http::handler ──▶ routing::scan (fresh per request)
//!                    │                 classify + template parse
//!                    │
//!                    ├──▶ session (signed cookie, hit counters)
//!                    │
//!                    ├── HTML ──▶ sequence (cursor) ──▶ render ──▶ response
//!                    │                                    └──▶ bridge publish
//!                    │
//!                    └── live ──▶ live::LiveEngine task ──▶ SSE patches
//!                                       ▲
//!                                       └── bridge subscriptions
//! ```

pub mod bridge;
pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod live;
pub mod observability;
pub mod render;
pub mod routing;
pub mod sequence;
pub mod session;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

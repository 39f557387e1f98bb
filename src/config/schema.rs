//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the playground
//! server. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the playground server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Playground directory layout.
    pub playground: PlaygroundConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Live-stream behaviour.
    pub live: LiveConfig,

    /// Signal bridge settings.
    pub bridge: BridgeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where templates live and how they are recognised.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Root directory; its tree structure becomes the URL space.
    pub root: PathBuf,

    /// File extension marking a template (without the dot).
    pub extension: String,

    /// Directory under `root` served verbatim at `/static/`.
    pub static_dir: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: "html".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key used to sign session cookies.
    pub secret: String,

    /// Cookie name.
    pub cookie_name: String,

    /// Session lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // WARNING: development default, override with --secret or the config file.
            secret: "ds-play-dev-secret-change-me".to_string(),
            cookie_name: "ds-play".to_string(),
            max_age_secs: 3600,
        }
    }
}

/// Live-stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Header whose presence marks a live-update request.
    pub marker_header: String,

    /// Delay between sequential sections when a file sets none.
    pub default_delay_ms: u64,

    /// Fragments buffered between the engine and the connection.
    pub buffer: usize,

    /// Hard cap on a stream's lifetime in seconds (0 = until the client leaves).
    pub max_stream_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            marker_header: "datastar-request".to_string(),
            default_delay_ms: 5000,
            buffer: 16,
            max_stream_secs: 0,
        }
    }
}

/// Signal bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Subject prefix (`<namespace>.session.<id>`).
    pub namespace: String,

    /// Messages buffered per subject before slow subscribers lag.
    pub capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: "dspen".to_string(),
            capacity: 64,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Log the route table at startup.
    pub dump_routes: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            dump_routes: false,
        }
    }
}

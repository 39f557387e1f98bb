//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the playground handler and static files
//! - Wire up middleware (tracing, limits, timeouts, request ID)
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::bridge::{LocalBridge, SignalBridge};
use crate::config::ServerConfig;
use crate::http::handler::playground_handler;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::live::LiveSettings;
use crate::session::{CookieSessionStore, HitCounters, SessionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub counters: HitCounters,
    pub bridge: Arc<dyn SignalBridge>,
    pub shutdown: Shutdown,
}

impl AppState {
    /// State with the in-process bridge and signed-cookie sessions.
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        let sessions = Arc::new(CookieSessionStore::from_config(&config.session));
        let bridge = Arc::new(LocalBridge::new(config.bridge.capacity));
        Self {
            config: Arc::new(config),
            sessions,
            counters: HitCounters::new(),
            bridge,
            shutdown,
        }
    }

    pub fn live_settings(&self) -> LiveSettings {
        let live = &self.config.live;
        LiveSettings {
            default_delay: Duration::from_millis(live.default_delay_ms),
            max_lifetime: (live.max_stream_secs > 0)
                .then(|| Duration::from_secs(live.max_stream_secs)),
        }
    }
}

/// HTTP server for the playground.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, shutdown: Shutdown) -> Self {
        Self::with_state(AppState::new(config, shutdown))
    }

    /// Create a server around prepared state, e.g. with a different bridge.
    pub fn with_state(state: AppState) -> Self {
        let shutdown = state.shutdown.clone();
        let router = Self::build_router(state);
        Self { router, shutdown }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();
        let static_root = config.playground.root.join(&config.playground.static_dir);

        Router::new()
            .nest_service("/static", ServeDir::new(static_root))
            .fallback(playground_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

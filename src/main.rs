//! dsplay server binary.

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use dsplay::cli::Cli;
use dsplay::lifecycle::{spawn_signal_handler, Shutdown};
use dsplay::observability::{init_logging, metrics};
use dsplay::routing::{scan, scanner::log_route_table};
use dsplay::HttpServer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dsplay: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("dsplay: failed to initialize logging: {e}");
    }

    tracing::info!("dsplay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root = %config.playground.root.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.dump_routes {
        match scan(&config.playground.root, &config.playground.extension) {
            Ok(routes) => log_route_table(&routes),
            Err(e) => tracing::warn!(error = %e, "Initial scan failed"),
        }
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %config.listener.bind_address, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, shutdown);
    if let Err(e) = server.run(listener).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

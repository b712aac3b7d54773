//! Decomposer MCP Server Binary
//!
//! Runs the decomposition engine as an MCP server with stdio transport.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin decomposer-mcp
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Log level filter (e.g., `info`, `debug`, `decomposer=debug`)

use decomposer::mcp::DecomposerServer;
use decomposer::{LoggingObserver, MetricsObserver};
use rmcp::{transport::stdio, ServiceExt};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,decomposer=debug")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Decomposer MCP server"
    );

    let server = DecomposerServer::new();

    let bus = server.event_bus();
    tokio::spawn(LoggingObserver::new(&bus).run());
    let metrics_observer = MetricsObserver::new(&bus);
    let metrics = metrics_observer.metrics();
    tokio::spawn(metrics_observer.run());

    // Set up graceful shutdown
    let shutdown = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down");
            }
        }
    };

    info!("Listening on stdio transport");

    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!(error = %e, "Failed to start MCP server");
    })?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP service completed"),
                Err(e) => warn!(error = %e, "MCP service error"),
            }
        }
        _ = shutdown => {
            info!("Graceful shutdown complete");
        }
    }

    let report = match metrics.lock() {
        Ok(metrics) => metrics.report(),
        Err(poisoned) => poisoned.into_inner().report(),
    };
    info!("Session metrics\n{}", report);

    info!("Decomposer MCP server stopped");
    Ok(())
}

use netmcp::{
    config::{Cli, ServerConfig},
    mcp::{self, SessionRegistry, SharedRegistry},
    tools::ToolRegistry,
    AppState,
};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netmcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::try_from(Cli::parse())?;
    let tools = ToolRegistry::with_default_tools()?;
    tracing::info!(tools = tools.len(), "Tool registry loaded");

    let addr = config.bind_addr();
    let endpoint = config.endpoint.clone();
    let state = AppState::new(config, tools);
    let registry = state.registry.clone();
    let app = mcp::routes(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("MCP Streamable HTTP Server listening on http://{}{}", addr, endpoint);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT (or SIGTERM on unix) after draining every session.
///
/// Sessions are closed before the listener finishes so that open SSE
/// streams end and graceful shutdown can complete.
async fn shutdown_signal(registry: SharedRegistry) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down server...");
    let closed = SessionRegistry::drain(&registry).await;
    tracing::info!(closed, "Sessions drained");
}

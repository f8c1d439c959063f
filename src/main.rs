//! MCP Server Entry Point
//!
//! Loads `.env`, configures logging, reads the configuration from the
//! environment and starts the transports selected by `MCP_TRANSPORT_MODE`.
//! See `ServerConfig::from_env` for the recognised variables.

use mcp_tools_server::core::config::{ServerConfig, TransportMode};
use mcp_tools_server::core::server;

fn init_tracing() {
    // stdout carries JSON-RPC in stdio mode, so logs always go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mcp_tools_server=info,actix_web=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // A missing .env file is fine.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = &dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    let transport = config.transport;
    let state = server::app_state(config);

    match transport {
        TransportMode::Stdio => server::run_server_stdio(state).await,
        TransportMode::Http => server::run_server_http(state).await,
        TransportMode::Both => {
            let stdio_state = state.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(stdio_state).await {
                    tracing::error!(error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(state).await;

            // If HTTP server exits, abort STDIO task
            stdio_handle.abort();

            http_result
        }
    }
}

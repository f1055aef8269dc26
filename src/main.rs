//! MCP server binary entry point.

use anyhow::Result;
use sqlite_query_mcp::{
    config::{QueryConfig, ServerConfig},
    protocol::McpServerBuilder,
    server::{McpHandler, ServerStateBuilder},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let query = QueryConfig::builder().from_env()?.build()?;
    info!("Serving database at {}", query.database_path.display());

    let config = ServerConfig::builder().query(query).build();
    let state = Arc::new(ServerStateBuilder::new().config(config).build());

    info!("Server state initialized with {} tools", state.tools.len());

    let handler = McpHandler::new(state);
    let server = McpServerBuilder::new()
        .handler(handler)
        .name(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .build()?;

    info!("MCP server ready, waiting for requests...");

    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sqlite_query_mcp=info,warn"));

    // Structured logging to stderr; stdout carries the MCP protocol.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}

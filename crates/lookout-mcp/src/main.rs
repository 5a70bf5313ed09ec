//! Lookout MCP Server
//!
//! Model Context Protocol server exposing logs, traces, metrics, alerts and
//! dashboards of a SigNoz-compatible backend to agents.

mod server;
mod tools;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lookout_common::{BackendClient, BackendClientCache, Config};

use server::McpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lookout_mcp=debug".parse()?)
                .add_directive("lookout_common=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .json()
        .init();

    info!("Starting Lookout MCP server");

    let config = Config::load_or_default();
    info!(
        backend_url = %config.backend.url,
        service_key = config.backend.api_key.is_some(),
        mcp_port = config.mcp.port,
        "Configuration loaded"
    );

    if !config.mcp.enabled {
        warn!("MCP server disabled by configuration");
        return Ok(());
    }

    let client = BackendClient::new(&config.backend)?;

    // Check connectivity
    match client.health_check().await {
        Ok(_) => info!("Backend reachable"),
        Err(e) => error!(error = %e, "Backend health check failed - continuing anyway"),
    }

    let server = McpServer::new(BackendClientCache::for_backend(client), config.clone());

    let addr = SocketAddr::new(
        config
            .mcp
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        config.mcp.port,
    );

    info!(address = %addr, "Lookout MCP server listening");
    server.run(addr).await?;

    info!("Lookout MCP server stopped");
    Ok(())
}

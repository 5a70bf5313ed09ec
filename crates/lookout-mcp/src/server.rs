//! MCP Server implementation

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use lookout_common::{BackendClientCache, Config};

use crate::tools::{self, McpTool, ToolRegistry};

/// Header carrying a bare API key
const API_KEY_HEADER: &str = "x-api-key";

/// MCP Server state
pub struct McpServer {
    clients: BackendClientCache,
    config: Config,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(clients: BackendClientCache, config: Config) -> Self {
        Self {
            clients,
            config,
            tools: tools::create_tool_registry(),
        }
    }

    pub async fn run(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.into_router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    fn into_router(self) -> Router {
        let state = Arc::new(AppState {
            clients: self.clients,
            config: self.config,
            tools: self.tools,
        });

        Router::new()
            .route("/health", get(health_handler))
            .route("/ping", get(ping_handler))
            .route("/mcp", post(mcp_handler))
            .route("/tools", get(list_tools_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(state)
    }
}

struct AppState {
    clients: BackendClientCache,
    config: Config,
    tools: ToolRegistry,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Caller credential from `Authorization: Bearer <key>` or `X-API-Key: <key>`
fn credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let scheme = v.get(..7)?;
            scheme.eq_ignore_ascii_case("bearer ").then(|| &v[7..])
        });

    bearer
        .or_else(|| headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.clients.default_client().health_check().await {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "healthy"})),
        ),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "unhealthy"})),
        ),
    }
}

async fn ping_handler() -> impl IntoResponse {
    Json(serde_json::json!({"pong": true}))
}

/// List available MCP tools
async fn list_tools_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<&McpTool> = state.tools.list();
    Json(serde_json::json!({
        "tools": tools
    }))
}

/// Main MCP endpoint for tool invocation
async fn mcp_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<McpRequest>,
) -> impl IntoResponse {
    let credential = credential(&headers);
    info!(
        tool = %request.tool,
        authenticated = credential.is_some(),
        "MCP tool invocation"
    );

    let client = state.clients.resolve(credential);
    match tools::execute_tool(&client, &state.config.query, &request.tool, request.params).await {
        Ok(result) => (
            StatusCode::OK,
            Json(McpResponse {
                success: true,
                data: Some(result),
                error: None,
            }),
        ),
        Err(e) => {
            error!(tool = %request.tool, error = %e, "Tool execution failed");
            (
                StatusCode::OK,
                Json(McpResponse {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct McpRequest {
    tool: String,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

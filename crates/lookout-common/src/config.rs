//! Configuration for Lookout services

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Telemetry backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// MCP server configuration
    #[serde(default)]
    pub mcp: McpConfig,

    /// Query and paging defaults
    #[serde(default)]
    pub query: QueryConfig,
}

/// Telemetry backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://localhost:8080")
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// API key used when a caller does not present its own
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Header the API key is sent in
    #[serde(default = "default_auth_header")]
    pub auth_header: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    std::env::var("LOOKOUT_BACKEND_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// The service key has its own variable so it never picks up a caller key
/// exported for the CLI (`LOOKOUT_API_KEY`)
fn default_api_key() -> Option<String> {
    std::env::var("LOOKOUT_BACKEND_API_KEY").ok()
}

fn default_auth_header() -> String {
    "SIGNOZ-API-KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: default_api_key(),
            auth_header: default_auth_header(),
            timeout_secs: default_timeout(),
        }
    }
}

/// MCP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_mcp_port")]
    pub port: u16,

    /// Whether MCP server is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_mcp_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mcp_port(),
            enabled: default_true(),
        }
    }
}

/// Paging defaults applied to list-shaped tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size when the caller gives no limit
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest page a caller may request
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, crate::Error> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name("config.local").required(false))
            .add_source(config::Environment::with_prefix("LOOKOUT").separator("__"))
            .build()
            .map_err(|e| crate::Error::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load configuration with defaults (for when config file doesn't exist)
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

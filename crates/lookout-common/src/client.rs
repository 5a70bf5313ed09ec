//! HTTP client for the telemetry backend

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    config::BackendConfig,
    error::{Error, Result},
    types::{Signal, StructuredQuery},
};

/// Path of the structured query endpoint
pub const QUERY_RANGE_PATH: &str = "/api/v5/query_range";

/// Backend client bound to at most one API key.
///
/// The underlying connection pool is shared between all clones, so binding a
/// client to another key is cheap and cannot fail.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .field("auth_header", &self.auth_header)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl BackendClient {
    /// Create a new backend client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_header: config.auth_header.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Same backend, authenticated with `api_key`
    pub fn with_api_key(&self, api_key: &str) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            auth_header: self.auth_header.clone(),
            api_key: Some(api_key.to_string()),
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header(self.auth_header.as_str(), key),
            None => builder,
        }
    }

    /// Send a request and return its JSON body; non-2xx responses become
    /// [`Error::Backend`] with the body as received.
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Backend {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Check if the backend is reachable
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool> {
        self.send(self.request(Method::GET, "/api/v1/health"))
            .await
            .map(|_| true)
    }

    /// Run a structured query
    #[instrument(skip(self, query), fields(request_type = ?query.request_type))]
    pub async fn query_range(&self, query: &StructuredQuery) -> Result<Value> {
        debug!(queries = query.composite_query.queries.len(), "Sending query");
        self.send(self.request(Method::POST, QUERY_RANGE_PATH).json(query))
            .await
    }

    /// Services that reported spans in the window (epoch nanoseconds)
    #[instrument(skip(self))]
    pub async fn list_services(&self, start_ns: i64, end_ns: i64) -> Result<Value> {
        let body = serde_json::json!({
            "start": start_ns.to_string(),
            "end": end_ns.to_string(),
            "tags": [],
        });
        self.send(self.request(Method::POST, "/api/v1/services").json(&body))
            .await
    }

    /// All alerts currently known to the alert manager
    #[instrument(skip(self))]
    pub async fn list_alerts(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/api/v1/alerts")).await
    }

    /// Definition of one alert rule
    #[instrument(skip(self))]
    pub async fn get_alert_rule(&self, rule_id: &str) -> Result<Value> {
        self.send(self.request(Method::GET, &format!("/api/v1/rules/{rule_id}")))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_dashboards(&self) -> Result<Value> {
        self.send(self.request(Method::GET, "/api/v1/dashboards")).await
    }

    #[instrument(skip(self))]
    pub async fn get_dashboard(&self, id: Uuid) -> Result<Value> {
        self.send(self.request(Method::GET, &format!("/api/v1/dashboards/{id}")))
            .await
    }

    /// Attribute and resource keys available for `signal`
    #[instrument(skip(self))]
    pub async fn list_field_keys(&self, signal: &Signal, search: Option<&str>) -> Result<Value> {
        let mut query = vec![("signal", signal.as_str())];
        if let Some(search) = search {
            query.push(("searchText", search));
        }
        self.send(self.request(Method::GET, "/api/v1/fields/keys").query(&query))
            .await
    }

    /// Values seen for one field of `signal`
    #[instrument(skip(self))]
    pub async fn list_field_values(&self, signal: &Signal, name: &str, search: Option<&str>) -> Result<Value> {
        let mut query = vec![("signal", signal.as_str()), ("name", name)];
        if let Some(search) = search {
            query.push(("searchText", search));
        }
        self.send(self.request(Method::GET, "/api/v1/fields/values").query(&query))
            .await
    }
}

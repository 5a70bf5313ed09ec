//! Command handlers and the MCP server client they share

pub mod logs;
pub mod status;
pub mod tools;
pub mod traces;

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::OutputFormat;

/// Thin client for the MCP server's HTTP routes
pub struct McpClient {
    http: reqwest::Client,
    server_url: String,
    api_key: Option<String>,
}

impl McpClient {
    pub fn new(server_url: &str, api_key: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<(reqwest::StatusCode, Value)> {
        let resp = self
            .http
            .get(format!("{}{}", self.server_url, path))
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.server_url))?;
        let status = resp.status();
        Ok((status, resp.json::<Value>().await?))
    }

    /// Invoke a tool and return its `data`, failing with the server's error text
    pub async fn call_tool(&self, tool: &str, params: Value) -> anyhow::Result<Value> {
        debug!(tool, "Calling tool");

        let mut request = self
            .http
            .post(format!("{}/mcp", self.server_url))
            .json(&json!({"tool": tool, "params": params}));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.server_url))?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if resp.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(resp.get("data").cloned().unwrap_or(Value::Null))
        } else {
            let message = resp.get("error").and_then(Value::as_str).unwrap_or("unknown error");
            bail!("{tool} failed: {message}")
        }
    }
}

/// Parse `key=value` pairs into a params object; values that are valid JSON stay typed
pub fn parse_params(pairs: &[String]) -> anyhow::Result<Value> {
    let mut params = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid parameter '{pair}': expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid parameter '{pair}': empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(Value::Object(params))
}

/// Rows of a raw query result across all of its result sets
pub fn raw_rows(result: &Value) -> Vec<&Value> {
    result
        .pointer("/data/data/results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r.get("rows").and_then(Value::as_array))
                .flatten()
                .collect()
        })
        .unwrap_or_default()
}

/// Column names and rows of the first scalar result set
pub fn scalar_table(result: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let table = result.pointer("/data/data/results/0")?;
    let columns = table
        .get("columns")?
        .as_array()?
        .iter()
        .map(|c| c.get("name").and_then(Value::as_str).unwrap_or("?").to_string())
        .collect();
    let rows = table
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(Value::as_array)
                .map(|cells| cells.iter().map(cell_text).collect())
                .collect()
        })
        .unwrap_or_default();
    Some((columns, rows))
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() != 0.0)
            .map_or_else(|| n.to_string(), |f| format!("{f:.3}")),
        other => other.to_string(),
    }
}

/// Truncate to `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn print_json(value: &Value, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Compact => println!("{}", serde_json::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

pub fn print_table(columns: &[String], rows: &[Vec<String>]) {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
                .min(60)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", truncate(cell, *width), width = width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(columns));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in rows {
        println!("{}", line(row));
    }
}

//! MCP Tool implementations

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use lookout_common::{
    aggregate::{self, AggregationArgs},
    args::{from_params, lenient_i64, lenient_string},
    config::QueryConfig,
    filter::{FilterArgs, FilterExpr},
    pagination::{extract_items, paginate, PageArgs},
    timerange::{self, TimeUnit, TimeWindowArgs},
    types::{Direction, OrderBy, QuerySpec},
    BackendClient, Error, RequestType, Result, Signal, StructuredQuery,
};

/// MCP Tool definition
#[derive(Debug, Clone, Serialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, McpTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: McpTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&McpTool> {
        self.tools.get(name)
    }

    /// Tools sorted by name
    pub fn list(&self) -> Vec<&McpTool> {
        let mut tools: Vec<&McpTool> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn tool(name: &str, description: &str, input_schema: Value) -> McpTool {
    McpTool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Object schema from property fragments; later fragments win on name clashes
fn object_schema(required: &[&str], fragments: &[Value]) -> Value {
    let mut properties = Map::new();
    for fragment in fragments {
        if let Value::Object(props) = fragment {
            properties.extend(props.clone());
        }
    }
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

fn window_properties(default_range: &str) -> Value {
    json!({
        "timeRange": {
            "type": "string",
            "description": format!("Relative window ending now, e.g. 30m, 2h, 7d (default: {default_range}). Wins over start/end")
        },
        "start": {"type": "string", "description": "Window start as an epoch timestamp"},
        "end": {"type": "string", "description": "Window end as an epoch timestamp (default: now)"}
    })
}

fn page_properties() -> Value {
    json!({
        "offset": {"type": "string", "description": "Number of items to skip (default: 0)"},
        "limit": {"type": "string", "description": "Page size (default: 50, max: 500)"}
    })
}

fn common_filter_properties() -> Value {
    json!({
        "filter": {
            "type": "string",
            "description": "Filter expression, e.g. service.name = 'checkout' AND http.status_code >= 500"
        },
        "service": {"type": "string", "description": "Only this service"}
    })
}

fn log_filter_properties() -> Value {
    json!({
        "severity": {"type": "string", "description": "Severity text, e.g. ERROR"},
        "searchText": {"type": "string", "description": "Text the log body must contain"}
    })
}

fn trace_filter_properties() -> Value {
    json!({
        "operation": {"type": "string", "description": "Span name, e.g. GET /api/cart"},
        "error": {"type": "string", "description": "true for error spans only, false to exclude them"}
    })
}

fn aggregation_properties() -> Value {
    json!({
        "aggregation": {
            "type": "string",
            "enum": aggregate::AGGREGATION_VERBS,
            "description": "Aggregation to compute"
        },
        "aggregateOn": {
            "type": "string",
            "description": "Field to aggregate, required unless aggregation is count or rate"
        },
        "groupBy": {"type": "string", "description": "Comma-separated fields to group by"},
        "orderBy": {
            "type": "string",
            "description": "Expression to order by with optional asc/desc (default: the aggregation, desc)"
        },
        "limit": {"type": "string", "description": "Number of groups to return (default: 10)"}
    })
}

fn signal_property() -> Value {
    json!({
        "signal": {"type": "string", "enum": ["logs", "traces", "metrics"], "description": "Signal the field belongs to"}
    })
}

/// Create the default tool registry with all available tools
pub fn create_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(tool(
        "list_services",
        "List services that reported traces in the window.",
        object_schema(&[], &[window_properties("6h"), page_properties()]),
    ));

    registry.register(tool(
        "search_logs",
        "Search log records, newest first.",
        object_schema(
            &[],
            &[
                common_filter_properties(),
                log_filter_properties(),
                window_properties("1h"),
                page_properties(),
            ],
        ),
    ));

    registry.register(tool(
        "search_traces",
        "Search spans, newest first.",
        object_schema(
            &[],
            &[
                common_filter_properties(),
                trace_filter_properties(),
                window_properties("1h"),
                page_properties(),
            ],
        ),
    ));

    registry.register(tool(
        "get_trace_details",
        "Get every span of one trace in start order.",
        object_schema(
            &["traceId"],
            &[
                json!({"traceId": {"type": "string", "description": "Hex trace id"}}),
                window_properties("24h"),
            ],
        ),
    ));

    registry.register(tool(
        "aggregate_logs",
        "Compute counts, averages or percentiles over logs, optionally grouped. \
         Example: {\"aggregation\": \"count\", \"groupBy\": \"service.name\", \"severity\": \"ERROR\"}",
        object_schema(
            &["aggregation"],
            &[
                common_filter_properties(),
                log_filter_properties(),
                window_properties("1h"),
                aggregation_properties(),
            ],
        ),
    ));

    registry.register(tool(
        "aggregate_traces",
        "Compute counts, averages or percentiles over spans, optionally grouped. \
         Example: {\"aggregation\": \"p99\", \"aggregateOn\": \"duration_nano\", \"groupBy\": \"service.name\"}",
        object_schema(
            &["aggregation"],
            &[
                common_filter_properties(),
                trace_filter_properties(),
                window_properties("1h"),
                aggregation_properties(),
            ],
        ),
    ));

    registry.register(tool(
        "query_metrics",
        "Query a metric as a time series.",
        object_schema(
            &["metricName"],
            &[
                json!({
                    "metricName": {"type": "string", "description": "Metric to query"},
                    "timeAggregation": {
                        "type": "string",
                        "description": "Reduction within each series per step, e.g. avg, rate, sum (default: avg)"
                    },
                    "spaceAggregation": {
                        "type": "string",
                        "description": "Reduction across series, e.g. sum, avg, p99 (default: sum)"
                    },
                    "groupBy": {"type": "string", "description": "Comma-separated labels to group by"},
                    "stepInterval": {"type": "string", "description": "Step in seconds (default: 60)"}
                }),
                common_filter_properties(),
                window_properties("1h"),
            ],
        ),
    ));

    registry.register(tool(
        "execute_query",
        "Run a raw query_range request. The query is checked and corrected before it is sent.",
        object_schema(
            &["query"],
            &[json!({
                "query": {
                    "type": "object",
                    "description": "Query with start, end, requestType and compositeQuery.queries"
                }
            })],
        ),
    ));

    registry.register(tool(
        "list_alerts",
        "List active alerts.",
        object_schema(&[], &[page_properties()]),
    ));

    registry.register(tool(
        "get_alert",
        "Get the definition of one alert rule.",
        object_schema(
            &["ruleId"],
            &[json!({"ruleId": {"type": "string", "description": "Alert rule id"}})],
        ),
    ));

    registry.register(tool(
        "list_dashboards",
        "List dashboards.",
        object_schema(&[], &[page_properties()]),
    ));

    registry.register(tool(
        "get_dashboard",
        "Get one dashboard with its panels and queries.",
        object_schema(
            &["uuid"],
            &[json!({"uuid": {"type": "string", "description": "Dashboard uuid"}})],
        ),
    ));

    registry.register(tool(
        "list_field_keys",
        "List the attribute and resource keys available for a signal.",
        object_schema(
            &["signal"],
            &[
                signal_property(),
                json!({"searchText": {"type": "string", "description": "Only keys containing this text"}}),
            ],
        ),
    ));

    registry.register(tool(
        "list_field_values",
        "List values seen for one field.",
        object_schema(
            &["signal", "name"],
            &[
                signal_property(),
                json!({
                    "name": {"type": "string", "description": "Field name, e.g. service.name"},
                    "searchText": {"type": "string", "description": "Only values containing this text"}
                }),
            ],
        ),
    ));

    registry
}

/// Execute a tool by name against a credential-scoped client
pub async fn execute_tool(
    client: &BackendClient,
    paging: &QueryConfig,
    tool_name: &str,
    params: Value,
) -> Result<Value> {
    match tool_name {
        "list_services" => execute_list_services(client, paging, params).await,
        "search_logs" => execute_search(client, paging, Signal::Logs, params).await,
        "search_traces" => execute_search(client, paging, Signal::Traces, params).await,
        "get_trace_details" => execute_get_trace_details(client, paging, params).await,
        "aggregate_logs" => execute_aggregate(client, Signal::Logs, params).await,
        "aggregate_traces" => execute_aggregate(client, Signal::Traces, params).await,
        "query_metrics" => execute_query_metrics(client, params).await,
        "execute_query" => execute_raw_query(client, params).await,
        "list_alerts" => execute_list_alerts(client, paging, params).await,
        "get_alert" => execute_get_alert(client, params).await,
        "list_dashboards" => execute_list_dashboards(client, paging, params).await,
        "get_dashboard" => execute_get_dashboard(client, params).await,
        "list_field_keys" => execute_list_field_keys(client, params).await,
        "list_field_values" => execute_list_field_values(client, params).await,
        _ => Err(Error::NotFound(format!("Tool not found: {}", tool_name))),
    }
}

// ============================================================================
// Tool implementations
// ============================================================================

fn required(value: Option<String>, name: &str, example: &str) -> Result<String> {
    value.ok_or_else(|| {
        Error::InvalidParameter(format!(
            "missing required parameter '{name}'. Example: {example}"
        ))
    })
}

fn parse_signal(raw: Option<&str>) -> Result<Signal> {
    let raw = raw.ok_or_else(|| {
        Error::InvalidParameter(
            "missing required parameter 'signal'. Example: {\"signal\": \"traces\"}".to_string(),
        )
    })?;

    match Signal::from(raw.trim().to_lowercase()) {
        signal @ (Signal::Logs | Signal::Traces | Signal::Metrics) => Ok(signal),
        Signal::Other(other) => Err(Error::InvalidParameter(format!(
            "invalid signal '{other}': must be logs, traces or metrics. Example: {{\"signal\": \"traces\"}}"
        ))),
    }
}

/// Page a backend list response; non-list responses are returned as-is
fn page_of(response: &Value, offset: i64, limit: i64) -> Result<Value> {
    match extract_items(response) {
        Some(items) => Ok(serde_json::to_value(paginate(items, offset, limit))?),
        None => Ok(response.clone()),
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(flatten)]
    page: PageArgs,
}

#[derive(Debug, Deserialize)]
struct ListServicesParams {
    #[serde(flatten)]
    window: TimeWindowArgs,
    #[serde(flatten)]
    page: PageArgs,
}

async fn execute_list_services(
    client: &BackendClient,
    paging: &QueryConfig,
    params: Value,
) -> Result<Value> {
    let p: ListServicesParams = from_params(params)?;
    let (offset, limit) = p.page.resolve(paging.default_page_size, paging.max_page_size)?;
    let window = timerange::resolve(&p.window, TimeUnit::Nanoseconds, Duration::hours(6))?;

    let services = client.list_services(window.start, window.end).await?;
    page_of(&services, offset, limit)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(flatten)]
    filters: FilterArgs,
    #[serde(flatten)]
    window: TimeWindowArgs,
    #[serde(flatten)]
    page: PageArgs,
}

async fn execute_search(
    client: &BackendClient,
    paging: &QueryConfig,
    signal: Signal,
    params: Value,
) -> Result<Value> {
    let p: SearchParams = from_params(params)?;
    let (offset, limit) = p.page.resolve(paging.default_page_size, paging.max_page_size)?;
    let window = timerange::resolve(&p.window, TimeUnit::Milliseconds, Duration::hours(1))?;
    let filter = p.filters.build(&signal, None)?.to_expression();

    debug!(signal = %signal, filter = ?filter, "Searching");
    let query = StructuredQuery::raw_list(
        signal,
        window,
        filter,
        limit.unsigned_abs(),
        offset.unsigned_abs(),
    )
    .normalize()?;
    let result = client.query_range(&query).await?;

    // The backend does not report a total; a full page means there may be more
    let returned = returned_rows(&result);
    let has_more = i64::try_from(returned).is_ok_and(|n| n >= limit);

    let mut page = json!({
        "window": window,
        "offset": offset,
        "limit": limit,
        "returned": returned,
        "hasMore": has_more,
        "result": result
    });
    if has_more {
        page["nextOffset"] = json!(offset + limit);
    }
    Ok(page)
}

/// Number of rows across the result sets of a raw query response
fn returned_rows(result: &Value) -> usize {
    result
        .pointer("/data/data/results")
        .and_then(Value::as_array)
        .map_or(0, |results| {
            results
                .iter()
                .filter_map(|r| r.get("rows").and_then(Value::as_array))
                .map(Vec::len)
                .sum()
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraceDetailsParams {
    #[serde(default, deserialize_with = "lenient_string")]
    trace_id: Option<String>,
    #[serde(flatten)]
    window: TimeWindowArgs,
}

async fn execute_get_trace_details(
    client: &BackendClient,
    paging: &QueryConfig,
    params: Value,
) -> Result<Value> {
    let p: TraceDetailsParams = from_params(params)?;
    let trace_id = required(
        p.trace_id,
        "traceId",
        "{\"traceId\": \"4bf92f3577b34da6a3ce929d0e0e4736\"}",
    )?;
    let trace_id = trace_id.trim().to_lowercase();
    if !trace_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidParameter(format!(
            "invalid traceId '{trace_id}': expected a hex string. \
             Example: {{\"traceId\": \"4bf92f3577b34da6a3ce929d0e0e4736\"}}"
        )));
    }

    let window = timerange::resolve(&p.window, TimeUnit::Milliseconds, Duration::hours(24))?;

    let mut spec = QuerySpec::new("A", Signal::Traces)
        .with_filter(FilterExpr::equals("trace_id", trace_id.as_str()).to_expression());
    spec.limit = Some(u64::try_from(paging.max_page_size).unwrap_or(u64::MAX));
    spec.order = vec![OrderBy::new("timestamp", Direction::Asc)];

    let query = StructuredQuery::new(window, RequestType::Raw, vec![spec]).normalize()?;
    let result = client.query_range(&query).await?;

    Ok(json!({
        "traceId": trace_id,
        "result": result
    }))
}

async fn execute_aggregate(client: &BackendClient, signal: Signal, params: Value) -> Result<Value> {
    let args: AggregationArgs = from_params(params)?;
    let request = aggregate::compile(&args, &signal, None)?;

    debug!(expression = %request.expression, group_by = ?request.group_by, "Aggregating");
    let summary = serde_json::to_value(&request)?;
    let query = request.into_query().normalize()?;
    let result = client.query_range(&query).await?;

    Ok(json!({
        "aggregation": summary,
        "result": result
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryMetricsParams {
    #[serde(default, deserialize_with = "lenient_string")]
    metric_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    time_aggregation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    space_aggregation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    group_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    step_interval: Option<i64>,
    #[serde(flatten)]
    filters: FilterArgs,
    #[serde(flatten)]
    window: TimeWindowArgs,
}

async fn execute_query_metrics(client: &BackendClient, params: Value) -> Result<Value> {
    let p: QueryMetricsParams = from_params(params)?;
    let metric_name = required(
        p.metric_name,
        "metricName",
        "{\"metricName\": \"http_server_duration\", \"timeRange\": \"1h\"}",
    )?;

    if let Some(step) = p.step_interval.filter(|s| *s <= 0) {
        return Err(Error::InvalidParameter(format!(
            "invalid stepInterval '{step}': must be a positive number of seconds. Example: \"stepInterval\": \"60\""
        )));
    }

    let window = timerange::resolve(&p.window, TimeUnit::Milliseconds, Duration::hours(1))?;
    let filter = p.filters.build(&Signal::Metrics, None)?.to_expression();
    let time_aggregation = p.time_aggregation.map_or_else(|| "avg".to_string(), |a| a.to_lowercase());
    let space_aggregation = p.space_aggregation.map_or_else(|| "sum".to_string(), |a| a.to_lowercase());

    let query = StructuredQuery::metric_series(
        window,
        metric_name.trim(),
        &time_aggregation,
        &space_aggregation,
        aggregate::parse_group_by(p.group_by.as_deref()),
        filter,
        p.step_interval,
    )
    .normalize()?;
    let result = client.query_range(&query).await?;

    Ok(json!({
        "metricName": metric_name,
        "timeAggregation": time_aggregation,
        "spaceAggregation": space_aggregation,
        "window": window,
        "result": result
    }))
}

#[derive(Debug, Deserialize)]
struct ExecuteQueryParams {
    #[serde(default)]
    query: Value,
}

async fn execute_raw_query(client: &BackendClient, params: Value) -> Result<Value> {
    let p: ExecuteQueryParams = from_params(params)?;

    // Agents sometimes send the query as a JSON string
    let raw = match p.query {
        Value::Null => {
            return Err(Error::InvalidParameter(
                "missing required parameter 'query'. Example: {\"query\": {\"start\": 1700000000000, \
                 \"end\": 1700003600000, \"requestType\": \"raw\", \"compositeQuery\": {\"queries\": \
                 [{\"type\": \"builder_query\", \"spec\": {\"name\": \"A\", \"signal\": \"logs\"}}]}}}"
                    .to_string(),
            ))
        }
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| Error::InvalidParameter(format!("query is not valid JSON: {e}")))?,
        other => other,
    };

    let query: StructuredQuery = serde_json::from_value(raw)
        .map_err(|e| Error::InvalidParameter(format!("query does not match the query_range format: {e}")))?;
    let query = query.normalize()?;
    let result = client.query_range(&query).await?;

    Ok(json!({
        "query": query,
        "result": result
    }))
}

async fn execute_list_alerts(client: &BackendClient, paging: &QueryConfig, params: Value) -> Result<Value> {
    let p: ListParams = from_params(params)?;
    let (offset, limit) = p.page.resolve(paging.default_page_size, paging.max_page_size)?;

    let alerts = client.list_alerts().await?;
    page_of(&alerts, offset, limit)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetAlertParams {
    #[serde(default, deserialize_with = "lenient_string")]
    rule_id: Option<String>,
}

async fn execute_get_alert(client: &BackendClient, params: Value) -> Result<Value> {
    let p: GetAlertParams = from_params(params)?;
    let rule_id = required(p.rule_id, "ruleId", "{\"ruleId\": \"42\"}")?;

    client.get_alert_rule(rule_id.trim()).await
}

async fn execute_list_dashboards(
    client: &BackendClient,
    paging: &QueryConfig,
    params: Value,
) -> Result<Value> {
    let p: ListParams = from_params(params)?;
    let (offset, limit) = p.page.resolve(paging.default_page_size, paging.max_page_size)?;

    let dashboards = client.list_dashboards().await?;
    page_of(&dashboards, offset, limit)
}

#[derive(Debug, Deserialize)]
struct GetDashboardParams {
    #[serde(default, deserialize_with = "lenient_string")]
    uuid: Option<String>,
}

async fn execute_get_dashboard(client: &BackendClient, params: Value) -> Result<Value> {
    let p: GetDashboardParams = from_params(params)?;
    let raw = required(
        p.uuid,
        "uuid",
        "{\"uuid\": \"1f0c4d6e-5b7a-4c2d-9e3f-8a1b2c3d4e5f\"}",
    )?;
    let id = Uuid::parse_str(raw.trim()).map_err(|e| {
        Error::InvalidParameter(format!(
            "invalid uuid '{raw}': {e}. Use list_dashboards to find it. \
             Example: {{\"uuid\": \"1f0c4d6e-5b7a-4c2d-9e3f-8a1b2c3d4e5f\"}}"
        ))
    })?;

    client.get_dashboard(id).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldKeysParams {
    #[serde(default, deserialize_with = "lenient_string")]
    signal: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    search_text: Option<String>,
}

async fn execute_list_field_keys(client: &BackendClient, params: Value) -> Result<Value> {
    let p: FieldKeysParams = from_params(params)?;
    let signal = parse_signal(p.signal.as_deref())?;

    client
        .list_field_keys(&signal, p.search_text.as_deref())
        .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValuesParams {
    #[serde(default, deserialize_with = "lenient_string")]
    signal: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    search_text: Option<String>,
}

async fn execute_list_field_values(client: &BackendClient, params: Value) -> Result<Value> {
    let p: FieldValuesParams = from_params(params)?;
    let signal = parse_signal(p.signal.as_deref())?;
    let name = required(
        p.name,
        "name",
        "{\"signal\": \"traces\", \"name\": \"service.name\"}",
    )?;

    client
        .list_field_values(&signal, name.trim(), p.search_text.as_deref())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    use lookout_common::{client::QUERY_RANGE_PATH, config::BackendConfig};
    use tokio_test::{assert_err, assert_ok};
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: server.uri(),
            api_key: Some("test-key".to_string()),
            auth_header: "SIGNOZ-API-KEY".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn offline_client() -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            auth_header: "SIGNOZ-API-KEY".to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_tool_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_tool_registry_get() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("test_tool", "A test tool", json!({})));

        let tool = registry.get("test_tool");
        assert!(tool.is_some());
        assert_eq!(tool.unwrap().name, "test_tool");

        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_create_tool_registry() {
        let registry = create_tool_registry();
        let names: Vec<&str> = registry.list().iter().map(|t| t.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "aggregate_logs",
                "aggregate_traces",
                "execute_query",
                "get_alert",
                "get_dashboard",
                "get_trace_details",
                "list_alerts",
                "list_dashboards",
                "list_field_keys",
                "list_field_values",
                "list_services",
                "query_metrics",
                "search_logs",
                "search_traces",
            ]
        );
    }

    #[test]
    fn test_schemas_list_required_properties() {
        let registry = create_tool_registry();
        for tool in registry.list() {
            let schema = &tool.input_schema;
            assert_eq!(schema["type"], "object", "{}", tool.name);
            for name in schema["required"].as_array().unwrap() {
                let name = name.as_str().unwrap();
                assert!(
                    schema["properties"].get(name).is_some(),
                    "{} requires undeclared {name}",
                    tool.name
                );
            }
        }

        let logs = registry.get("search_logs").unwrap();
        assert!(logs.input_schema["properties"].get("searchText").is_some());
        assert!(logs.input_schema["properties"].get("operation").is_none());
    }

    #[test]
    fn test_mcp_tool_serialization() {
        let tool = tool("test", "Test description", json!({"type": "object"}));

        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("\"name\":\"test\""));
        assert!(json.contains("\"description\":\"Test description\""));
    }

    #[test]
    fn test_parse_signal() {
        assert_eq!(parse_signal(Some(" Traces ")).unwrap(), Signal::Traces);
        assert!(parse_signal(None).unwrap_err().to_string().contains("'signal'"));
        assert!(parse_signal(Some("spans")).unwrap_err().to_string().contains("invalid signal 'spans'"));
    }

    #[test]
    fn test_page_of() {
        let response = json!({"status": "success", "data": [1, 2, 3]});
        let page = page_of(&response, 1, 1).unwrap();
        assert_eq!(page["data"], json!([2]));
        assert_eq!(page["total"], 3);
        assert_eq!(page["nextOffset"], 2);

        let object = json!({"data": {"keys": {}}});
        assert_eq!(page_of(&object, 0, 10).unwrap(), object);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = assert_err!(execute_tool(&offline_client(), &QueryConfig::default(), "drop_tables", Value::Null).await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_argument_errors_do_not_reach_backend() {
        let client = offline_client();
        let paging = QueryConfig::default();

        let cases = [
            ("aggregate_traces", json!({"aggregation": "median"})),
            ("search_logs", json!({"limit": "9999"})),
            ("search_logs", json!({"timeRange": "yesterday-ish"})),
            ("get_trace_details", json!({"traceId": "not-a-trace"})),
            ("get_dashboard", json!({"uuid": "abc"})),
            ("list_field_values", json!({"signal": "logs"})),
            ("query_metrics", json!({"metricName": "cpu", "stepInterval": "0"})),
            ("execute_query", json!({"query": {"start": 1, "end": 2, "compositeQuery": {"queries": []}}})),
            ("search_traces", json!({"service": {"name": "cart"}})),
        ];

        for (tool, params) in cases {
            let err = assert_err!(execute_tool(&client, &paging, tool, params).await);
            assert!(err.is_validation_error(), "{tool}: {err}");
        }
    }

    #[tokio::test]
    async fn test_search_logs_sends_filtered_raw_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_RANGE_PATH))
            .and(header("SIGNOZ-API-KEY", "test-key"))
            .and(body_partial_json(json!({
                "requestType": "raw",
                "compositeQuery": {"queries": [{
                    "type": "builder_query",
                    "spec": {
                        "signal": "logs",
                        "limit": 20,
                        "filter": {"expression": "service.name = 'cart' AND severity_text = 'ERROR'"}
                    }
                }]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let result = assert_ok!(
            execute_tool(
                &client_for(&server),
                &QueryConfig::default(),
                "search_logs",
                json!({"service": "cart", "severity": "error", "limit": 20, "timeRange": "15m"}),
            )
            .await
        );
        assert_eq!(result["limit"], 20);
        assert_eq!(result["returned"], 0);
        assert_eq!(result["hasMore"], false);
        assert!(result.get("nextOffset").is_none());
        assert_eq!(result["result"]["status"], "success");
        let window = &result["window"];
        assert_eq!(window["end"].as_i64().unwrap() - window["start"].as_i64().unwrap(), 15 * 60 * 1000);
    }

    #[tokio::test]
    async fn test_search_traces_full_page_has_next_offset() {
        let server = MockServer::start().await;
        let rows: Vec<Value> = (0..5).map(|i| json!({"data": {"span_id": i}})).collect();
        Mock::given(method("POST"))
            .and(path(QUERY_RANGE_PATH))
            .and(body_partial_json(json!({
                "compositeQuery": {"queries": [{"spec": {"signal": "traces", "limit": 5, "offset": 10}}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"type": "raw", "data": {"results": [{"queryName": "A", "rows": rows}]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = assert_ok!(
            execute_tool(
                &client_for(&server),
                &QueryConfig::default(),
                "search_traces",
                json!({"offset": 10, "limit": 5}),
            )
            .await
        );
        assert_eq!(page["returned"], 5);
        assert_eq!(page["hasMore"], true);
        assert_eq!(page["nextOffset"], 15);
    }

    #[tokio::test]
    async fn test_aggregate_traces_p99_by_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_RANGE_PATH))
            .and(body_partial_json(json!({
                "requestType": "scalar",
                "compositeQuery": {"queries": [{
                    "type": "builder_query",
                    "spec": {
                        "signal": "traces",
                        "aggregations": [{"expression": "p99(duration_nano)"}],
                        "groupBy": [{"name": "service.name"}],
                        "limit": 10
                    }
                }]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = assert_ok!(
            execute_tool(
                &client_for(&server),
                &QueryConfig::default(),
                "aggregate_traces",
                json!({"aggregation": "P99", "aggregateOn": "duration_nano", "groupBy": "service.name"}),
            )
            .await
        );
        assert_eq!(result["aggregation"]["expression"], "p99(duration_nano)");
    }

    #[tokio::test]
    async fn test_execute_query_is_normalized_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_RANGE_PATH))
            .and(body_partial_json(json!({
                "schemaVersion": "v1",
                "requestType": "time_series",
                "compositeQuery": {"queries": [{"spec": {"signal": "metrics", "stepInterval": 60}}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let query = r#"{"start": "1700000000000", "end": 1700000360000, "requestType": "raw",
            "compositeQuery": {"queries": [{"type": "builder_query",
            "spec": {"name": "A", "signal": "metrics", "aggregations": [{"metricName": "cpu"}]}}]}}"#;

        let result = assert_ok!(
            execute_tool(&client_for(&server), &QueryConfig::default(), "execute_query", json!({"query": query})).await
        );
        assert_eq!(result["query"]["requestType"], "time_series");
    }

    #[tokio::test]
    async fn test_list_dashboards_is_paginated() {
        let server = MockServer::start().await;
        let dashboards: Vec<Value> = (0..7).map(|i| json!({"id": i})).collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/dashboards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": dashboards})))
            .mount(&server)
            .await;

        let page = assert_ok!(
            execute_tool(
                &client_for(&server),
                &QueryConfig::default(),
                "list_dashboards",
                json!({"offset": "5", "limit": "5"}),
            )
            .await
        );
        assert_eq!(page["data"], json!([{"id": 5}, {"id": 6}]));
        assert_eq!(page["total"], 7);
        assert_eq!(page["hasMore"], false);
    }

    #[tokio::test]
    async fn test_backend_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/rules/42"))
            .respond_with(ResponseTemplate::new(404).set_body_string("rule not found"))
            .mount(&server)
            .await;

        let err = assert_err!(
            execute_tool(&client_for(&server), &QueryConfig::default(), "get_alert", json!({"ruleId": 42})).await
        );
        assert_eq!(err.backend_status(), Some(404));
        assert!(err.to_string().contains("rule not found"));
    }
}

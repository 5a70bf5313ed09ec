//! Core types for Lookout
//!
//! These types mirror the v5 `query_range` request body of the telemetry
//! backend. Anything the model does not name explicitly is kept in `extra`
//! maps so a query round-trips without losing caller-supplied fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::args::{lenient_i64, lenient_i64_or_zero};

/// Schema version stamped on queries that do not carry one
pub const SCHEMA_VERSION: &str = "v1";

/// Envelope kind of a builder query; every other kind passes through as-is
pub const BUILDER_QUERY: &str = "builder_query";

/// Step interval (seconds) used when a time series query does not set one
pub const DEFAULT_STEP_INTERVAL: i64 = 60;

/// Telemetry category a query targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signal {
    Metrics,
    Logs,
    Traces,
    /// Anything else the caller sent, kept for error reporting
    Other(String),
}

impl Signal {
    pub fn as_str(&self) -> &str {
        match self {
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
            Signal::Traces => "traces",
            Signal::Other(s) => s,
        }
    }
}

impl From<String> for Signal {
    fn from(s: String) -> Self {
        match s.as_str() {
            "metrics" => Signal::Metrics,
            "logs" => Signal::Logs,
            "traces" => Signal::Traces,
            _ => Signal::Other(s),
        }
    }
}

impl From<&str> for Signal {
    fn from(s: &str) -> Self {
        Signal::from(s.to_string())
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of data the backend should return
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    /// Point-in-time list of records
    Raw,
    /// A single reduced value per group
    Scalar,
    /// Time-bucketed series
    TimeSeries,
    Trace,
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Raw => "raw",
            RequestType::Scalar => "scalar",
            RequestType::TimeSeries => "time_series",
            RequestType::Trace => "trace",
            RequestType::Other(s) => s,
        }
    }
}

impl From<String> for RequestType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "raw" => RequestType::Raw,
            "scalar" => RequestType::Scalar,
            "time_series" => RequestType::TimeSeries,
            "trace" => RequestType::Trace,
            _ => RequestType::Other(s),
        }
    }
}

impl From<&str> for RequestType {
    fn from(s: &str) -> Self {
        RequestType::from(s.to_string())
    }
}

impl From<RequestType> for String {
    fn from(request_type: RequestType) -> Self {
        match request_type {
            RequestType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Desc => write!(f, "desc"),
        }
    }
}

/// Key of an order clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub name: String,
}

/// One `(field, direction)` pair of an order clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub key: OrderKey,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            key: OrderKey { name: name.into() },
            direction,
        }
    }
}

/// Field reference used for selection and grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_data_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,

    /// Context tag such as `resource`, `attribute` or `span`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_context: Option<String>,
}

impl FieldDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_data_type: None,
            signal: None,
            field_context: None,
        }
    }
}

/// An aggregation expression such as `count()` or `avg(duration_nano)`.
///
/// Metric queries describe their reduction with `metricName` and the time and
/// space aggregations instead of an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_aggregation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_aggregation: Option<String>,
}

impl Aggregation {
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::default()
        }
    }
}

/// Boolean filter expression in the backend's query language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub expression: String,
}

/// One leg of a (possibly composite) query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,

    #[serde(default)]
    pub disabled: bool,

    /// Bucket width in seconds for time series
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub step_interval: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderBy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub select_fields: Vec<FieldDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<FieldDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<Aggregation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<Value>,

    /// Fields not modelled above (functions, legend, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuerySpec {
    pub fn new(name: impl Into<String>, signal: Signal) -> Self {
        Self {
            name: Some(name.into()),
            signal: Some(signal),
            disabled: false,
            step_interval: None,
            filter: None,
            limit: None,
            offset: None,
            order: Vec::new(),
            select_fields: Vec::new(),
            group_by: Vec::new(),
            aggregations: Vec::new(),
            having: None,
            extra: Map::new(),
        }
    }

    /// Name used in error messages; positional when the query is unnamed
    pub fn display_name(&self, index: usize) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("query at position {}", index + 1),
        }
    }

    pub fn with_filter(mut self, expression: Option<String>) -> Self {
        self.filter = expression.map(|expression| Filter { expression });
        self
    }
}

/// Element of `compositeQuery.queries`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope", into = "RawEnvelope")]
pub enum QueryEnvelope {
    /// `type = "builder_query"`
    Builder(QuerySpec),
    /// Formula, PromQL, SQL and other kinds, forwarded untouched
    Other { kind: String, spec: Value },
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    spec: Value,
}

impl TryFrom<RawEnvelope> for QueryEnvelope {
    type Error = serde_json::Error;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        if raw.kind == BUILDER_QUERY {
            Ok(QueryEnvelope::Builder(serde_json::from_value(raw.spec)?))
        } else {
            Ok(QueryEnvelope::Other {
                kind: raw.kind,
                spec: raw.spec,
            })
        }
    }
}

impl From<QueryEnvelope> for RawEnvelope {
    fn from(envelope: QueryEnvelope) -> Self {
        match envelope {
            // QuerySpec only holds JSON-representable data
            QueryEnvelope::Builder(spec) => RawEnvelope {
                kind: BUILDER_QUERY.to_string(),
                spec: serde_json::to_value(spec).unwrap_or_default(),
            },
            QueryEnvelope::Other { kind, spec } => RawEnvelope { kind, spec },
        }
    }
}

impl QueryEnvelope {
    pub fn builder(spec: QuerySpec) -> Self {
        QueryEnvelope::Builder(spec)
    }

    pub fn as_builder(&self) -> Option<&QuerySpec> {
        match self {
            QueryEnvelope::Builder(spec) => Some(spec),
            QueryEnvelope::Other { .. } => None,
        }
    }
}

/// Ordered list of query legs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeQuery {
    #[serde(default)]
    pub queries: Vec<QueryEnvelope>,
}

/// Table formatting and gap-filling flags, forwarded as given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    #[serde(default, rename = "formatTableResultForUI")]
    pub format_table_result_for_ui: bool,

    #[serde(default)]
    pub fill_gaps: bool,
}

/// The canonical request sent to the backend's query endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    #[serde(default)]
    pub schema_version: String,

    /// Epoch milliseconds
    #[serde(default, deserialize_with = "lenient_i64_or_zero")]
    pub start: i64,

    /// Epoch milliseconds
    #[serde(default, deserialize_with = "lenient_i64_or_zero")]
    pub end: i64,

    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_type: Option<RequestType>,

    #[serde(default)]
    pub composite_query: CompositeQuery,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_options: Option<FormatOptions>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl StructuredQuery {
    /// Builder queries in order, skipping other kinds
    pub fn builder_queries(&self) -> impl Iterator<Item = &QuerySpec> {
        self.composite_query
            .queries
            .iter()
            .filter_map(QueryEnvelope::as_builder)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<RequestType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(RequestType::from))
}

//! Aggregation request compiler
//!
//! Turns free-form tool arguments ("average duration grouped by service, top
//! 10") into a validated aggregation over logs or traces. The caller cannot
//! read this code, so every rejection carries a corrected example it can
//! retry with.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    args::{lenient_string, non_blank},
    error::{Error, Result},
    filter::FilterArgs,
    timerange::{self, TimeUnit, TimeWindow, TimeWindowArgs},
    types::{
        Aggregation, Direction, FieldDescriptor, OrderBy, QuerySpec, RequestType, Signal,
        StructuredQuery,
    },
};

/// Aggregation verbs the backend understands
pub const AGGREGATION_VERBS: [&str; 12] = [
    "count",
    "count_distinct",
    "avg",
    "sum",
    "min",
    "max",
    "p50",
    "p75",
    "p90",
    "p95",
    "p99",
    "rate",
];

/// Verbs that do not need a target field
const FIELDLESS_VERBS: [&str; 2] = ["count", "rate"];

/// Number of groups returned when the caller gives no limit
pub const DEFAULT_AGGREGATION_LIMIT: u64 = 10;

const EXAMPLE: &str =
    r#"{"aggregation": "avg", "aggregateOn": "duration_nano", "groupBy": "service.name", "timeRange": "1h"}"#;

/// Arguments of the aggregate tools
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationArgs {
    /// Verb, one of [`AGGREGATION_VERBS`]
    #[serde(default, deserialize_with = "lenient_string")]
    pub aggregation: Option<String>,

    /// Field the verb applies to
    #[serde(default, deserialize_with = "lenient_string")]
    pub aggregate_on: Option<String>,

    /// Comma-separated group-by fields
    #[serde(default, deserialize_with = "lenient_string")]
    pub group_by: Option<String>,

    /// `<expression> [asc|desc]`
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_by: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub limit: Option<String>,

    #[serde(flatten)]
    pub filters: FilterArgs,

    #[serde(flatten)]
    pub window: TimeWindowArgs,
}

/// A compiled aggregation, ready to be lowered into a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationRequest {
    pub signal: Signal,
    pub verb: String,
    pub field: Option<String>,
    /// `verb(field)` or `verb()`
    pub expression: String,
    pub filter: Option<String>,
    pub group_by: Vec<String>,
    pub order_expression: String,
    pub order_direction: Direction,
    pub limit: u64,
    /// Epoch milliseconds
    pub start: i64,
    /// Epoch milliseconds
    pub end: i64,
}

/// Compile aggregate-tool arguments for `signal`.
///
/// `preset_filter` is ANDed with whatever the arguments ask for; tools use it
/// to pin a query to e.g. error spans.
pub fn compile(args: &AggregationArgs, signal: &Signal, preset_filter: Option<&str>) -> Result<AggregationRequest> {
    let verb = parse_verb(args.aggregation.as_deref())?;

    let field = args
        .aggregate_on
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);

    let expression = match &field {
        Some(field) => format!("{verb}({field})"),
        None if FIELDLESS_VERBS.contains(&verb.as_str()) => format!("{verb}()"),
        None => {
            return Err(Error::InvalidParameter(format!(
                "parameter 'aggregateOn' is required for aggregation '{verb}'; only {} work without a field. \
                 Example: {{\"aggregation\": \"{verb}\", \"aggregateOn\": \"duration_nano\"}}",
                FIELDLESS_VERBS.join(" and ")
            )));
        }
    };

    let filter = args.filters.build(signal, preset_filter)?.to_expression();
    let group_by = parse_group_by(args.group_by.as_deref());
    let (order_expression, order_direction) = parse_order_by(args.order_by.as_deref(), &expression);
    let limit = parse_limit(args.limit.as_deref())?;
    let window = timerange::resolve(&args.window, TimeUnit::Milliseconds, Duration::hours(1))?;

    Ok(AggregationRequest {
        signal: signal.clone(),
        verb,
        field,
        expression,
        filter,
        group_by,
        order_expression,
        order_direction,
        limit,
        start: window.start,
        end: window.end,
    })
}

fn parse_verb(raw: Option<&str>) -> Result<String> {
    let allowed = AGGREGATION_VERBS.join(", ");
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Err(Error::InvalidParameter(format!(
            "missing required parameter 'aggregation': must be one of {allowed}. Example: {EXAMPLE}"
        )));
    };

    let verb = raw.to_lowercase();
    if AGGREGATION_VERBS.contains(&verb.as_str()) {
        Ok(verb)
    } else {
        Err(Error::InvalidParameter(format!(
            "invalid aggregation '{raw}': must be one of {allowed}. Example: {EXAMPLE}"
        )))
    }
}

/// Comma-separated field list, trimmed, empty entries dropped.
pub fn parse_group_by(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split an `orderBy` argument into expression and direction.
///
/// A trailing ` asc`/` desc` (any case) sets the direction, which otherwise
/// defaults to descending; without an `orderBy` the aggregation itself is
/// the sort key.
pub fn parse_order_by(raw: Option<&str>, aggregation_expression: &str) -> (String, Direction) {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return (aggregation_expression.to_string(), Direction::Desc);
    }

    for (suffix, direction) in [(" asc", Direction::Asc), (" desc", Direction::Desc)] {
        let Some(split) = raw.len().checked_sub(suffix.len()) else {
            continue;
        };
        if raw.is_char_boundary(split) && raw[split..].eq_ignore_ascii_case(suffix) {
            return (raw[..split].trim().to_string(), direction);
        }
    }

    (raw.to_string(), Direction::Desc)
}

/// Positive result limit; absent or non-positive falls back to the default.
pub fn parse_limit(raw: Option<&str>) -> Result<u64> {
    let Some(raw) = non_blank(raw) else {
        return Ok(DEFAULT_AGGREGATION_LIMIT);
    };

    let limit: i64 = raw.trim().parse().map_err(|_| {
        Error::InvalidParameter(format!(
            "invalid limit '{raw}': must be a positive integer. Example: \"limit\": \"10\""
        ))
    })?;

    Ok(u64::try_from(limit)
        .ok()
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_AGGREGATION_LIMIT))
}

impl AggregationRequest {
    /// Lower into a single-leg scalar query named `A`.
    pub fn into_query(self) -> StructuredQuery {
        let window = TimeWindow {
            start: self.start,
            end: self.end,
        };

        let mut spec = QuerySpec::new("A", self.signal).with_filter(self.filter);
        spec.aggregations = vec![Aggregation::expression(self.expression)];
        spec.group_by = self
            .group_by
            .into_iter()
            .map(FieldDescriptor::named)
            .collect();
        spec.order = vec![OrderBy::new(self.order_expression, self.order_direction)];
        spec.limit = Some(self.limit);

        StructuredQuery::new(window, RequestType::Scalar, vec![spec])
    }
}

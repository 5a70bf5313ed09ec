//! Tests for the aggregation compiler

use serde_json::json;

use crate::{
    aggregate::{compile, parse_group_by, parse_limit, parse_order_by, AggregationArgs, DEFAULT_AGGREGATION_LIMIT},
    args::from_params,
    types::{Direction, RequestType, Signal},
};

fn args(value: serde_json::Value) -> AggregationArgs {
    from_params(value).unwrap()
}

#[test]
fn test_expression_composition() {
    let req = compile(&args(json!({"aggregation": "avg", "aggregateOn": "duration"})), &Signal::Traces, None).unwrap();
    assert_eq!(req.expression, "avg(duration)");

    let req = compile(&args(json!({"aggregation": "count", "aggregateOn": ""})), &Signal::Logs, None).unwrap();
    assert_eq!(req.expression, "count()");
    assert_eq!(req.field, None);

    let req = compile(&args(json!({"aggregation": "count", "aggregateOn": "duration"})), &Signal::Traces, None).unwrap();
    assert_eq!(req.expression, "count(duration)");

    let req = compile(&args(json!({"aggregation": "RATE"})), &Signal::Logs, None).unwrap();
    assert_eq!(req.expression, "rate()");
}

#[test]
fn test_missing_or_unknown_verb() {
    let err = compile(&args(json!({})), &Signal::Logs, None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("missing required parameter 'aggregation'"));
    assert!(msg.contains("count_distinct"));
    assert!(msg.contains("Example:"));

    let err = compile(&args(json!({"aggregation": "median"})), &Signal::Logs, None).unwrap_err();
    assert!(err.to_string().contains("invalid aggregation 'median'"));
    assert!(err.is_validation_error());
}

#[test]
fn test_field_required_for_most_verbs() {
    let err = compile(&args(json!({"aggregation": "p95"})), &Signal::Traces, None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'aggregateOn' is required for aggregation 'p95'"));
    assert!(msg.contains(r#""aggregateOn": "duration_nano""#));
}

#[test]
fn test_order_by_parsing() {
    assert_eq!(
        parse_order_by(Some("duration desc"), "count()"),
        ("duration".to_string(), Direction::Desc)
    );
    assert_eq!(
        parse_order_by(Some("duration ASC"), "count()"),
        ("duration".to_string(), Direction::Asc)
    );
    assert_eq!(
        parse_order_by(Some("duration"), "count()"),
        ("duration".to_string(), Direction::Desc)
    );
    assert_eq!(
        parse_order_by(Some(""), "avg(duration)"),
        ("avg(duration)".to_string(), Direction::Desc)
    );
    assert_eq!(
        parse_order_by(None, "count()"),
        ("count()".to_string(), Direction::Desc)
    );
    // No separating space means no direction suffix
    assert_eq!(
        parse_order_by(Some("asc"), "count()"),
        ("asc".to_string(), Direction::Desc)
    );
}

#[test]
fn test_group_by_parsing() {
    assert_eq!(
        parse_group_by(Some(" service.name , ,region,")),
        vec!["service.name".to_string(), "region".to_string()]
    );
    assert!(parse_group_by(None).is_empty());
    assert!(parse_group_by(Some(" , ")).is_empty());
}

#[test]
fn test_limit_parsing() {
    assert_eq!(parse_limit(None).unwrap(), DEFAULT_AGGREGATION_LIMIT);
    assert_eq!(parse_limit(Some("0")).unwrap(), DEFAULT_AGGREGATION_LIMIT);
    assert_eq!(parse_limit(Some("-3")).unwrap(), DEFAULT_AGGREGATION_LIMIT);
    assert_eq!(parse_limit(Some(" 25 ")).unwrap(), 25);

    let err = parse_limit(Some("ten")).unwrap_err();
    assert!(err.to_string().contains("invalid limit 'ten'"));
    assert!(err.to_string().contains(r#""limit": "10""#));
}

#[test]
fn test_numeric_limit_argument() {
    let req = compile(&args(json!({"aggregation": "count", "limit": 7})), &Signal::Logs, None).unwrap();
    assert_eq!(req.limit, 7);
}

#[test]
fn test_logs_shortcut_filters() {
    let req = compile(
        &args(json!({
            "aggregation": "count",
            "filter": "k8s.namespace.name = 'prod'",
            "service": "checkout",
            "severity": "error",
            "searchText": "timeout",
            "operation": "ignored for logs"
        })),
        &Signal::Logs,
        None,
    )
    .unwrap();

    assert_eq!(
        req.filter.as_deref(),
        Some("(k8s.namespace.name = 'prod') AND service.name = 'checkout' AND severity_text = 'ERROR' AND body CONTAINS 'timeout'")
    );
}

#[test]
fn test_traces_shortcut_filters_and_preset() {
    let req = compile(
        &args(json!({"aggregation": "count", "operation": "GET /cart", "error": "true"})),
        &Signal::Traces,
        Some("kind_string = 'Server'"),
    )
    .unwrap();

    assert_eq!(
        req.filter.as_deref(),
        Some("(kind_string = 'Server') AND name = 'GET /cart' AND hasError = true")
    );

    let err = compile(&args(json!({"aggregation": "count", "error": "maybe"})), &Signal::Traces, None).unwrap_err();
    assert!(err.to_string().contains("must be true or false"));
}

#[test]
fn test_absent_shortcuts_add_nothing() {
    let req = compile(&args(json!({"aggregation": "count", "service": "  "})), &Signal::Logs, None).unwrap();
    assert_eq!(req.filter, None);

    let req = compile(&args(json!({"aggregation": "count", "filter": "a = 1"})), &Signal::Logs, None).unwrap();
    assert_eq!(req.filter.as_deref(), Some("a = 1"));
}

#[test]
fn test_shortcut_values_are_escaped() {
    let req = compile(&args(json!({"aggregation": "count", "service": "o'brien"})), &Signal::Traces, None).unwrap();
    assert_eq!(req.filter.as_deref(), Some(r"service.name = 'o\'brien'"));
}

#[test]
fn test_default_window_is_one_hour() {
    let req = compile(&args(json!({"aggregation": "count"})), &Signal::Logs, None).unwrap();
    assert_eq!(req.end - req.start, 3_600_000);
}

#[test]
fn test_p99_traces_scenario() {
    let before = chrono::Utc::now().timestamp_millis();
    let req = compile(
        &args(json!({
            "aggregation": "p99",
            "aggregateOn": "duration",
            "groupBy": "service.name,region",
            "orderBy": "p99(duration) asc",
            "limit": "5",
            "timeRange": "1h"
        })),
        &Signal::Traces,
        None,
    )
    .unwrap();
    let after = chrono::Utc::now().timestamp_millis();

    assert_eq!(req.expression, "p99(duration)");
    assert_eq!(req.group_by, vec!["service.name", "region"]);
    assert_eq!(req.order_expression, "p99(duration)");
    assert_eq!(req.order_direction, Direction::Asc);
    assert_eq!(req.limit, 5);
    assert_eq!(req.end - req.start, 3_600_000);
    assert!(req.end >= before && req.end <= after);
}

#[test]
fn test_into_query_is_scalar_and_normalizes() {
    let req = compile(
        &args(json!({"aggregation": "avg", "aggregateOn": "duration_nano", "groupBy": "service.name"})),
        &Signal::Traces,
        None,
    )
    .unwrap();
    let query = req.into_query().normalize().unwrap();

    assert_eq!(query.request_type, Some(RequestType::Scalar));
    let spec = query.builder_queries().next().unwrap();
    assert_eq!(spec.name.as_deref(), Some("A"));
    assert_eq!(spec.aggregations[0].expression.as_deref(), Some("avg(duration_nano)"));
    assert_eq!(spec.group_by[0].name, "service.name");
    assert_eq!(spec.order[0].key.name, "avg(duration_nano)");
    assert_eq!(spec.limit, Some(10));
    assert_eq!(spec.step_interval, None);
}

//! Tests for filter expressions

use crate::{
    args::from_params,
    filter::{CompareOp, FilterArgs, FilterExpr},
    types::Signal,
};

#[test]
fn test_compare_rendering() {
    assert_eq!(FilterExpr::equals("service.name", "cart").to_string(), "service.name = 'cart'");
    assert_eq!(FilterExpr::equals("hasError", true).to_string(), "hasError = true");
    assert_eq!(
        FilterExpr::compare("duration_nano", CompareOp::Gt, 5_000_000_i64).to_string(),
        "duration_nano > 5000000"
    );
    assert_eq!(FilterExpr::contains("body", "disk full").to_string(), "body CONTAINS 'disk full'");
}

#[test]
fn test_string_values_are_escaped() {
    let expr = FilterExpr::equals("body", r"it's a \ path");
    assert_eq!(expr.to_string(), r"body = 'it\'s a \\ path'");

    // An injection attempt stays inside the quoted value
    let expr = FilterExpr::equals("service.name", "x' OR '1'='1");
    assert_eq!(expr.to_string(), r"service.name = 'x\' OR \'1\'=\'1'");
}

#[test]
fn test_conjunction_parenthesizes_raw_and_or_terms() {
    let expr = FilterExpr::all([
        FilterExpr::raw("a = 1 OR b = 2"),
        FilterExpr::any([FilterExpr::equals("c", 3_i64), FilterExpr::equals("d", 4_i64)]),
        FilterExpr::equals("e", "x"),
    ]);
    assert_eq!(expr.to_string(), "(a = 1 OR b = 2) AND (c = 3 OR d = 4) AND e = 'x'");
}

#[test]
fn test_disjunction_parenthesizes_and_terms() {
    let expr = FilterExpr::any([
        FilterExpr::all([FilterExpr::equals("a", 1_i64), FilterExpr::equals("b", 2_i64)]),
        FilterExpr::equals("c", 3_i64),
    ]);
    assert_eq!(expr.to_string(), "(a = 1 AND b = 2) OR c = 3");
}

#[test]
fn test_empty_terms_are_dropped() {
    let expr = FilterExpr::all([FilterExpr::raw("  "), FilterExpr::all([])]);
    assert!(expr.is_empty());
    assert_eq!(expr.to_expression(), None);

    let expr = FilterExpr::all([FilterExpr::raw(" a = 1 "), FilterExpr::raw("")]);
    assert_eq!(expr.to_expression().as_deref(), Some("a = 1"));
}

#[test]
fn test_filter_args_build_per_signal() {
    let args: FilterArgs = from_params(serde_json::json!({
        "service": "api",
        "severity": "warn",
        "operation": "GET /",
        "error": "false",
        "searchText": "oops"
    }))
    .unwrap();

    assert_eq!(
        args.build(&Signal::Logs, None).unwrap().to_string(),
        "service.name = 'api' AND severity_text = 'WARN' AND body CONTAINS 'oops'"
    );
    assert_eq!(
        args.build(&Signal::Traces, None).unwrap().to_string(),
        "service.name = 'api' AND name = 'GET /' AND hasError = false"
    );
    assert_eq!(
        args.build(&Signal::Metrics, Some("env = 'prod'")).unwrap().to_string(),
        "(env = 'prod') AND service.name = 'api'"
    );
}

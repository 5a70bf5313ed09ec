//! Builders for the query shapes the tools send

use serde_json::Map;

use crate::{
    timerange::TimeWindow,
    types::{
        Aggregation, CompositeQuery, Direction, FieldDescriptor, OrderBy, QueryEnvelope, QuerySpec,
        RequestType, Signal, StructuredQuery, SCHEMA_VERSION,
    },
};

impl StructuredQuery {
    /// Query with the given legs over a millisecond window
    pub fn new(window: TimeWindow, request_type: RequestType, queries: Vec<QuerySpec>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            start: window.start,
            end: window.end,
            request_type: Some(request_type),
            composite_query: CompositeQuery {
                queries: queries.into_iter().map(QueryEnvelope::builder).collect(),
            },
            format_options: None,
            variables: Map::new(),
        }
    }

    /// Newest-first list of raw log records or spans
    pub fn raw_list(signal: Signal, window: TimeWindow, filter: Option<String>, limit: u64, offset: u64) -> Self {
        let mut spec = QuerySpec::new("A", signal).with_filter(filter);
        spec.limit = Some(limit);
        spec.offset = (offset > 0).then_some(offset);
        spec.order = vec![OrderBy::new("timestamp", Direction::Desc)];

        Self::new(window, RequestType::Raw, vec![spec])
    }

    /// Time series of one metric, reduced over time and then across series
    pub fn metric_series(
        window: TimeWindow,
        metric_name: &str,
        time_aggregation: &str,
        space_aggregation: &str,
        group_by: Vec<String>,
        filter: Option<String>,
        step_interval: Option<i64>,
    ) -> Self {
        let mut spec = QuerySpec::new("A", Signal::Metrics).with_filter(filter);
        spec.aggregations = vec![Aggregation {
            metric_name: Some(metric_name.to_string()),
            time_aggregation: Some(time_aggregation.to_string()),
            space_aggregation: Some(space_aggregation.to_string()),
            ..Aggregation::default()
        }];
        spec.group_by = group_by.into_iter().map(FieldDescriptor::named).collect();
        spec.step_interval = step_interval;

        Self::new(window, RequestType::TimeSeries, vec![spec])
    }
}

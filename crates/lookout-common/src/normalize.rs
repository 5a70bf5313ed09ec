//! Signal-aware query normalization
//!
//! Callers (agents in particular) send queries that are structurally
//! plausible but not exactly what the backend accepts. Normalization fills in
//! the defaults each signal needs and rejects combinations that cannot work,
//! with messages that say which query leg is wrong and why.

use tracing::debug;

use crate::{
    error::{Error, Result},
    types::{QueryEnvelope, QuerySpec, RequestType, Signal, StructuredQuery, DEFAULT_STEP_INTERVAL, SCHEMA_VERSION},
};

impl StructuredQuery {
    /// Validate and finalize the query for the backend.
    ///
    /// Consumes the query; normalizing an already-normalized query returns
    /// it unchanged.
    pub fn normalize(mut self) -> Result<Self> {
        if self.schema_version.trim().is_empty() {
            self.schema_version = SCHEMA_VERSION.to_string();
        }

        if self.start == 0 || self.end == 0 {
            return Err(Error::Validation("missing start or end timestamp".to_string()));
        }

        if self.composite_query.queries.is_empty() {
            return Err(Error::Validation(
                "compositeQuery.queries must contain at least one query".to_string(),
            ));
        }

        // Any metrics leg makes the whole request a time series; every other
        // leg is then checked against that final type.
        let has_metrics = self
            .builder_queries()
            .any(|spec| spec.signal == Some(Signal::Metrics));
        let request_type = if has_metrics {
            RequestType::TimeSeries
        } else {
            self.request_type.take().unwrap_or(RequestType::Raw)
        };

        for (index, envelope) in self.composite_query.queries.iter_mut().enumerate() {
            let QueryEnvelope::Builder(spec) = envelope else {
                continue;
            };
            normalize_spec(spec, index, &request_type)?;
        }

        debug!(request_type = %request_type, queries = self.composite_query.queries.len(), "Normalized query");
        self.request_type = Some(request_type);

        Ok(self)
    }
}

fn normalize_spec(spec: &mut QuerySpec, index: usize, request_type: &RequestType) -> Result<()> {
    let name = spec.display_name(index);

    match spec.signal.clone() {
        Some(Signal::Metrics) => default_step_interval(spec),
        Some(signal @ (Signal::Logs | Signal::Traces)) => match request_type {
            RequestType::Raw => spec.step_interval = None,
            RequestType::Scalar => {
                spec.step_interval = None;
                require_aggregations(spec, &name, "scalar", &signal)?;
            }
            RequestType::TimeSeries => {
                require_aggregations(spec, &name, "time_series", &signal)?;
                default_step_interval(spec);
            }
            other => {
                return Err(Error::Validation(format!(
                    "{name}: unsupported requestType '{other}' for {signal}"
                )));
            }
        },
        other => {
            let value = other.as_ref().map(Signal::as_str).unwrap_or_default();
            return Err(Error::Validation(format!(
                "{name}: unknown signal type '{value}'"
            )));
        }
    }

    Ok(())
}

fn default_step_interval(spec: &mut QuerySpec) {
    if spec.step_interval.map_or(true, |step| step <= 0) {
        spec.step_interval = Some(DEFAULT_STEP_INTERVAL);
    }
}

fn require_aggregations(spec: &QuerySpec, name: &str, request_type: &str, signal: &Signal) -> Result<()> {
    if spec.aggregations.is_empty() {
        return Err(Error::Validation(format!(
            "{name}: missing aggregations for {request_type} {signal} query"
        )));
    }
    Ok(())
}

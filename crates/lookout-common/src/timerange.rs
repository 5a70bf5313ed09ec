//! Time window resolution for tool arguments
//!
//! A query window can be given three ways: a relative `timeRange` token
//! (`30m`, `2h`, `7d`, or any humantime duration such as `1h30m`), explicit
//! `start`/`end` epoch values, or nothing at all, in which case the tool's
//! default range ending now is used. `timeRange` always wins.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    args::{lenient_string, non_blank},
    error::{Error, Result},
};

/// Unit of epoch values produced and accepted by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Nanoseconds,
}

impl TimeUnit {
    fn name(self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Nanoseconds => "nanoseconds",
        }
    }

    fn epoch(self, at: DateTime<Utc>) -> Result<i64> {
        match self {
            TimeUnit::Milliseconds => Ok(at.timestamp_millis()),
            TimeUnit::Nanoseconds => at
                .timestamp_nanos_opt()
                .ok_or_else(|| Error::Internal(format!("{at} is out of range for nanoseconds"))),
        }
    }

    fn span(self, duration: Duration) -> Result<i64> {
        let span = match self {
            TimeUnit::Milliseconds => Some(duration.num_milliseconds()),
            TimeUnit::Nanoseconds => duration.num_nanoseconds(),
        };
        span.ok_or_else(|| {
            Error::InvalidParameter(format!(
                "time range is too large to express in {}; use a smaller \"timeRange\" such as \"30d\"",
                self.name()
            ))
        })
    }
}

/// Window-related tool arguments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeWindowArgs {
    #[serde(rename = "timeRange", default, deserialize_with = "lenient_string")]
    pub time_range: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub start: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub end: Option<String>,
}

impl TimeWindowArgs {
    pub fn relative(time_range: impl Into<String>) -> Self {
        Self {
            time_range: Some(time_range.into()),
            ..Self::default()
        }
    }
}

/// Resolved `(start, end)` pair in a single unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn span(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Resolve a window ending now.
pub fn resolve(args: &TimeWindowArgs, unit: TimeUnit, default_range: Duration) -> Result<TimeWindow> {
    resolve_at(args, unit, default_range, Utc::now())
}

/// Resolve a window relative to `now`.
pub fn resolve_at(
    args: &TimeWindowArgs,
    unit: TimeUnit,
    default_range: Duration,
    now: DateTime<Utc>,
) -> Result<TimeWindow> {
    let now_epoch = unit.epoch(now)?;

    if let Some(token) = non_blank(args.time_range.as_deref()) {
        let range = parse_time_range(token)?;
        return Ok(TimeWindow {
            start: start_before(now_epoch, unit.span(range)?)?,
            end: now_epoch,
        });
    }

    let end = match non_blank(args.end.as_deref()) {
        Some(raw) => parse_epoch("end", raw, unit)?,
        None => now_epoch,
    };

    let start = match non_blank(args.start.as_deref()) {
        Some(raw) => parse_epoch("start", raw, unit)?,
        None => start_before(end, unit.span(default_range)?)?,
    };

    if start > end {
        return Err(Error::InvalidParameter(format!(
            "start ({start}) is after end ({end}); swap them or pass \"timeRange\": \"1h\" instead"
        )));
    }

    Ok(TimeWindow { start, end })
}

fn start_before(end: i64, span: i64) -> Result<i64> {
    end.checked_sub(span).ok_or_else(|| {
        Error::InvalidParameter(format!(
            "end ({end}) is too far in the past to look back from; \
             pass a recent end or \"timeRange\": \"1h\" instead"
        ))
    })
}

/// Parse a relative range token such as `15m`, `6h`, `7d` or `1h30m`.
pub fn parse_time_range(token: &str) -> Result<Duration> {
    let token = token.trim();
    let invalid = || {
        Error::InvalidParameter(format!(
            "invalid timeRange '{token}': use a number followed by m, h or d, \
             e.g. \"timeRange\": \"30m\", \"2h\" or \"7d\""
        ))
    };

    let range = match split_simple(token) {
        Some((amount, 'm')) => Duration::try_minutes(amount),
        Some((amount, 'h')) => Duration::try_hours(amount),
        Some((amount, 'd')) => Duration::try_days(amount),
        _ => humantime::parse_duration(token)
            .ok()
            .and_then(|d| Duration::from_std(d).ok()),
    }
    .ok_or_else(invalid)?;

    if range <= Duration::zero() {
        return Err(invalid());
    }
    Ok(range)
}

fn split_simple(token: &str) -> Option<(i64, char)> {
    let unit = token.chars().last()?;
    let amount = &token[..token.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((amount.parse().ok()?, unit))
}

fn parse_epoch(field: &str, raw: &str, unit: TimeUnit) -> Result<i64> {
    raw.trim().parse::<i64>().map_err(|_| {
        let example = match unit {
            TimeUnit::Milliseconds => "1700000000000",
            TimeUnit::Nanoseconds => "1700000000000000000",
        };
        Error::InvalidParameter(format!(
            "invalid {field} '{raw}': expected an integer timestamp in {} \
             (e.g. \"{field}\": \"{example}\"); or pass \"timeRange\": \"1h\" instead",
            unit.name()
        ))
    })
}

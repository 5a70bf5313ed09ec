//! Client-side pagination of list results
//!
//! Backend list endpoints return everything at once; tools slice the result
//! and wrap the page so the caller can keep asking for `nextOffset`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    args::lenient_i64,
    error::{Error, Result},
};

/// A page of results plus what the caller needs to fetch the next one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationEnvelope<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

/// Return `items[offset .. offset + limit]`, clamped to the slice bounds.
pub fn slice<T>(items: &[T], offset: i64, limit: i64) -> &[T] {
    let start = clamp(offset).min(items.len());
    let end = start.saturating_add(clamp(limit)).min(items.len());
    &items[start..end]
}

/// Wrap an already-sliced page.
///
/// `nextOffset` advances by the requested `limit`, not by the page length, so
/// the caller's page size is kept even when a page comes back short.
pub fn wrap<T>(page: Vec<T>, total: usize, offset: i64, limit: i64) -> PaginationEnvelope<T> {
    envelope(page, total, clamp(offset), clamp(limit))
}

/// Slice and wrap in one step.
pub fn paginate<T: Clone>(items: &[T], offset: i64, limit: i64) -> PaginationEnvelope<T> {
    let page = slice(items, offset, limit).to_vec();
    envelope(page, items.len(), clamp(offset).min(items.len()), clamp(limit))
}

fn envelope<T>(page: Vec<T>, total: usize, offset: usize, limit: usize) -> PaginationEnvelope<T> {
    let has_more = offset.saturating_add(page.len()) < total;

    PaginationEnvelope {
        next_offset: has_more.then(|| offset.saturating_add(limit)),
        data: page,
        total,
        offset,
        limit,
        has_more,
    }
}

/// Items of a list response: a bare array, or the `data` array of a
/// `{status, data}` envelope.
pub fn extract_items(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => Some(items.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

fn clamp(n: i64) -> usize {
    usize::try_from(n.max(0)).unwrap_or(usize::MAX)
}

/// `offset`/`limit` tool arguments
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageArgs {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub offset: Option<i64>,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
}

impl PageArgs {
    /// Validated `(offset, limit)`: a missing or non-positive limit becomes
    /// `default_limit`, and limits above `max_limit` are rejected.
    pub fn resolve(&self, default_limit: usize, max_limit: usize) -> Result<(i64, i64)> {
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(Error::InvalidParameter(format!(
                "offset must be zero or positive, got {offset}. Example: \"offset\": \"0\""
            )));
        }

        let max = i64::try_from(max_limit).unwrap_or(i64::MAX);
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => i64::try_from(default_limit).unwrap_or(max),
        };
        if limit > max {
            return Err(Error::InvalidParameter(format!(
                "limit {limit} exceeds the maximum of {max_limit}; page through results with \
                 \"offset\" instead, e.g. \"limit\": \"{max_limit}\", \"offset\": \"{max_limit}\""
            )));
        }

        Ok((offset, limit))
    }
}

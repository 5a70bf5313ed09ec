//! Filter expressions
//!
//! Filters are assembled as a small expression tree and rendered to the
//! backend's filter language in one place, so values coming from tool
//! arguments are always quoted and escaped the same way.

use std::fmt;

use serde::Deserialize;

use crate::{
    args::{lenient_string, non_blank},
    error::{Error, Result},
    types::Signal,
};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "CONTAINS",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Str(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '\'' => f.write_str("\\'")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            FilterValue::Int(n) => write!(f, "{n}"),
            FilterValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Str(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Str(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

/// A filter expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// Caller-written expression, rendered as given
    Raw(String),
    Compare {
        field: String,
        op: CompareOp,
        value: FilterValue,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn raw(expression: impl Into<String>) -> Self {
        FilterExpr::Raw(expression.into().trim().to_string())
    }

    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FilterValue>) -> Self {
        FilterExpr::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(field, CompareOp::Contains, FilterValue::Str(value.into()))
    }

    /// Conjunction of the non-empty terms
    pub fn all(terms: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::And(terms.into_iter().filter(|t| !t.is_empty()).collect())
    }

    /// Disjunction of the non-empty terms
    pub fn any(terms: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::Or(terms.into_iter().filter(|t| !t.is_empty()).collect())
    }

    /// True when the expression renders to nothing
    pub fn is_empty(&self) -> bool {
        match self {
            FilterExpr::Raw(s) => s.trim().is_empty(),
            FilterExpr::Compare { .. } => false,
            FilterExpr::And(terms) | FilterExpr::Or(terms) => terms.iter().all(Self::is_empty),
        }
    }

    /// Rendered expression, or `None` when there is nothing to filter on
    pub fn to_expression(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    fn fmt_joined(
        f: &mut fmt::Formatter<'_>,
        terms: &[FilterExpr],
        joiner: &str,
        needs_parens: fn(&FilterExpr) -> bool,
    ) -> fmt::Result {
        let terms: Vec<&FilterExpr> = terms.iter().filter(|t| !t.is_empty()).collect();
        if let [single] = terms.as_slice() {
            return write!(f, "{single}");
        }

        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            if needs_parens(term) {
                write!(f, "({term})")?;
            } else {
                write!(f, "{term}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Raw(s) => f.write_str(s.trim()),
            FilterExpr::Compare { field, op, value } => {
                write!(f, "{field} {} {value}", op.as_str())
            }
            FilterExpr::And(terms) => Self::fmt_joined(f, terms, " AND ", |t| {
                matches!(t, FilterExpr::Raw(_) | FilterExpr::Or(_))
            }),
            FilterExpr::Or(terms) => Self::fmt_joined(f, terms, " OR ", |t| {
                matches!(t, FilterExpr::Raw(_) | FilterExpr::And(_))
            }),
        }
    }
}

/// Filter arguments shared by the search and aggregate tools
///
/// Each shortcut only contributes a term when it is present and non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterArgs {
    /// Free-form filter expression
    #[serde(default, deserialize_with = "lenient_string")]
    pub filter: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub service: Option<String>,

    /// Log severity text (logs only)
    #[serde(default, deserialize_with = "lenient_string")]
    pub severity: Option<String>,

    /// Span name (traces only)
    #[serde(default, deserialize_with = "lenient_string")]
    pub operation: Option<String>,

    /// `true`/`false` error flag (traces only)
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,

    /// Substring of the log body (logs only)
    #[serde(default, deserialize_with = "lenient_string")]
    pub search_text: Option<String>,
}

impl FilterArgs {
    /// AND of the free-form filter, `preset` and the signal's shortcut arguments.
    pub fn build(&self, signal: &Signal, preset: Option<&str>) -> Result<FilterExpr> {
        let mut terms = Vec::new();

        if let Some(filter) = non_blank(self.filter.as_deref()) {
            terms.push(FilterExpr::raw(filter));
        }
        if let Some(preset) = non_blank(preset) {
            terms.push(FilterExpr::raw(preset));
        }
        if let Some(service) = non_blank(self.service.as_deref()) {
            terms.push(FilterExpr::equals("service.name", service));
        }

        match signal {
            Signal::Logs => {
                if let Some(severity) = non_blank(self.severity.as_deref()) {
                    terms.push(FilterExpr::equals("severity_text", severity.to_uppercase()));
                }
                if let Some(text) = non_blank(self.search_text.as_deref()) {
                    terms.push(FilterExpr::contains("body", text));
                }
            }
            Signal::Traces => {
                if let Some(operation) = non_blank(self.operation.as_deref()) {
                    terms.push(FilterExpr::equals("name", operation));
                }
                if let Some(flag) = non_blank(self.error.as_deref()) {
                    terms.push(FilterExpr::equals("hasError", parse_flag("error", flag)?));
                }
            }
            Signal::Metrics | Signal::Other(_) => {}
        }

        Ok(FilterExpr::all(terms))
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidParameter(format!(
            "invalid {name} '{raw}': must be true or false. Example: \"{name}\": \"true\""
        ))),
    }
}

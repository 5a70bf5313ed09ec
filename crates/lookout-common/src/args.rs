//! Lenient deserialization helpers for agent-supplied tool arguments
//!
//! Agents routinely send `"limit": 10` where `"limit": "10"` is documented, or
//! the reverse. Scalar argument slots therefore accept strings, numbers and
//! booleans alike and only reject structured values, with a message naming
//! what was received.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Deserialize tool parameters into a typed argument struct.
///
/// A missing or `null` params object is treated as `{}` so tools whose
/// arguments are all optional can be called bare.
pub fn from_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };

    serde_json::from_value(params).map_err(|e| Error::InvalidParameter(e.to_string()))
}

/// Accept a string, number or boolean as text; `null` and blank strings become `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {}",
            kind_of(&other)
        ))),
    }
}

/// Accept an integer or a string holding one; `null` and blank strings become `None`.
pub fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {n}"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got '{s}'"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected an integer, got {}",
            kind_of(&other)
        ))),
    }
}

/// Same as [`lenient_i64`] but for a required field that defaults to zero.
pub fn lenient_i64_or_zero<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_i64(deserializer).map(Option::unwrap_or_default)
}

/// Trimmed value, or `None` when absent or blank
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

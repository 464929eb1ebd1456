//! Lenient field decoding for client-submitted records.
//!
//! Clients are loosely typed: ids may arrive as numbers, flags as strings, and
//! timestamps in any shape. A malformed field must never fail the whole
//! request, so these helpers coerce instead of erroring.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// String or numeric id. Anything else decodes to the empty string, which
/// callers treat as "no id".
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_from_value(&Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Optional foreign key. Empty strings and non-scalar values decode to `None`.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_from_value(&Value::deserialize(deserializer)?))
}

/// Epoch millis. Fractional values are truncated; non-numbers decode to 0.
pub fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    #[allow(clippy::cast_possible_truncation)]
    let millis = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
        .unwrap_or(0);
    Ok(millis)
}

/// Truthiness of a deletion flag.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let truthy = match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(value) => value,
        Value::Number(number) => number.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    };
    Ok(truthy)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub const fn is_false(value: &bool) -> bool {
    !*value
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

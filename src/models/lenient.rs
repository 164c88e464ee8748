//! Field decoders for analysis documents.
//!
//! Analyzer versions disagree on the JSON type of descriptive fields
//! (counts sent as floats, key points sent as lists). A value of an
//! unexpected shape decodes as absent instead of failing the document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode as `T`, or `None` when the value has another shape.
pub(crate) fn value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

/// Decode a count. Whole floats are accepted and a list counts its items.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let count = match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    };
    Ok(count.and_then(|n| u32::try_from(n).ok()))
}

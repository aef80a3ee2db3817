//! Recovery of JSON objects from model output.
//!
//! Model text is not guaranteed to be clean JSON: it may arrive fenced in
//! markdown or wrapped in prose. `parse_object` tries an ordered list of
//! candidate texts and returns the first one that parses to an object.
//! When none does, the result is `LlmError::MalformedResponse` carrying
//! the original text.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::infrastructure::ports::LlmError;

pub type JsonObject = Map<String, Value>;

/// Parse a JSON object out of raw model text.
///
/// Empty (or whitespace-only) input yields an empty object.
pub fn parse_object(text: &str) -> Result<JsonObject, LlmError> {
    if text.trim().is_empty() {
        return Ok(JsonObject::new());
    }

    let recovered = candidates(text).find_map(|candidate| {
        match serde_json::from_str::<Value>(&candidate) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        }
    });

    recovered.ok_or_else(|| {
        tracing::warn!(response = %text, "Could not recover JSON object from model response");
        LlmError::malformed(text)
    })
}

/// Parse a JSON object and deserialize it into `T`.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let object = parse_object(text)?;
    serde_json::from_value(Value::Object(object)).map_err(|e| {
        tracing::warn!(error = %e, "Recovered JSON did not match the expected shape");
        LlmError::malformed(text)
    })
}

/// Candidate texts in the order they are tried.
fn candidates(text: &str) -> impl Iterator<Item = Cow<'_, str>> {
    let direct = std::iter::once(Cow::Borrowed(text));
    let recovered = std::iter::once_with(move || Cow::Owned(strip_and_slice(text)));
    direct.chain(recovered)
}

/// Remove code fences, then cut to the span between the first `{` and the last `}`.
fn strip_and_slice(text: &str) -> String {
    let stripped = text.replace("```json", "").replace("```", "");
    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => stripped,
    }
}

// =============================================================================
// Lenient field access
// =============================================================================

/// Read a numeric value that may have been written as a number or a numeric string.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read an integer, rounding fractional values and saturating at the `i32` limits.
pub fn lenient_i32(value: &Value) -> Option<i32> {
    let number = lenient_f64(value)?;
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32)
}

/// Read a truthy flag: booleans, `"true"`, or non-zero numbers.
pub fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Read a string field, treating blank strings as missing.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read an identifier that may have been written as a string or a number.
pub fn lenient_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

//! Parameter helpers shared by the tools.
//!
//! All of these run before any network call, so their failures are validation errors.

use awskit_core::ToolError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Upper bound for `wait_timeout_seconds` on tools that poll a job.
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 86_400;

/// Trimmed value of a required string parameter.
pub fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

/// Trimmed value of an optional parameter; blank counts as absent.
pub fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Identifier with stray surrounding quotes and whitespace removed.
pub fn clean_id(value: &Option<String>) -> Option<String> {
    optional(value)
        .map(|s| s.trim_matches(|c| c == '"' || c == '\'').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an optional JSON-encoded parameter.
pub fn parse_json(raw: &Option<String>, field: &str) -> Result<Option<Value>, ToolError> {
    match optional(raw) {
        None => Ok(None),
        Some(text) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ToolError::validation(format!("{} must be valid JSON: {}", field, e))),
    }
}

/// Parse an optional JSON-encoded parameter that must be an object.
pub fn parse_json_object(
    raw: &Option<String>,
    field: &str,
) -> Result<Option<Map<String, Value>>, ToolError> {
    match parse_json(raw, field)? {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(ToolError::validation(format!(
            "{} must be a JSON object, got {}",
            field,
            json_type(&other)
        ))),
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check `min <= value <= max`.
pub fn check_range<T: PartialOrd + Display + Copy>(
    value: T,
    min: T,
    max: T,
    field: &str,
) -> Result<T, ToolError> {
    if value < min || value > max {
        return Err(ToolError::validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(value)
}

/// AWS JSON timestamps arrive as epoch seconds (possibly fractional) or ISO strings.
pub fn timestamp_to_rfc3339(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let millis = (secs * 1000.0).round() as i64;
            DateTime::<Utc>::from_timestamp_millis(millis).map(|t| t.to_rfc3339())
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// `YYYYmmddHHMMSS` in UTC, used to name generated resources.
pub fn timestamp_suffix() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// First eight hex digits of a random UUID.
pub fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        assert_eq!(required("  abc ", "name").unwrap(), "abc");
        let err = required("   ", "bucket_name").unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert!(err.to_string().contains("bucket_name is required"));
    }

    #[test]
    fn test_clean_id_strips_quotes() {
        assert_eq!(clean_id(&Some("\"mem-123\"".into())).as_deref(), Some("mem-123"));
        assert_eq!(clean_id(&Some(" 'abc' ".into())).as_deref(), Some("abc"));
        assert_eq!(clean_id(&Some("\"\"".into())), None);
        assert_eq!(clean_id(&None), None);
    }

    #[test]
    fn test_parse_json_object() {
        assert_eq!(parse_json_object(&None, "x").unwrap(), None);
        assert_eq!(parse_json_object(&Some("  ".into()), "x").unwrap(), None);
        let map = parse_json_object(&Some(r#"{"a": 1}"#.into()), "x").unwrap().unwrap();
        assert_eq!(map["a"], 1);

        let err = parse_json_object(&Some("[1]".into()), "metadata_filter").unwrap_err();
        assert!(err.to_string().contains("metadata_filter must be a JSON object, got array"));

        let err = parse_json(&Some("{bad".into()), "payload_json").unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_check_range() {
        assert_eq!(check_range(5, 1, 10, "topk").unwrap(), 5);
        let err = check_range(0, 1, 10, "topk").unwrap_err();
        assert!(err.to_string().contains("topk must be between 1 and 10, got 0"));
    }

    #[test]
    fn test_timestamp_to_rfc3339() {
        assert_eq!(
            timestamp_to_rfc3339(&json!(1700000000.5)).as_deref(),
            Some("2023-11-14T22:13:20.500+00:00")
        );
        assert_eq!(
            timestamp_to_rfc3339(&json!("2024-01-01T00:00:00Z")).as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(timestamp_to_rfc3339(&json!(null)), None);
    }

    #[test]
    fn test_short_id_is_hex() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

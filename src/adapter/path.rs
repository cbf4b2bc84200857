use crate::error::AdapterError;
use serde_json::Value;

/// Resolves a dotted path (`media.bucket`, `content.0.text`) inside a JSON value.
/// Numeric segments index into arrays.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn missing(reported_path: &str) -> AdapterError {
    AdapterError::MissingField {
        field: reported_path
            .rsplit('.')
            .next()
            .unwrap_or(reported_path)
            .to_string(),
        path: reported_path.to_string(),
    }
}

/// Turns an optional lookup result into a value, treating null as missing.
pub fn expect_value<'a>(
    value: Option<&'a Value>,
    reported_path: &str,
) -> Result<&'a Value, AdapterError> {
    value
        .filter(|v| !v.is_null())
        .ok_or_else(|| missing(reported_path))
}

/// Turns an optional lookup result into a non-empty string.
pub fn expect_str<'a>(
    value: Option<&'a Value>,
    reported_path: &str,
) -> Result<&'a str, AdapterError> {
    let value = expect_value(value, reported_path)?;
    match value.as_str() {
        Some("") => Err(missing(reported_path)),
        Some(s) => Ok(s),
        None => Err(AdapterError::InvalidField {
            path: reported_path.to_string(),
            message: format!("expected a string, found {}", value),
        }),
    }
}

pub fn require_str<'a>(
    root: &'a Value,
    path: &str,
    reported_path: &str,
) -> Result<&'a str, AdapterError> {
    expect_str(lookup(root, path), reported_path)
}

pub fn optional_str<'a>(root: &'a Value, path: &str) -> Option<&'a str> {
    lookup(root, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

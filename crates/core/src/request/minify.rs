//! Payload minification: drop `null` and empty-string fields

use serde_json::Value;

/// Recursively remove object fields whose value is `null` or `""`
///
/// Array elements are minified but never removed, so positions are stable.
/// Key order is preserved and the operation is idempotent.
pub fn minify(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !is_empty_field(v))
                .map(|(k, v)| (k, minify(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(minify).collect()),
        other => other,
    }
}

fn is_empty_field(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

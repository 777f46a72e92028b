//! Null-tolerant nested lookup over JSON values.
//!
//! Paths are dot-separated; a numeric segment indexes into an array (and is
//! an ordinary key on an object). Any miss along the way -- absent key,
//! index out of bounds, traversing into a scalar, or an explicit JSON
//! `null` -- yields `None` rather than an error.

use serde_json::Value;

/// Follow `path` through `value`.
///
/// ```
/// use harvest_source::lookup;
/// use serde_json::json;
///
/// let event = json!({"competitions": [{"venue": {"fullName": "Eden Park"}}]});
/// assert_eq!(
///     lookup(&event, "competitions.0.venue.fullName"),
///     Some(&json!("Eden Park"))
/// );
/// assert_eq!(lookup(&event, "competitions.1.venue"), None);
/// ```
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Look up a text field. Numbers and booleans are rendered as text; objects
/// and arrays are not text and yield `None`.
pub fn lookup_str(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Look up an integer. The provider sends scores as strings, so numeric
/// strings are accepted; blank or non-numeric strings yield `None`.
pub fn lookup_i64(value: &Value, path: &str) -> Option<i64> {
    match lookup(value, path)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Look up a flag, accepting `true`/`false` as JSON booleans or strings.
pub fn lookup_bool(value: &Value, path: &str) -> Option<bool> {
    match lookup(value, path)? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Look up an array.
pub fn lookup_array<'a>(value: &'a Value, path: &str) -> Option<&'a Vec<Value>> {
    lookup(value, path)?.as_array()
}

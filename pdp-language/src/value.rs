//! Value helpers shared by expression evaluation and the decision engine.

use serde_json::Value;

/// Best-effort boolean coercion.
///
/// Booleans are returned as-is, numbers are `true` when non-zero, and the
/// strings `"true"`/`"false"` map to their boolean. Every other value yields
/// `None`.
#[must_use]
pub fn coerce_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

//! Conversions between JSON context values and CEL values.

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::objects::{Key, Map, Value as CelValue};
use serde_json::{Number, Value};

/// Converts a JSON value into a CEL value.
///
/// Integers that fit an `i64` become `Int`, larger ones `UInt`, and every
/// other number `Float`.
#[must_use]
pub fn json_to_cel(value: &Value) -> CelValue {
    match value {
        Value::Null => CelValue::Null,
        Value::Bool(flag) => CelValue::Bool(*flag),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                CelValue::Int(int)
            } else if let Some(uint) = number.as_u64() {
                CelValue::UInt(uint)
            } else {
                number.as_f64().map_or(CelValue::Null, CelValue::Float)
            }
        }
        Value::String(text) => CelValue::String(Arc::new(text.clone())),
        Value::Array(items) => CelValue::List(Arc::new(items.iter().map(json_to_cel).collect())),
        Value::Object(object) => {
            let map: HashMap<Key, CelValue> = object
                .iter()
                .map(|(key, nested)| (Key::from(key.clone()), json_to_cel(nested)))
                .collect();
            CelValue::Map(Map { map: Arc::new(map) })
        }
    }
}

/// Converts a CEL value back into JSON.
///
/// Bytes become an array of numbers; durations, timestamps and functions
/// have no JSON counterpart and are rendered as their debug string.
#[must_use]
pub fn cel_to_json(value: &CelValue) -> Value {
    match value {
        CelValue::Null => Value::Null,
        CelValue::Bool(flag) => Value::Bool(*flag),
        CelValue::Int(int) => Value::Number((*int).into()),
        CelValue::UInt(uint) => Value::Number((*uint).into()),
        CelValue::Float(float) => Number::from_f64(*float).map_or(Value::Null, Value::Number),
        CelValue::String(text) => Value::String(text.to_string()),
        CelValue::Bytes(bytes) => Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect()),
        CelValue::List(items) => Value::Array(items.iter().map(cel_to_json).collect()),
        CelValue::Map(map) => Value::Object(
            map.map
                .iter()
                .map(|(key, nested)| (key_to_string(key), cel_to_json(nested)))
                .collect(),
        ),
        CelValue::Duration(_) | CelValue::Timestamp(_) | CelValue::Function(..) => {
            Value::String(format!("{value:?}"))
        }
    }
}

fn key_to_string(key: &Key) -> String {
    match key {
        Key::String(text) => text.to_string(),
        Key::Int(int) => int.to_string(),
        Key::Uint(uint) => uint.to_string(),
        Key::Bool(flag) => flag.to_string(),
    }
}

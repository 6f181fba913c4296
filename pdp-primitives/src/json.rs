//! Helpers for navigating and merging loosely-typed attribute documents.

use serde_json::{Map, Value};

/// Recursively merges `source` into `target`.
///
/// Objects are merged key by key; any other value in `source` replaces the
/// value at the same position in `target`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_objects(target, source),
        (target, source) => *target = source,
    }
}

/// Object flavour of [`deep_merge`].
pub fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

/// Looks up a dotted path (`role.name`, `items.0`) below `root`.
#[must_use]
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Wraps `value` into nested objects named by the dotted `path`, so that
/// `nest("subject.role", v)` yields `{"subject": {"role": v}}`.
#[must_use]
pub fn nest(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_owned(), inner);
        Value::Object(map)
    })
}

/// Returns `true` when the value is neither absent nor `null`.
#[must_use]
pub fn is_present(value: Option<&Value>) -> bool {
    value.is_some_and(|value| !value.is_null())
}

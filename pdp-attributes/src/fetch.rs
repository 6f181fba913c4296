//! The attribute fetch collaborator contract.

use async_trait::async_trait;
use pdp_primitives::{AttributeMap, Context, json};
use serde_json::{Map, Value};

use crate::error::AttributeResult;

/// Supplies attribute values the request context does not carry.
///
/// The response is an object keyed by the keys of `attribute_map`. A key is
/// either a category (`subject`) or, during recursive resolution, a dotted
/// prefix (`subject.role`); its value is an object holding the requested
/// attributes relative to that key. Unknown keys are ignored and attributes
/// the source does not know may simply be left out.
///
/// Implementations must be idempotent and must not depend on the engine's
/// own state.
#[async_trait]
pub trait AttributeFetch: Send + Sync {
    /// Retrieves the attributes named by `attribute_map` for `context`.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::AttributeError`] when the source fails; the
    /// resolver then treats every requested attribute as unresolved.
    async fn retrieve_attributes(
        &self,
        context: &Context,
        attribute_map: &AttributeMap,
    ) -> AttributeResult<Map<String, Value>>;
}

/// In-memory [`AttributeFetch`] answering from a fixed document shaped like
/// a context (`{"subject": {...}, "resource": {...}}`).
#[derive(Debug, Clone, Default)]
pub struct StaticAttributes {
    document: Value,
}

impl StaticAttributes {
    /// Creates a source backed by `document`.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    fn answer(&self, attribute_map: &AttributeMap) -> Map<String, Value> {
        let mut response = Map::new();
        for (key, paths) in attribute_map.iter() {
            let Some(root) = json::lookup(&self.document, key) else {
                continue;
            };
            let mut found = Value::Object(Map::new());
            for path in paths {
                if let Some(value) = json::lookup(root, path) {
                    json::deep_merge(&mut found, json::nest(path, value.clone()));
                }
            }
            response.insert(key.to_owned(), found);
        }
        response
    }
}

#[async_trait]
impl AttributeFetch for StaticAttributes {
    async fn retrieve_attributes(
        &self,
        _context: &Context,
        attribute_map: &AttributeMap,
    ) -> AttributeResult<Map<String, Value>> {
        Ok(self.answer(attribute_map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn static_source_answers_relative_to_each_key() {
        let source = StaticAttributes::new(json!({
            "subject": {"age": 40, "role": {"name": "admin", "level": 3}}
        }));
        let map = AttributeMap::new()
            .with("subject", "age")
            .with("subject", "height")
            .with("subject.role", "name")
            .with("resource", "id");
        let response = source
            .retrieve_attributes(&Context::new(), &map)
            .await
            .unwrap();
        assert_eq!(response.get("subject"), Some(&json!({"age": 40})));
        assert_eq!(response.get("subject.role"), Some(&json!({"name": "admin"})));
        assert!(!response.contains_key("resource"));
    }
}

//! Per-field coercion helpers sharing one error collector.

use pdp_primitives::{AttributeMap, Effect, ElementId, ElementKind, ValidationError, Version};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Reads the fields of one raw document, appending a [`ValidationError`]
/// for every field that fails and carrying on with the next.
pub(crate) struct Fields<'r, 'e> {
    raw: &'r Map<String, Value>,
    kind: ElementKind,
    id: Option<ElementId>,
    errors: &'e mut Vec<ValidationError>,
    debug: bool,
}

impl<'r, 'e> Fields<'r, 'e> {
    pub(crate) fn new(
        raw: &'r Map<String, Value>,
        kind: ElementKind,
        errors: &'e mut Vec<ValidationError>,
        debug: bool,
    ) -> Self {
        Self {
            raw,
            kind,
            id: None,
            errors,
            debug,
        }
    }

    pub(crate) fn push(&mut self, field: &'static str, reason: impl Into<String>) {
        let error = ValidationError::new(self.kind, self.id.clone(), field, reason);
        if self.debug {
            debug!(%error, "validation failed");
        }
        self.errors.push(error);
    }

    /// Hands the collector to a nested normalization pass.
    pub(crate) fn errors(&mut self) -> &mut Vec<ValidationError> {
        &mut *self.errors
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'r Value> {
        self.raw.get(key).filter(|value| !value.is_null())
    }

    /// Reads the mandatory id. Errors pushed afterwards carry it.
    pub(crate) fn id(&mut self) -> Option<ElementId> {
        self.id = self.get("id").and_then(ElementId::from_value);
        if self.id.is_none() {
            let found = render(self.raw.get("id"));
            self.push("id", format!("{found} must be an integer or a non-empty string"));
        }
        self.id.clone()
    }

    pub(crate) fn version(&mut self, required: bool) -> Option<Version> {
        match self.get("version") {
            None if !required => None,
            raw => {
                let version = raw.and_then(Version::from_value);
                if version.is_none() {
                    let found = render(raw);
                    self.push("version", format!("{found} must be a number or a non-empty string"));
                }
                version
            }
        }
    }

    pub(crate) fn effect(&mut self, required: bool) -> Option<Effect> {
        match self.get("effect") {
            None if !required => None,
            raw => {
                let effect = raw.and_then(Value::as_str).and_then(Effect::from_name);
                if effect.is_none() {
                    let found = render(raw);
                    self.push("effect", format!("{found} must be one of Permit, Deny"));
                }
                effect
            }
        }
    }

    /// Non-string descriptions are dropped without an error.
    pub(crate) fn description(&self) -> Option<String> {
        self.get("description")
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    pub(crate) fn optional_id(&mut self, key: &'static str) -> Option<ElementId> {
        let raw = self.get(key)?;
        let id = ElementId::from_value(raw);
        if id.is_none() {
            self.push(key, format!("{raw} must be an integer or a non-empty string"));
        }
        id
    }

    /// Reads an id list, keeping the valid entries.
    pub(crate) fn ids(&mut self, key: &'static str) -> Vec<ElementId> {
        let Some(items) = self.list(key) else {
            return Vec::new();
        };
        let ids: Vec<ElementId> = items.iter().filter_map(ElementId::from_value).collect();
        if ids.len() != items.len() {
            self.push(key, "must be a list of integers or non-empty strings");
        }
        ids
    }

    /// Reads a URL list, keeping the entries that parse as absolute URLs.
    pub(crate) fn urls(&mut self, key: &'static str) -> Vec<String> {
        let Some(items) = self.list(key) else {
            return Vec::new();
        };
        let urls: Vec<String> = items
            .iter()
            .filter_map(Value::as_str)
            .filter(|candidate| Url::parse(candidate).is_ok())
            .map(str::to_owned)
            .collect();
        if urls.len() != items.len() {
            self.push(key, "must be a list of absolute URLs");
        }
        urls
    }

    pub(crate) fn list(&mut self, key: &'static str) -> Option<&'r Vec<Value>> {
        let raw = self.get(key)?;
        let items = raw.as_array();
        if items.is_none() {
            self.push(key, format!("{raw} must be an array"));
        }
        items
    }

    pub(crate) fn attribute_map(&mut self) -> Option<AttributeMap> {
        let raw = self.get("attributeMap")?;
        match AttributeMap::from_value(raw) {
            Ok(map) => Some(map),
            Err(error) => {
                self.push("attributeMap", error.to_string());
                None
            }
        }
    }

    /// Collects the fields no normalization step interprets.
    pub(crate) fn extensions(&self, known: &[&str]) -> Map<String, Value> {
        self.raw
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "missing value".to_owned(), |value| format!("`{value}`"))
}

//! Category-indexed attribute dependency maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maps a context category (`subject`, `resource`, ...) to the ordered list of
/// dotted attribute paths, relative to that category, needed by one
/// evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, Vec<String>>);

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` under `category`, ignoring duplicates while keeping
    /// first-seen order.
    pub fn insert(&mut self, category: impl Into<String>, path: impl Into<String>) {
        let path = path.into();
        let paths = self.0.entry(category.into()).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    /// Adds an entry and returns the updated map.
    #[must_use]
    pub fn with(mut self, category: impl Into<String>, path: impl Into<String>) -> Self {
        self.insert(category, path);
        self
    }

    /// Merges every entry of `other` into this map.
    pub fn extend(&mut self, other: &Self) {
        for (category, paths) in other.iter() {
            for path in paths {
                self.insert(category, path.as_str());
            }
        }
    }

    /// Returns the paths recorded for a category.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    /// Returns `true` when the category is present.
    #[must_use]
    pub fn contains_category(&self, category: &str) -> bool {
        self.0.contains_key(category)
    }

    /// Iterates over categories and their paths.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(category, paths)| (category.as_str(), paths.as_slice()))
    }

    /// Returns `true` when no category lists any path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Returns every path qualified with its category (`subject.role.name`).
    #[must_use]
    pub fn qualified_paths(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(category, paths)| {
                paths.iter().map(move |path| format!("{category}.{path}"))
            })
            .collect()
    }

    /// Parses a JSON object of category → array of path strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAttributeMap`] when the value is not an object
    /// or any entry is not an array of non-empty strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(Error::InvalidAttributeMap {
                reason: "must be an object".into(),
            });
        };

        let mut map = Self::new();
        for (category, paths) in entries {
            let Value::Array(paths) = paths else {
                return Err(Error::InvalidAttributeMap {
                    reason: format!("category `{category}` must list its paths in an array"),
                });
            };
            for path in paths {
                match path.as_str() {
                    Some(path) if !path.trim().is_empty() => map.insert(category.as_str(), path),
                    _ => {
                        return Err(Error::InvalidAttributeMap {
                            reason: format!("category `{category}` contains a non-string path"),
                        });
                    }
                }
            }
        }
        Ok(map)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (category, path) in iter {
            map.insert(category, path);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_deduplicates_and_keeps_order() {
        let map = AttributeMap::new()
            .with("subject", "role.name")
            .with("subject", "age")
            .with("subject", "role.name")
            .with("resource", "owner");
        assert_eq!(map.get("subject").unwrap(), ["role.name", "age"]);
        assert_eq!(
            map.qualified_paths(),
            ["resource.owner", "subject.role.name", "subject.age"]
        );
    }

    #[test]
    fn from_value_rejects_malformed_documents() {
        let map = AttributeMap::from_value(&json!({"subject": ["age"]})).unwrap();
        assert_eq!(map.get("subject").unwrap(), ["age"]);

        assert!(AttributeMap::from_value(&json!(["age"])).is_err());
        assert!(AttributeMap::from_value(&json!({"subject": "age"})).is_err());
        assert!(AttributeMap::from_value(&json!({"subject": [1]})).is_err());
    }

    #[test]
    fn empty_categories_count_as_empty() {
        let map = AttributeMap::from_value(&json!({"subject": []})).unwrap();
        assert!(map.is_empty());
    }
}

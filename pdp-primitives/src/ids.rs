//! Element identifier and version types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// Identifier of a policy element. Documents may use either integers or
/// strings.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    /// Integer identifier.
    Integer(i64),
    /// String identifier.
    Text(String),
}

impl ElementId {
    /// Coerces a loosely-typed JSON value into an identifier.
    ///
    /// Accepts integers and non-empty strings; everything else yields `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Self::Integer),
            Value::String(text) if !text.trim().is_empty() => Some(Self::Text(text.clone())),
            _ => None,
        }
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(id) => Display::fmt(id, f),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ElementId {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl FromStr for ElementId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(Error::InvalidElementId { id: s.to_owned() });
        }
        Ok(s.parse::<i64>().map_or_else(|_| Self::from(s), Self::Integer))
    }
}

/// Version tag of a policy element, compared verbatim for cache invalidation.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Creates a version from any string-like value.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Coerces a loosely-typed JSON value into a version. Numbers keep their
    /// textual rendering (`1.0` stays `"1.0"`).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Self(number.to_string())),
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.clone())),
            _ => None,
        }
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

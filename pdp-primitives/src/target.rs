//! Canonical Target/Condition shape.

use serde::{Deserialize, Serialize};

/// Innermost group: an ordered list of expression strings.
pub type AllOf = Vec<String>;

/// Middle group: an ordered list of [`AllOf`] groups.
pub type AnyOf = Vec<AllOf>;

/// Canonical Target or Condition: an ordered sequence of [`AnyOf`] groups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(Vec<AnyOf>);

impl Target {
    /// Wraps an already canonical sequence.
    #[must_use]
    pub fn new(any_of: Vec<AnyOf>) -> Self {
        Self(any_of)
    }

    /// Builds a target holding a single expression.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self(vec![vec![vec![expression.into()]]])
    }

    /// Returns the [`AnyOf`] groups in declaration order.
    #[must_use]
    pub fn any_of(&self) -> &[AnyOf] {
        &self.0
    }

    /// Iterates over every expression string, left to right.
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().flatten().map(String::as_str)
    }

    /// Returns `true` when the target holds no `AnyOf` group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//! Accepted input shapes for targets and conditions.

use pdp_primitives::{AllOf, AnyOf, Target};
use serde_json::Value;

/// One of the four shapes a Target or Condition may be written in.
///
/// [`TargetShape::parse`] tries them in declaration order and keeps the first
/// that fits, so a value valid under two shapes resolves to the earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetShape {
    /// Already canonical: `[[["a", "b"]], [["c"]]]`.
    AnyOfSequence(Vec<AnyOf>),
    /// A single AnyOf: `[["a", "b"], ["c"]]`.
    AnyOf(AnyOf),
    /// A single AllOf: `["a", "b"]`.
    AllOf(AllOf),
    /// A bare expression: `"a"`.
    Expression(String),
}

impl TargetShape {
    /// Parses the first structurally valid shape, if any.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        any_of_sequence(value)
            .map(Self::AnyOfSequence)
            .or_else(|| any_of(value).map(Self::AnyOf))
            .or_else(|| all_of(value).map(Self::AllOf))
            .or_else(|| value.as_str().map(|expression| Self::Expression(expression.to_owned())))
    }

    /// Converts the shape to the canonical AnyOf sequence.
    #[must_use]
    pub fn into_target(self) -> Target {
        match self {
            Self::AnyOfSequence(sequence) => Target::new(sequence),
            Self::AnyOf(any_of) => Target::new(vec![any_of]),
            Self::AllOf(all_of) => Target::new(vec![vec![all_of]]),
            Self::Expression(expression) => Target::expression(expression),
        }
    }
}

fn all_of(value: &Value) -> Option<AllOf> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}

fn any_of(value: &Value) -> Option<AnyOf> {
    value.as_array()?.iter().map(all_of).collect()
}

fn any_of_sequence(value: &Value) -> Option<Vec<AnyOf>> {
    value.as_array()?.iter().map(any_of).collect()
}

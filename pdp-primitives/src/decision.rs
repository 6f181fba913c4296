//! Decision and effect values produced by policy evaluation.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Outcome of evaluating a policy element against a decision request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Access is granted.
    Permit,
    /// Access is refused.
    Deny,
    /// The element does not apply to the request.
    NotApplicable,
    /// Evaluation could not be completed.
    Indeterminate,
}

impl Decision {
    /// Every decision value, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Permit,
        Self::Deny,
        Self::NotApplicable,
        Self::Indeterminate,
    ];

    /// Returns the canonical name of the decision.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Permit => "Permit",
            Self::Deny => "Deny",
            Self::NotApplicable => "NotApplicable",
            Self::Indeterminate => "Indeterminate",
        }
    }

    /// Returns `true` for every decision other than `NotApplicable`.
    #[must_use]
    pub const fn is_applicable(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome a rule declares when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// The rule grants access.
    Permit,
    /// The rule refuses access.
    Deny,
}

impl Effect {
    /// Both effect values.
    pub const ALL: [Self; 2] = [Self::Permit, Self::Deny];

    /// Parses an effect from its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Permit" => Some(Self::Permit),
            "Deny" => Some(Self::Deny),
            _ => None,
        }
    }

    /// Returns the canonical name of the effect.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Permit => "Permit",
            Self::Deny => "Deny",
        }
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Permit => Self::Permit,
            Effect::Deny => Self::Deny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_map_onto_decisions() {
        assert_eq!(Decision::from(Effect::Permit), Decision::Permit);
        assert_eq!(Decision::from(Effect::Deny), Decision::Deny);
        assert_eq!(Effect::from_name("Deny"), Some(Effect::Deny));
        assert_eq!(Effect::from_name("deny"), None);
    }

    #[test]
    fn decisions_serialize_by_name() {
        let encoded = serde_json::to_string(&Decision::NotApplicable).unwrap();
        assert_eq!(encoded, "\"NotApplicable\"");
        assert!(!Decision::NotApplicable.is_applicable());
        assert!(Decision::Indeterminate.is_applicable());
    }
}

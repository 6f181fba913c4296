//! Combining algorithm identifiers.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The six combining algorithms implemented by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAlgorithm {
    /// The first `Deny` wins; otherwise `Indeterminate`, then `Permit`.
    DenyOverrides,
    /// The first `Permit` wins; otherwise `Indeterminate`, then `Deny`.
    PermitOverrides,
    /// `Permit` if any child permits, `Deny` otherwise.
    DenyUnlessPermit,
    /// `Deny` if any child denies, `Permit` otherwise.
    PermitUnlessDeny,
    /// The first applicable child decision.
    FirstApplicable,
    /// Exactly one applicable child; only valid on policy sets.
    OnlyOneApplicable,
}

impl BuiltinAlgorithm {
    /// Every built-in algorithm.
    pub const ALL: [Self; 6] = [
        Self::DenyOverrides,
        Self::PermitOverrides,
        Self::DenyUnlessPermit,
        Self::PermitUnlessDeny,
        Self::FirstApplicable,
        Self::OnlyOneApplicable,
    ];

    /// Returns the canonical name used in policy documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DenyOverrides => "DenyOverrides",
            Self::PermitOverrides => "PermitOverrides",
            Self::DenyUnlessPermit => "DenyUnlessPermit",
            Self::PermitUnlessDeny => "PermitUnlessDeny",
            Self::FirstApplicable => "FirstApplicable",
            Self::OnlyOneApplicable => "OnlyOneApplicable",
        }
    }

    /// Parses a built-in algorithm from its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|algorithm| algorithm.name() == name)
    }

    /// Returns `false` for algorithms restricted to policy sets.
    #[must_use]
    pub const fn allowed_on_policy(self) -> bool {
        !matches!(self, Self::OnlyOneApplicable)
    }
}

impl Display for BuiltinAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Combining algorithm referenced by a policy or policy set: either a
/// built-in or the id of an externally registered algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombiningAlgorithm {
    /// One of the engine's own algorithms.
    Builtin(BuiltinAlgorithm),
    /// Identifier of a registered custom algorithm.
    Custom(String),
}

impl CombiningAlgorithm {
    /// Returns the built-in variant, if any.
    #[must_use]
    pub const fn builtin(&self) -> Option<BuiltinAlgorithm> {
        match self {
            Self::Builtin(algorithm) => Some(*algorithm),
            Self::Custom(_) => None,
        }
    }

    /// Returns the identifier as written in policy documents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Builtin(algorithm) => algorithm.name(),
            Self::Custom(id) => id.as_str(),
        }
    }
}

impl Default for CombiningAlgorithm {
    fn default() -> Self {
        Self::Builtin(BuiltinAlgorithm::DenyOverrides)
    }
}

impl Display for CombiningAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BuiltinAlgorithm> for CombiningAlgorithm {
    fn from(value: BuiltinAlgorithm) -> Self {
        Self::Builtin(value)
    }
}

impl From<String> for CombiningAlgorithm {
    fn from(value: String) -> Self {
        BuiltinAlgorithm::from_name(&value).map_or(Self::Custom(value), Self::Builtin)
    }
}

impl From<&str> for CombiningAlgorithm {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<CombiningAlgorithm> for String {
    fn from(value: CombiningAlgorithm) -> Self {
        match value {
            CombiningAlgorithm::Builtin(algorithm) => algorithm.name().to_owned(),
            CombiningAlgorithm::Custom(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_to_builtins_before_custom() {
        assert_eq!(
            CombiningAlgorithm::from("FirstApplicable"),
            CombiningAlgorithm::Builtin(BuiltinAlgorithm::FirstApplicable)
        );
        assert_eq!(
            CombiningAlgorithm::from("weighted-vote"),
            CombiningAlgorithm::Custom("weighted-vote".into())
        );
    }

    #[test]
    fn only_one_applicable_is_policy_set_only() {
        assert!(!BuiltinAlgorithm::OnlyOneApplicable.allowed_on_policy());
        assert!(
            BuiltinAlgorithm::ALL
                .into_iter()
                .filter(|algorithm| algorithm.allowed_on_policy())
                .count()
                == 5
        );
    }

    #[test]
    fn serde_uses_document_names() {
        let algorithm: CombiningAlgorithm = serde_json::from_str("\"PermitUnlessDeny\"").unwrap();
        assert_eq!(algorithm.builtin(), Some(BuiltinAlgorithm::PermitUnlessDeny));
        assert_eq!(
            serde_json::to_string(&CombiningAlgorithm::Custom("x".into())).unwrap(),
            "\"x\""
        );
    }
}

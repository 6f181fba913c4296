//! Field-level validation problems.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ElementId;

/// Kind of record a validation problem or trace entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// A rule inside a policy.
    Rule,
    /// A policy holding rules.
    Policy,
    /// A policy set holding policies and nested sets.
    PolicySet,
    /// An obligation directive.
    Obligation,
    /// An advice directive.
    Advice,
    /// A registered rule handler.
    RuleHandler,
    /// A registered custom combining algorithm.
    CustomCombiningAlgorithm,
    /// A decision request.
    Context,
}

impl ElementKind {
    /// Returns the display name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rule => "Rule",
            Self::Policy => "Policy",
            Self::PolicySet => "PolicySet",
            Self::Obligation => "Obligation",
            Self::Advice => "Advice",
            Self::RuleHandler => "RuleHandler",
            Self::CustomCombiningAlgorithm => "CustomCombiningAlgorithm",
            Self::Context => "Context",
        }
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field that failed coercion or validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    kind: ElementKind,
    element_id: Option<ElementId>,
    field: &'static str,
    reason: String,
}

impl ValidationError {
    /// Creates a validation error for `field` of the given element.
    #[must_use]
    pub fn new(
        kind: ElementKind,
        element_id: Option<ElementId>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            element_id,
            field,
            reason: reason.into(),
        }
    }

    /// Returns the kind of the offending element.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Returns the offending element's id, when it had a valid one.
    #[must_use]
    pub fn element_id(&self) -> Option<&ElementId> {
        self.element_id.as_ref()
    }

    /// Returns the name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.element_id {
            Some(id) => write!(f, "{} #{id}", self.kind)?,
            None => write!(f, "{}", self.kind)?,
        }
        write!(f, " has an invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

//! Collaborator contracts consumed by the engine.

use async_trait::async_trait;
use pdp_language::ContextQuery;
use pdp_primitives::{
    CombiningAlgorithm, ElementId, ElementKind, Policy, PolicySet, Result, Target, Version,
};

use crate::registry::{RawCombiningAlgorithm, RawRuleHandler};

/// Policy Retrieval Point: supplies candidate policies for a request.
#[async_trait]
pub trait PolicyRetrieval: Send + Sync {
    /// Returns the policies matching the attribute-derived queries.
    async fn retrieve_context_policies(&self, queries: &[ContextQuery]) -> Result<Vec<Policy>>;

    /// Returns the policy sets matching the attribute-derived queries.
    async fn retrieve_context_policy_sets(
        &self,
        queries: &[ContextQuery],
    ) -> Result<Vec<PolicySet>>;
}

/// Supplies rule handler and custom combining algorithm registrations.
///
/// Called once per [`crate::PolicyDecisionPoint::bootstrap`].
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Lists raw rule handler registrations.
    async fn retrieve_rule_handlers(&self) -> Result<Vec<RawRuleHandler>>;

    /// Lists raw custom combining algorithm registrations.
    async fn retrieve_custom_combining_algorithms(&self) -> Result<Vec<RawCombiningAlgorithm>>;
}

/// Registry source with nothing registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRegistry;

#[async_trait]
impl RegistrySource for EmptyRegistry {
    async fn retrieve_rule_handlers(&self) -> Result<Vec<RawRuleHandler>> {
        Ok(Vec::new())
    }

    async fn retrieve_custom_combining_algorithms(&self) -> Result<Vec<RawCombiningAlgorithm>> {
        Ok(Vec::new())
    }
}

/// A node the combining reducers operate on.
#[derive(Debug, Clone, Copy)]
pub enum PolicyElement<'a> {
    /// A policy combining its rules.
    Policy(&'a Policy),
    /// A policy set combining its policies and nested sets.
    PolicySet(&'a PolicySet),
}

impl<'a> PolicyElement<'a> {
    /// Returns the element kind.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Policy(_) => ElementKind::Policy,
            Self::PolicySet(_) => ElementKind::PolicySet,
        }
    }

    /// Returns the identifier, `None` for the synthetic request root.
    #[must_use]
    pub fn id(&self) -> Option<&'a ElementId> {
        match *self {
            Self::Policy(policy) => policy.id.as_ref(),
            Self::PolicySet(set) => set.id.as_ref(),
        }
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> Option<&'a Version> {
        match *self {
            Self::Policy(policy) => policy.version.as_ref(),
            Self::PolicySet(set) => set.version.as_ref(),
        }
    }

    /// Returns the target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&'a Target> {
        match *self {
            Self::Policy(policy) => policy.target.as_ref(),
            Self::PolicySet(set) => set.target.as_ref(),
        }
    }

    /// Returns the combining algorithm.
    #[must_use]
    pub fn combining_algorithm(&self) -> Option<&'a CombiningAlgorithm> {
        match *self {
            Self::Policy(policy) => policy.combining_algorithm.as_ref(),
            Self::PolicySet(set) => set.combining_algorithm.as_ref(),
        }
    }
}

impl<'a> From<&'a Policy> for PolicyElement<'a> {
    fn from(policy: &'a Policy) -> Self {
        Self::Policy(policy)
    }
}

impl<'a> From<&'a PolicySet> for PolicyElement<'a> {
    fn from(set: &'a PolicySet) -> Self {
        Self::PolicySet(set)
    }
}

//! Enforcement gate applied by policy enforcement points.

use pdp_primitives::{Decision, Effect, Obligation};
use serde::{Deserialize, Serialize};

/// Which effect the gate falls back to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PepBias {
    /// Only an understood Permit is enforced as Permit.
    #[default]
    Deny,
    /// Only an understood Deny is enforced as Deny.
    Permit,
}

/// Maps a decision to the effect a policy enforcement point applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementGate {
    bias: PepBias,
}

impl EnforcementGate {
    /// Creates a gate with the given bias.
    #[must_use]
    pub const fn new(bias: PepBias) -> Self {
        Self { bias }
    }

    /// Returns the configured bias.
    #[must_use]
    pub const fn bias(&self) -> PepBias {
        self.bias
    }

    /// Applies the bias table. A decision whose obligations are not all
    /// understood never overrides the bias.
    #[must_use]
    pub fn enforce(&self, decision: Decision, obligations_understood: bool) -> Effect {
        match self.bias {
            PepBias::Deny if decision == Decision::Permit && obligations_understood => Effect::Permit,
            PepBias::Deny => Effect::Deny,
            PepBias::Permit if decision == Decision::Deny && obligations_understood => Effect::Deny,
            PepBias::Permit => Effect::Permit,
        }
    }

    /// Returns `true` when `understands` accepts every obligation. An empty
    /// list is understood.
    pub fn understands_all<F>(obligations: &[Obligation], understands: F) -> bool
    where
        F: FnMut(&Obligation) -> bool,
    {
        obligations.iter().all(understands)
    }
}

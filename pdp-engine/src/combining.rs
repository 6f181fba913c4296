//! Built-in combining algorithm reducers.

use std::ops::ControlFlow;

use pdp_primitives::{BuiltinAlgorithm, Decision};

/// Incremental reducer for one built-in algorithm.
///
/// Child decisions are pushed in declaration order; [`Combiner::push`]
/// breaks as soon as the outcome can no longer change, so the caller can
/// skip the remaining children.
#[derive(Debug, Clone)]
pub struct Combiner {
    algorithm: BuiltinAlgorithm,
    permit: bool,
    deny: bool,
    indeterminate: bool,
    applicable: Option<Decision>,
}

impl Combiner {
    /// Starts a reduction.
    #[must_use]
    pub const fn new(algorithm: BuiltinAlgorithm) -> Self {
        Self {
            algorithm,
            permit: false,
            deny: false,
            indeterminate: false,
            applicable: None,
        }
    }

    /// Feeds the next child decision.
    pub fn push(&mut self, decision: Decision) -> ControlFlow<Decision> {
        match decision {
            Decision::Permit => self.permit = true,
            Decision::Deny => self.deny = true,
            Decision::Indeterminate => self.indeterminate = true,
            Decision::NotApplicable => {}
        }

        match self.algorithm {
            BuiltinAlgorithm::DenyOverrides | BuiltinAlgorithm::PermitUnlessDeny
                if decision == Decision::Deny =>
            {
                ControlFlow::Break(Decision::Deny)
            }
            BuiltinAlgorithm::PermitOverrides | BuiltinAlgorithm::DenyUnlessPermit
                if decision == Decision::Permit =>
            {
                ControlFlow::Break(Decision::Permit)
            }
            BuiltinAlgorithm::FirstApplicable if decision != Decision::NotApplicable => {
                ControlFlow::Break(decision)
            }
            BuiltinAlgorithm::OnlyOneApplicable => match decision {
                Decision::Indeterminate => ControlFlow::Break(Decision::Indeterminate),
                Decision::NotApplicable => ControlFlow::Continue(()),
                _ if self.applicable.is_some() => ControlFlow::Break(Decision::Indeterminate),
                applicable => {
                    self.applicable = Some(applicable);
                    ControlFlow::Continue(())
                }
            },
            _ => ControlFlow::Continue(()),
        }
    }

    /// Returns the decision once every child was pushed without a break.
    #[must_use]
    pub fn finish(self) -> Decision {
        match self.algorithm {
            BuiltinAlgorithm::DenyOverrides => self.pick(Decision::Permit, self.permit),
            BuiltinAlgorithm::PermitOverrides => self.pick(Decision::Deny, self.deny),
            BuiltinAlgorithm::DenyUnlessPermit => Decision::Deny,
            BuiltinAlgorithm::PermitUnlessDeny => Decision::Permit,
            BuiltinAlgorithm::FirstApplicable => Decision::NotApplicable,
            BuiltinAlgorithm::OnlyOneApplicable => {
                self.applicable.unwrap_or(Decision::NotApplicable)
            }
        }
    }

    fn pick(&self, fallback: Decision, seen: bool) -> Decision {
        if self.indeterminate {
            Decision::Indeterminate
        } else if seen {
            fallback
        } else {
            Decision::NotApplicable
        }
    }
}

/// Reduces already computed child decisions with a built-in algorithm.
pub fn combine<I>(algorithm: BuiltinAlgorithm, decisions: I) -> Decision
where
    I: IntoIterator<Item = Decision>,
{
    let mut combiner = Combiner::new(algorithm);
    for decision in decisions {
        if let ControlFlow::Break(decision) = combiner.push(decision) {
            return decision;
        }
    }
    combiner.finish()
}

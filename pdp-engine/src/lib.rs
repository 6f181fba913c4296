//! Decision engine of the policy decision point.
//!
//! [`PolicyDecisionPoint`] bootstraps rule handler and custom combining
//! algorithm registries, then decides requests: it retrieves candidate
//! policies, wraps them under an anonymous root policy set, and walks the
//! tree. Every identified element checks its Target, resolving the
//! attributes it needs on demand, reduces its children with a combining
//! algorithm, and records its decision on the request context.
//!
//! Evaluation problems never surface as errors. Missing attributes,
//! expression faults, failing handlers and unregistered ids all decide
//! [`pdp_primitives::Decision::Indeterminate`].

#![warn(missing_docs, clippy::pedantic)]

mod cache;
mod combining;
mod contracts;
mod enforcement;
mod engine;
mod error;
mod evaluator;
mod registry;
mod walker;

pub use cache::{CacheStats, CompiledGate, GateCache, GateKind};
pub use combining::{Combiner, combine};
pub use contracts::{EmptyRegistry, PolicyElement, PolicyRetrieval, RegistrySource};
pub use enforcement::{EnforcementGate, PepBias};
pub use engine::{PolicyDecisionPoint, PolicyDecisionPointBuilder};
pub use error::{PdpError, PdpResult};
pub use evaluator::Evaluator;
pub use registry::{
    CombiningHandler, CustomCombiningAlgorithm, HandlerError, HandlerResult, RawCombiningAlgorithm,
    RawRuleHandler, RemoteHandlerClient, RuleHandler, RuleHandlerDefinition,
};
pub use walker::GateOutcome;

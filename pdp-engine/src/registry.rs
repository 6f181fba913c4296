//! Rule handler and custom combining algorithm registries.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use pdp_primitives::{Context, Decision, ElementId, HandlerRecord, RawHandlerDocument};
use serde_json::Value;
use thiserror::Error;

use crate::contracts::PolicyElement;
use crate::evaluator::Evaluator;

/// Result alias for handler invocations.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Errors produced while invoking a rule handler.
///
/// The engine logs them and evaluates the rule as Indeterminate.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler ran and failed.
    #[error("rule handler failed: {reason}")]
    Execution {
        /// Human-readable error returned by the handler.
        reason: String,
    },

    /// The addressed handler could not be reached.
    #[error("rule handler `{address}` is unavailable: {reason}")]
    Unavailable {
        /// Address the engine tried to invoke.
        address: String,
        /// Transport-level explanation.
        reason: String,
    },
}

impl HandlerError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}

/// An in-process procedure deciding a rule in place of a Condition.
///
/// It receives a snapshot of the context attributes, after the attributes
/// named by its registration were resolved, and answers with a value the
/// engine coerces to a boolean.
#[async_trait]
pub trait RuleHandler: Send + Sync {
    /// Evaluates the rule against the attribute snapshot.
    async fn evaluate(&self, attributes: Value) -> HandlerResult<Value>;
}

#[async_trait]
impl<F, Fut> RuleHandler for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = HandlerResult<Value>> + Send,
{
    async fn evaluate(&self, attributes: Value) -> HandlerResult<Value> {
        (self)(attributes).await
    }
}

/// Invokes rule handlers registered by address rather than as procedures.
#[async_trait]
pub trait RemoteHandlerClient: Send + Sync {
    /// Sends the attribute snapshot to the handler at `address`.
    async fn invoke(&self, address: &str, attributes: Value) -> HandlerResult<Value>;
}

/// A custom combining algorithm.
///
/// Implementations may recurse into the engine through the supplied
/// [`Evaluator`], typically to decide the element's children.
#[async_trait]
pub trait CombiningHandler: Send + Sync {
    /// Combines the decisions of `element`'s children.
    async fn combine(
        &self,
        evaluator: &Evaluator<'_>,
        context: &mut Context,
        element: PolicyElement<'_>,
    ) -> Decision;
}

/// A normalized rule handler registration.
pub type RuleHandlerDefinition = HandlerRecord<dyn RuleHandler>;
/// A raw rule handler registration as listed by a registry source.
pub type RawRuleHandler = RawHandlerDocument<dyn RuleHandler>;
/// A normalized custom combining algorithm registration.
pub type CustomCombiningAlgorithm = HandlerRecord<dyn CombiningHandler>;
/// A raw custom combining algorithm registration.
pub type RawCombiningAlgorithm = RawHandlerDocument<dyn CombiningHandler>;

/// Registrations installed by one successful bootstrap.
#[derive(Default)]
pub(crate) struct Registries {
    rule_handlers: HashMap<ElementId, RuleHandlerDefinition>,
    algorithms: HashMap<String, CustomCombiningAlgorithm>,
}

impl fmt::Debug for Registries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<_> = self.rule_handlers.keys().map(ToString::to_string).collect();
        let algorithms: Vec<_> = self.algorithms.keys().cloned().collect();
        f.debug_struct("Registries")
            .field("rule_handlers", &handlers)
            .field("algorithms", &algorithms)
            .finish()
    }
}

impl Registries {
    /// Later registrations replace earlier ones with the same id.
    pub(crate) fn register_rule_handler(&mut self, definition: RuleHandlerDefinition) {
        if let Some(id) = definition.id.clone() {
            self.rule_handlers.insert(id, definition);
        }
    }

    /// Later registrations replace earlier ones with the same id.
    pub(crate) fn register_algorithm(&mut self, algorithm: CustomCombiningAlgorithm) {
        if let Some(id) = &algorithm.id {
            self.algorithms.insert(id.to_string(), algorithm);
        }
    }

    pub(crate) fn rule_handler(&self, id: &ElementId) -> Option<&RuleHandlerDefinition> {
        self.rule_handlers.get(id)
    }

    pub(crate) fn algorithm(&self, id: &str) -> Option<&CustomCombiningAlgorithm> {
        self.algorithms.get(id)
    }

    pub(crate) fn algorithm_ids(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    pub(crate) fn rule_handler_count(&self) -> usize {
        self.rule_handlers.len()
    }

    pub(crate) fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }
}

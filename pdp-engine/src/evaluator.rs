//! Recursive evaluation of policy sets, policies and rules.

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use pdp_language::coerce_to_bool;
use pdp_primitives::{
    AttributeMap, BuiltinAlgorithm, CombiningAlgorithm, Context, Decision, ElementId,
    HandlerRef, PolicyListEntry, Rule, Target, TracedElement, Version,
};
use tracing::{debug, warn};

use crate::cache::GateKind;
use crate::combining::Combiner;
use crate::contracts::PolicyElement;
use crate::engine::PolicyDecisionPoint;
use crate::registry::{Registries, RuleHandlerDefinition};
use crate::walker::{GateOutcome, walk};

/// Entry points into the engine for one decision request.
///
/// Custom combining algorithms receive an evaluator so they can decide
/// children with the same caching, attribute resolution and tracing as the
/// built-in reducers.
pub struct Evaluator<'a> {
    pdp: &'a PolicyDecisionPoint,
    registries: Arc<Registries>,
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("registries", &self.registries)
            .finish_non_exhaustive()
    }
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(pdp: &'a PolicyDecisionPoint, registries: Arc<Registries>) -> Self {
        Self { pdp, registries }
    }

    /// Decides a policy or policy set.
    ///
    /// An identified element first checks its Target, then reduces its
    /// children with its combining algorithm, and finally appends
    /// `{element, decision}` to the context's policy list. An element
    /// without an id skips the Target and the trace.
    pub fn combine_decision<'b>(
        &'b self,
        context: &'b mut Context,
        element: PolicyElement<'b>,
    ) -> BoxFuture<'b, Decision> {
        self.combine(context, element).boxed()
    }

    /// Decides a single rule: Target, then Condition or rule handler, then
    /// the rule's effect.
    pub fn evaluate_rule<'b>(&'b self, context: &'b mut Context, rule: &'b Rule) -> BoxFuture<'b, Decision> {
        self.rule(context, rule).boxed()
    }

    async fn combine(&self, context: &mut Context, element: PolicyElement<'_>) -> Decision {
        let kind = element.kind();
        if let Some(id) = element.id() {
            let gate_kind = match element {
                PolicyElement::Policy(_) => GateKind::PolicyTarget,
                PolicyElement::PolicySet(_) => GateKind::PolicySetTarget,
            };
            if let Some(target) = element.target() {
                match self.gate(context, gate_kind, Some(id), element.version(), target).await {
                    GateOutcome::Match => {}
                    GateOutcome::NoMatch => {
                        if self.verbose() {
                            debug!(%kind, element_id = %id, "target did not match");
                        }
                        return Decision::NotApplicable;
                    }
                    GateOutcome::Indeterminate => return Decision::Indeterminate,
                }
            }
        }

        let decision = match element.combining_algorithm() {
            Some(CombiningAlgorithm::Builtin(algorithm)) => {
                self.reduce(context, element, *algorithm).await
            }
            Some(CombiningAlgorithm::Custom(name)) => self.custom(context, element, name).await,
            None => {
                if self.verbose() {
                    debug!(%kind, element_id = ?element.id(), "missing combining algorithm");
                }
                Decision::Indeterminate
            }
        };

        if let Some(id) = element.id() {
            if self.verbose() {
                debug!(%kind, element_id = %id, %decision, "element decided");
            }
            context.record(PolicyListEntry {
                element: TracedElement {
                    kind,
                    id: id.clone(),
                    version: element.version().cloned(),
                },
                decision,
            });
        }
        decision
    }

    async fn reduce(
        &self,
        context: &mut Context,
        element: PolicyElement<'_>,
        algorithm: BuiltinAlgorithm,
    ) -> Decision {
        let mut combiner = Combiner::new(algorithm);
        match element {
            PolicyElement::Policy(policy) => {
                if !algorithm.allowed_on_policy() {
                    if self.verbose() {
                        debug!(element_id = ?policy.id, %algorithm, "algorithm is reserved for policy sets");
                    }
                    return Decision::Indeterminate;
                }
                for rule in &policy.rules {
                    let decision = self.evaluate_rule(context, rule).await;
                    if let ControlFlow::Break(decision) = combiner.push(decision) {
                        return decision;
                    }
                }
            }
            PolicyElement::PolicySet(set) => {
                let children = set
                    .policies
                    .iter()
                    .map(PolicyElement::Policy)
                    .chain(set.policy_sets.iter().map(PolicyElement::PolicySet));
                for child in children {
                    let decision = self.combine_decision(context, child).await;
                    if let ControlFlow::Break(decision) = combiner.push(decision) {
                        return decision;
                    }
                }
            }
        }
        combiner.finish()
    }

    async fn custom(&self, context: &mut Context, element: PolicyElement<'_>, name: &str) -> Decision {
        let handler = self
            .registries
            .algorithm(name)
            .and_then(|algorithm| match &algorithm.handler {
                Some(HandlerRef::Invocable(handler)) => Some(Arc::clone(handler)),
                _ => None,
            });
        match handler {
            Some(handler) => handler.combine(self, context, element).await,
            None => {
                if self.verbose() {
                    debug!(element_id = ?element.id(), algorithm = name, "combining algorithm is not registered");
                }
                Decision::Indeterminate
            }
        }
    }

    async fn rule(&self, context: &mut Context, rule: &Rule) -> Decision {
        let id = rule.id.as_ref();
        let version = rule.version.as_ref();
        if let Some(target) = &rule.target {
            match self.gate(context, GateKind::RuleTarget, id, version, target).await {
                GateOutcome::Match => {}
                GateOutcome::NoMatch => return Decision::NotApplicable,
                GateOutcome::Indeterminate => return Decision::Indeterminate,
            }
        }

        let verdict = match (&rule.condition, &rule.handler_id) {
            (Some(_), Some(_)) => {
                if self.verbose() {
                    debug!(rule_id = ?id, "rule has both a condition and a handler");
                }
                None
            }
            (Some(condition), None) => {
                match self.gate(context, GateKind::RuleCondition, id, version, condition).await {
                    GateOutcome::Match => Some(true),
                    GateOutcome::NoMatch => Some(false),
                    GateOutcome::Indeterminate => None,
                }
            }
            (None, Some(handler_id)) => self.handler(context, id, handler_id).await,
            (None, None) => Some(true),
        };

        let decision = match verdict {
            Some(true) => rule.effect.map_or(Decision::Indeterminate, Decision::from),
            Some(false) => Decision::NotApplicable,
            None => Decision::Indeterminate,
        };
        if self.verbose() {
            debug!(rule_id = ?id, %decision, "rule decided");
        }
        decision
    }

    async fn handler(
        &self,
        context: &mut Context,
        rule_id: Option<&ElementId>,
        handler_id: &ElementId,
    ) -> Option<bool> {
        let Some(definition) = self.registries.rule_handler(handler_id) else {
            if self.verbose() {
                debug!(rule_id = ?rule_id, %handler_id, "rule handler is not registered");
            }
            return None;
        };
        if let Some(attribute_map) = &definition.attribute_map {
            if !self.resolve(context, attribute_map).await {
                return None;
            }
        }

        let value = self.invoke(definition, context).await?;
        let verdict = coerce_to_bool(&value);
        if verdict.is_none() && self.verbose() {
            debug!(%handler_id, %value, "rule handler returned a non-boolean");
        }
        verdict
    }

    async fn invoke(&self, definition: &RuleHandlerDefinition, context: &Context) -> Option<serde_json::Value> {
        let attributes = context.attributes_snapshot();
        let result = match definition.handler.as_ref()? {
            HandlerRef::Invocable(handler) => handler.evaluate(attributes).await,
            HandlerRef::Address(address) => {
                let Some(client) = &self.pdp.remote else {
                    if self.verbose() {
                        debug!(%address, "no remote handler client is configured");
                    }
                    return None;
                };
                client.invoke(address, attributes).await
            }
        };
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(handler_id = ?definition.id, %error, "rule handler failed");
                None
            }
        }
    }

    /// Resolves a gate's attributes and walks it.
    async fn gate(
        &self,
        context: &mut Context,
        kind: GateKind,
        id: Option<&ElementId>,
        version: Option<&Version>,
        target: &Target,
    ) -> GateOutcome {
        let language = self.pdp.language.as_ref();
        let gate = self.pdp.cache.gate(language, kind, id, version, target);
        let attribute_map = match gate.attribute_map() {
            Ok(attribute_map) => attribute_map,
            Err(error) => {
                if self.verbose() {
                    debug!(?kind, element_id = ?id, %error, "gate does not compile");
                }
                return GateOutcome::Indeterminate;
            }
        };
        if !self.resolve(context, attribute_map).await {
            return GateOutcome::Indeterminate;
        }
        walk(language, &gate, context, self.verbose())
    }

    /// Fetches the attributes the context lacks. Returns `false` when some
    /// remain unresolved.
    ///
    /// Attributes the request already carries are authoritative: they are
    /// never asked of the attribute fetch, so a fetched value can not
    /// overwrite a caller-supplied one.
    async fn resolve(&self, context: &mut Context, attribute_map: &AttributeMap) -> bool {
        let mut pending = AttributeMap::new();
        for (category, paths) in attribute_map.iter() {
            for path in paths {
                if !context.has_attribute(&format!("{category}.{path}")) {
                    pending.insert(category, path.as_str());
                }
            }
        }
        let missing = self.pdp.resolver.resolve(context, &pending).await;
        if missing.is_empty() {
            return true;
        }
        if self.verbose() {
            debug!(?missing, "attributes could not be resolved");
        }
        false
    }

    fn verbose(&self) -> bool {
        self.pdp.settings.debug
    }
}

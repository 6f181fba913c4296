//! Decision request context and the response handed back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::json;
use crate::{Decision, ElementId, ElementKind, Version};

/// Subject category name.
pub const SUBJECT: &str = "subject";
/// Resource category name.
pub const RESOURCE: &str = "resource";
/// Action category name.
pub const ACTION: &str = "action";
/// Environment category name.
pub const ENVIRONMENT: &str = "environment";

/// Summary of an evaluated policy or policy set recorded in the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedElement {
    /// Kind of element (`Policy` or `PolicySet`).
    pub kind: ElementKind,
    /// Identifier of the element.
    pub id: ElementId,
    /// Version of the element at evaluation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

/// One `{element, decision}` trace entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyListEntry {
    /// The evaluated element.
    pub element: TracedElement,
    /// The decision it produced.
    pub decision: Decision,
}

/// A decision request: the attribute categories plus the state accumulated
/// while the engine evaluates it.
///
/// A context belongs to exactly one request and is mutated in place by the
/// engine and by attribute merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(flatten)]
    attributes: Map<String, Value>,
    #[serde(default)]
    return_reason: bool,
    #[serde(default)]
    return_policy_list: bool,
    #[serde(default)]
    return_advice_results: bool,
    #[serde(default)]
    return_obligation_results: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    policy_list: Vec<PolicyListEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    advice_results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    obligation_results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decision: Option<Decision>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a whole attribute category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(category.into(), value);
        self
    }

    /// Sets the subject category.
    #[must_use]
    pub fn with_subject(self, subject: Value) -> Self {
        self.with_category(SUBJECT, subject)
    }

    /// Sets the resource category.
    #[must_use]
    pub fn with_resource(self, resource: Value) -> Self {
        self.with_category(RESOURCE, resource)
    }

    /// Sets the action category.
    #[must_use]
    pub fn with_action(self, action: Value) -> Self {
        self.with_category(ACTION, action)
    }

    /// Sets the environment category.
    #[must_use]
    pub fn with_environment(self, environment: Value) -> Self {
        self.with_category(ENVIRONMENT, environment)
    }

    /// Requests the evaluation trace in the response.
    #[must_use]
    pub fn with_return_policy_list(mut self, enabled: bool) -> Self {
        self.return_policy_list = enabled;
        self
    }

    /// Requests a reason in the response.
    #[must_use]
    pub fn with_return_reason(mut self, enabled: bool) -> Self {
        self.return_reason = enabled;
        self
    }

    /// Requests advice results in the response.
    #[must_use]
    pub fn with_return_advice_results(mut self, enabled: bool) -> Self {
        self.return_advice_results = enabled;
        self
    }

    /// Requests obligation results in the response.
    #[must_use]
    pub fn with_return_obligation_results(mut self, enabled: bool) -> Self {
        self.return_obligation_results = enabled;
        self
    }

    /// Returns every attribute category.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns one attribute category.
    #[must_use]
    pub fn category(&self, category: &str) -> Option<&Value> {
        self.attributes.get(category)
    }

    /// Looks up a fully qualified attribute path such as `subject.role.name`.
    #[must_use]
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        let (category, rest) = match path.split_once('.') {
            Some((category, rest)) => (category, Some(rest)),
            None => (path, None),
        };
        let root = self.attributes.get(category)?;
        match rest {
            Some(rest) => json::lookup(root, rest),
            None => Some(root),
        }
    }

    /// Returns `true` when the qualified path resolves to a non-null value.
    #[must_use]
    pub fn has_attribute(&self, path: &str) -> bool {
        json::is_present(self.attribute(path))
    }

    /// Deep-merges resolved attributes into the context. Resolved values
    /// overwrite existing values at the same path.
    pub fn merge_attributes(&mut self, attributes: Map<String, Value>) {
        json::merge_objects(&mut self.attributes, attributes);
    }

    /// Returns a JSON snapshot of the attribute categories.
    #[must_use]
    pub fn attributes_snapshot(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Returns whether a reason was requested.
    #[must_use]
    pub const fn return_reason(&self) -> bool {
        self.return_reason
    }

    /// Returns whether the evaluation trace was requested.
    #[must_use]
    pub const fn return_policy_list(&self) -> bool {
        self.return_policy_list
    }

    /// Returns whether advice results were requested.
    #[must_use]
    pub const fn return_advice_results(&self) -> bool {
        self.return_advice_results
    }

    /// Returns whether obligation results were requested.
    #[must_use]
    pub const fn return_obligation_results(&self) -> bool {
        self.return_obligation_results
    }

    /// Returns the evaluation trace, in post-order.
    #[must_use]
    pub fn policy_list(&self) -> &[PolicyListEntry] {
        &self.policy_list
    }

    /// Appends an entry to the evaluation trace.
    pub fn record(&mut self, entry: PolicyListEntry) {
        self.policy_list.push(entry);
    }

    /// Returns the accumulated advice results.
    #[must_use]
    pub fn advice_results(&self) -> &[Value] {
        &self.advice_results
    }

    /// Returns the accumulated obligation results.
    #[must_use]
    pub fn obligation_results(&self) -> &[Value] {
        &self.obligation_results
    }

    /// Returns the final decision, once computed.
    #[must_use]
    pub const fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Stores the final decision.
    pub fn set_decision(&mut self, decision: Decision) {
        self.decision = Some(decision);
    }

    /// Clears everything accumulated by a previous evaluation.
    pub fn reset_results(&mut self) {
        self.policy_list.clear();
        self.advice_results.clear();
        self.obligation_results.clear();
        self.decision = None;
    }

    /// Consumes the context and builds the response, honoring the
    /// return-flags. A context that was never evaluated reports
    /// `Indeterminate`.
    #[must_use]
    pub fn into_response(self) -> DecisionResponse {
        let decision = self.decision.unwrap_or(Decision::Indeterminate);
        let reason = self.return_reason.then(|| describe(decision, &self.policy_list));
        DecisionResponse {
            decision,
            reason,
            policy_list: self.return_policy_list.then_some(self.policy_list),
            advice_results: self.return_advice_results.then_some(self.advice_results),
            obligation_results: self
                .return_obligation_results
                .then_some(self.obligation_results),
        }
    }
}

fn describe(decision: Decision, trace: &[PolicyListEntry]) -> String {
    // The last entry of a post-order trace is the outermost identified element.
    match trace.last() {
        Some(entry) => format!(
            "{decision}: {} #{} evaluated to {}",
            entry.element.kind, entry.element.id, entry.decision
        ),
        None => format!("{decision}: no applicable policy was evaluated"),
    }
}

/// Outward-facing result of a decision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    /// The final decision.
    pub decision: Decision,
    /// Summary of how the decision was reached, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Evaluation trace, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_list: Option<Vec<PolicyListEntry>>,
    /// Advice results, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice_results: Option<Vec<Value>>,
    /// Obligation results, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obligation_results: Option<Vec<Value>>,
}

//! Canonical policy records produced by the normalizer.
//!
//! Every field that failed validation is left empty (`None` or an empty list)
//! rather than rejected, so a record always exists even when its document was
//! partly invalid. Unrecognized document fields are kept in `extensions`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AttributeMap, CombiningAlgorithm, Effect, ElementId, Target, Version};

/// A rule: a gated effect inside a policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Identifier, unique within the owning policy.
    pub id: Option<ElementId>,
    /// Version used to invalidate cached attribute maps.
    pub version: Option<Version>,
    /// Effect returned when the rule applies.
    pub effect: Option<Effect>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Applicability gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Boolean condition evaluated once the target matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Target>,
    /// Registered rule handler used instead of a condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_id: Option<ElementId>,
    /// Obligations attached to the rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligation_ids: Vec<ElementId>,
    /// Advice attached to the rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice_ids: Vec<ElementId>,
    /// Document fields the normalizer does not interpret.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// A policy: an ordered list of rules combined by one algorithm.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Identifier.
    pub id: Option<ElementId>,
    /// Version used to invalidate cached attribute maps.
    pub version: Option<Version>,
    /// Algorithm combining the rule decisions.
    pub combining_algorithm: Option<CombiningAlgorithm>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Applicability gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Rules in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Unresolved rule references by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_ids: Vec<ElementId>,
    /// Unresolved rule references by URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_urls: Vec<String>,
    /// Obligations attached to the policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligation_ids: Vec<ElementId>,
    /// Advice attached to the policy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice_ids: Vec<ElementId>,
    /// Document fields the normalizer does not interpret.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// A policy set: nested policies and policy sets combined by one algorithm.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySet {
    /// Identifier. The synthetic root built per request has none.
    pub id: Option<ElementId>,
    /// Version used to invalidate cached attribute maps.
    pub version: Option<Version>,
    /// Algorithm combining the child decisions.
    pub combining_algorithm: Option<CombiningAlgorithm>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Applicability gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Child policies, evaluated before the child policy sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,
    /// Child policy sets, evaluated after the child policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_sets: Vec<PolicySet>,
    /// Unresolved policy references by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_ids: Vec<ElementId>,
    /// Unresolved policy references by URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_urls: Vec<String>,
    /// Unresolved policy set references by id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_set_ids: Vec<ElementId>,
    /// Unresolved policy set references by URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_set_urls: Vec<String>,
    /// Obligations attached to the policy set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligation_ids: Vec<ElementId>,
    /// Advice attached to the policy set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice_ids: Vec<ElementId>,
    /// Document fields the normalizer does not interpret.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Post-decision directive shared by obligations and advice.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    /// Identifier.
    pub id: Option<ElementId>,
    /// Optional version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Effect the directive is tied to; `None` applies to both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,
    /// Address of the procedure carrying out the directive.
    pub handler: Option<String>,
    /// Attributes the handler needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_map: Option<AttributeMap>,
    /// Document fields the normalizer does not interpret.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Obligation: a directive the enforcement point must fulfil.
pub type Obligation = Directive;

/// Advice: a directive the enforcement point may ignore.
pub type Advice = Directive;

/// A handler given either as an in-process procedure or as an address.
pub enum HandlerRef<H: ?Sized> {
    /// Procedure invoked directly.
    Invocable(Arc<H>),
    /// Address resolved by an external client.
    Address(String),
}

impl<H: ?Sized> Clone for HandlerRef<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Invocable(handler) => Self::Invocable(Arc::clone(handler)),
            Self::Address(address) => Self::Address(address.clone()),
        }
    }
}

impl<H: ?Sized> fmt::Debug for HandlerRef<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invocable(_) => f.write_str("Invocable(..)"),
            Self::Address(address) => f.debug_tuple("Address").field(address).finish(),
        }
    }
}

/// Raw registry entry: a loosely-typed document plus the in-process handler,
/// which cannot be expressed as JSON.
pub struct RawHandlerDocument<H: ?Sized> {
    /// Definition fields (`id`, `version`, `description`, `handler`,
    /// `attributeMap`).
    pub document: Value,
    /// In-process handler; takes precedence over a `handler` address in the
    /// document.
    pub handler: Option<Arc<H>>,
}

impl<H: ?Sized> RawHandlerDocument<H> {
    /// Creates a raw entry backed by an in-process handler.
    #[must_use]
    pub fn invocable(document: Value, handler: Arc<H>) -> Self {
        Self {
            document,
            handler: Some(handler),
        }
    }

    /// Creates a raw entry whose handler, if any, is given in the document.
    #[must_use]
    pub fn document(document: Value) -> Self {
        Self {
            document,
            handler: None,
        }
    }
}

impl<H: ?Sized> fmt::Debug for RawHandlerDocument<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHandlerDocument")
            .field("document", &self.document)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Canonical registry entry (rule handler or custom combining algorithm).
pub struct HandlerRecord<H: ?Sized> {
    /// Identifier used for lookups.
    pub id: Option<ElementId>,
    /// Version.
    pub version: Option<Version>,
    /// Free-form description.
    pub description: Option<String>,
    /// The handler itself.
    pub handler: Option<HandlerRef<H>>,
    /// Attributes the handler needs before it runs.
    pub attribute_map: Option<AttributeMap>,
    /// Document fields the normalizer does not interpret.
    pub extensions: Map<String, Value>,
}

impl<H: ?Sized> Clone for HandlerRecord<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            handler: self.handler.clone(),
            attribute_map: self.attribute_map.clone(),
            extensions: self.extensions.clone(),
        }
    }
}

impl<H: ?Sized> fmt::Debug for HandlerRecord<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("handler", &self.handler)
            .field("attribute_map", &self.attribute_map)
            .finish_non_exhaustive()
    }
}

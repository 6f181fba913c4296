use std::collections::BTreeSet;
use std::fmt;

use pdp_config::NormalizerSettings;
use pdp_language::Language;
use pdp_primitives::{
    ACTION, Advice, BuiltinAlgorithm, CombiningAlgorithm, Context, ENVIRONMENT, ElementId,
    ElementKind, HandlerRecord, HandlerRef, Obligation, Policy, PolicySet, RESOURCE,
    RawHandlerDocument, Rule, SUBJECT, Target, ValidationError,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::fields::Fields;
use crate::shape::TargetShape;

/// Methods accepted in `action.method`.
pub const HTTP_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

const RULE_FIELDS: &[&str] = &[
    "id",
    "version",
    "effect",
    "description",
    "target",
    "condition",
    "handlerId",
    "obligationIds",
    "adviceIds",
];

const POLICY_FIELDS: &[&str] = &[
    "id",
    "version",
    "combiningAlgorithm",
    "description",
    "target",
    "rules",
    "ruleIds",
    "ruleUrls",
    "obligationIds",
    "adviceIds",
];

const POLICY_SET_FIELDS: &[&str] = &[
    "id",
    "version",
    "combiningAlgorithm",
    "description",
    "target",
    "policies",
    "policySets",
    "policyIds",
    "policyUrls",
    "policySetIds",
    "policySetUrls",
    "obligationIds",
    "adviceIds",
];

const DIRECTIVE_FIELDS: &[&str] = &[
    "id",
    "version",
    "description",
    "effect",
    "handler",
    "attributeMap",
];

const HANDLER_FIELDS: &[&str] = &["id", "version", "description", "handler", "attributeMap"];

const RETURN_FLAGS: [&str; 4] = [
    "returnReason",
    "returnPolicyList",
    "returnAdviceResults",
    "returnObligationResults",
];

const ACCUMULATED_FIELDS: [&str; 4] = ["policyList", "adviceResults", "obligationResults", "decision"];

/// Turns raw documents into canonical records.
///
/// The normalizer is stateless apart from its configuration; it borrows the
/// [`Language`] used to compile targets and conditions.
#[derive(Clone)]
pub struct Normalizer<'a> {
    language: &'a dyn Language,
    known_algorithms: Option<BTreeSet<String>>,
    debug: bool,
}

impl fmt::Debug for Normalizer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("known_algorithms", &self.known_algorithms)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl<'a> Normalizer<'a> {
    /// Creates a normalizer that accepts any non-built-in combining
    /// algorithm name as a custom algorithm reference.
    #[must_use]
    pub fn new(language: &'a dyn Language) -> Self {
        Self {
            language,
            known_algorithms: None,
            debug: false,
        }
    }

    /// Applies the normalizer section of the configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: NormalizerSettings) -> Self {
        self.debug = settings.debug;
        self
    }

    /// Restricts custom combining algorithm references to `ids`.
    #[must_use]
    pub fn with_known_algorithms<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_algorithms = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Normalizes a rule.
    pub fn rule(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> Rule {
        let Some(map) = self.object(raw, ElementKind::Rule, errors) else {
            return Rule::default();
        };
        let mut fields = Fields::new(map, ElementKind::Rule, errors, self.debug);
        let id = fields.id();
        let version = fields.version(true);
        let effect = fields.effect(true);
        let target = self.gate(&mut fields, "target");
        let condition = self.gate(&mut fields, "condition");
        let handler_id = fields.optional_id("handlerId");
        if condition.is_some() && fields.get("handlerId").is_some() {
            fields.push("handlerId", "cannot be combined with a condition");
        }

        Rule {
            id,
            version,
            effect,
            description: fields.description(),
            target,
            condition,
            handler_id,
            obligation_ids: fields.ids("obligationIds"),
            advice_ids: fields.ids("adviceIds"),
            extensions: fields.extensions(RULE_FIELDS),
        }
    }

    /// Normalizes a policy and, recursively, its rules.
    pub fn policy(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> Policy {
        let Some(map) = self.object(raw, ElementKind::Policy, errors) else {
            return Policy::default();
        };
        let mut fields = Fields::new(map, ElementKind::Policy, errors, self.debug);
        let id = fields.id();
        let version = fields.version(true);
        let combining_algorithm = self.combining_algorithm(&mut fields, ElementKind::Policy);
        let target = self.gate(&mut fields, "target");
        let rules: Vec<Rule> = fields
            .list("rules")
            .map(|items| items.iter().map(|item| self.rule(item, fields.errors())).collect())
            .unwrap_or_default();

        Policy {
            id,
            version,
            combining_algorithm,
            description: fields.description(),
            target,
            rules,
            rule_ids: fields.ids("ruleIds"),
            rule_urls: fields.urls("ruleUrls"),
            obligation_ids: fields.ids("obligationIds"),
            advice_ids: fields.ids("adviceIds"),
            extensions: fields.extensions(POLICY_FIELDS),
        }
    }

    /// Normalizes a policy set and, recursively, its children.
    pub fn policy_set(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> PolicySet {
        let Some(map) = self.object(raw, ElementKind::PolicySet, errors) else {
            return PolicySet::default();
        };
        let mut fields = Fields::new(map, ElementKind::PolicySet, errors, self.debug);
        let id = fields.id();
        let version = fields.version(true);
        let combining_algorithm = self.combining_algorithm(&mut fields, ElementKind::PolicySet);
        let target = self.gate(&mut fields, "target");
        let policies: Vec<Policy> = fields
            .list("policies")
            .map(|items| items.iter().map(|item| self.policy(item, fields.errors())).collect())
            .unwrap_or_default();
        let policy_sets: Vec<PolicySet> = fields
            .list("policySets")
            .map(|items| {
                items
                    .iter()
                    .map(|item| self.policy_set(item, fields.errors()))
                    .collect()
            })
            .unwrap_or_default();

        PolicySet {
            id,
            version,
            combining_algorithm,
            description: fields.description(),
            target,
            policies,
            policy_sets,
            policy_ids: fields.ids("policyIds"),
            policy_urls: fields.urls("policyUrls"),
            policy_set_ids: fields.ids("policySetIds"),
            policy_set_urls: fields.urls("policySetUrls"),
            obligation_ids: fields.ids("obligationIds"),
            advice_ids: fields.ids("adviceIds"),
            extensions: fields.extensions(POLICY_SET_FIELDS),
        }
    }

    /// Normalizes an obligation.
    pub fn obligation(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> Obligation {
        self.directive(raw, ElementKind::Obligation, errors)
    }

    /// Normalizes an advice.
    pub fn advice(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> Advice {
        self.directive(raw, ElementKind::Advice, errors)
    }

    fn directive(
        &self,
        raw: &Value,
        kind: ElementKind,
        errors: &mut Vec<ValidationError>,
    ) -> Obligation {
        let Some(map) = self.object(raw, kind, errors) else {
            return Obligation::default();
        };
        let mut fields = Fields::new(map, kind, errors, self.debug);
        let id = fields.id();
        let version = fields.version(false);
        let effect = fields.effect(false);
        let handler = match fields.get("handler").and_then(Value::as_str) {
            Some(address) if !address.trim().is_empty() => Some(address.to_owned()),
            _ => {
                fields.push("handler", "must be a non-empty procedure address");
                None
            }
        };

        Obligation {
            id,
            version,
            description: fields.description(),
            effect,
            handler,
            attribute_map: fields.attribute_map(),
            extensions: fields.extensions(DIRECTIVE_FIELDS),
        }
    }

    /// Normalizes a decision request.
    ///
    /// Return flags are `true` only when literally `true`, and anything a
    /// previous evaluation accumulated is discarded.
    pub fn context(&self, raw: &Value, errors: &mut Vec<ValidationError>) -> Context {
        let Some(map) = self.object(raw, ElementKind::Context, errors) else {
            return Context::new();
        };
        let flag = |key: &str| map.get(key) == Some(&Value::Bool(true));
        let mut context = Context::new()
            .with_return_reason(flag(RETURN_FLAGS[0]))
            .with_return_policy_list(flag(RETURN_FLAGS[1]))
            .with_return_advice_results(flag(RETURN_FLAGS[2]))
            .with_return_obligation_results(flag(RETURN_FLAGS[3]));
        for (name, value) in map {
            let name = name.as_str();
            if !RETURN_FLAGS.contains(&name) && !ACCUMULATED_FIELDS.contains(&name) {
                context = context.with_category(name, value.clone());
            }
        }

        let mut fields = Fields::new(map, ElementKind::Context, errors, self.debug);
        if let Some(action) = category(&mut fields, ACTION) {
            if let Some(method) = action.get("method").filter(|method| !method.is_null()) {
                if !method.as_str().is_some_and(|method| HTTP_METHODS.contains(&method)) {
                    fields.push(
                        "action.method",
                        format!("`{method}` must be one of {}", HTTP_METHODS.join(", ")),
                    );
                }
            }
        }
        if let Some(resource) = category(&mut fields, RESOURCE) {
            check_id(&mut fields, resource, "resource.id");
        }
        // An absent subject id denotes an unauthenticated request.
        if let Some(subject) = category(&mut fields, SUBJECT) {
            check_id(&mut fields, subject, "subject.id");
        }
        category(&mut fields, ENVIRONMENT);
        context
    }

    /// Normalizes a rule handler registration. An in-process procedure takes
    /// precedence over a `handler` address in the document.
    pub fn rule_handler<H: ?Sized>(
        &self,
        raw: RawHandlerDocument<H>,
        errors: &mut Vec<ValidationError>,
    ) -> HandlerRecord<H> {
        let RawHandlerDocument { document, handler } = raw;
        let Some(map) = self.object(&document, ElementKind::RuleHandler, errors) else {
            return blank_record();
        };
        let mut fields = Fields::new(map, ElementKind::RuleHandler, errors, self.debug);
        let id = fields.id();
        let version = fields.version(true);
        let handler = match handler {
            Some(procedure) => Some(HandlerRef::Invocable(procedure)),
            None => match fields.get("handler").and_then(Value::as_str) {
                Some(address) if !address.trim().is_empty() => {
                    Some(HandlerRef::Address(address.to_owned()))
                }
                _ => {
                    fields.push("handler", "must be a procedure or a non-empty address");
                    None
                }
            },
        };

        HandlerRecord {
            id,
            version,
            description: fields.description(),
            handler,
            attribute_map: fields.attribute_map(),
            extensions: fields.extensions(HANDLER_FIELDS),
        }
    }

    /// Normalizes a custom combining algorithm registration. Custom
    /// algorithms must be in-process procedures and may not reuse a
    /// built-in name.
    pub fn custom_combining_algorithm<H: ?Sized>(
        &self,
        raw: RawHandlerDocument<H>,
        errors: &mut Vec<ValidationError>,
    ) -> HandlerRecord<H> {
        let RawHandlerDocument { document, handler } = raw;
        let kind = ElementKind::CustomCombiningAlgorithm;
        let Some(map) = self.object(&document, kind, errors) else {
            return blank_record();
        };
        let mut fields = Fields::new(map, kind, errors, self.debug);
        let id = fields.id();
        if let Some(ElementId::Text(name)) = &id {
            if let Some(builtin) = BuiltinAlgorithm::from_name(name) {
                fields.push("id", format!("shadows the built-in algorithm {builtin}"));
            }
        }
        let version = fields.version(false);
        let handler = handler.map(HandlerRef::Invocable);
        if handler.is_none() {
            fields.push("handler", "must be an in-process procedure");
        }

        HandlerRecord {
            id,
            version,
            description: fields.description(),
            handler,
            attribute_map: fields.attribute_map(),
            extensions: fields.extensions(HANDLER_FIELDS),
        }
    }

    fn object<'r>(
        &self,
        raw: &'r Value,
        kind: ElementKind,
        errors: &mut Vec<ValidationError>,
    ) -> Option<&'r Map<String, Value>> {
        let map = raw.as_object();
        if map.is_none() {
            let error = ValidationError::new(kind, None, "document", "must be a JSON object");
            if self.debug {
                debug!(%error, "validation failed");
            }
            errors.push(error);
        }
        map
    }

    /// Canonicalizes a Target or Condition and checks that it compiles.
    fn gate(&self, fields: &mut Fields<'_, '_>, key: &'static str) -> Option<Target> {
        let raw = fields.get(key)?;
        let Some(shape) = TargetShape::parse(raw) else {
            fields.push(key, format!("`{raw}` must be a string, AllOf, AnyOf or AnyOf[]"));
            return None;
        };
        let target = shape.into_target();
        if let Err(error) = self.language.target_to_attribute_map(&target) {
            fields.push(key, error.to_string());
        }
        Some(target)
    }

    fn combining_algorithm(
        &self,
        fields: &mut Fields<'_, '_>,
        kind: ElementKind,
    ) -> Option<CombiningAlgorithm> {
        let name = fields
            .get("combiningAlgorithm")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty());
        let Some(name) = name else {
            let builtins: Vec<&str> = BuiltinAlgorithm::ALL.iter().map(|a| a.name()).collect();
            fields.push(
                "combiningAlgorithm",
                format!(
                    "must be one of {} or a custom algorithm id",
                    builtins.join(", ")
                ),
            );
            return None;
        };

        match BuiltinAlgorithm::from_name(name) {
            Some(builtin) if kind == ElementKind::Policy && !builtin.allowed_on_policy() => {
                fields.push(
                    "combiningAlgorithm",
                    format!("{builtin} is only applicable to a PolicySet"),
                );
                None
            }
            Some(builtin) => Some(CombiningAlgorithm::Builtin(builtin)),
            None => match &self.known_algorithms {
                Some(known) if !known.contains(name) => {
                    fields.push(
                        "combiningAlgorithm",
                        format!("`{name}` is neither built in nor registered"),
                    );
                    None
                }
                _ => Some(CombiningAlgorithm::Custom(name.to_owned())),
            },
        }
    }
}

/// Returns the named category when it is an object, reporting anything else.
fn category<'r>(fields: &mut Fields<'r, '_>, name: &'static str) -> Option<&'r Map<String, Value>> {
    let raw = fields.get(name)?;
    let map = raw.as_object();
    if map.is_none() {
        fields.push(name, format!("`{raw}` must be an object"));
    }
    map
}

fn check_id(fields: &mut Fields<'_, '_>, section: &Map<String, Value>, field: &'static str) {
    if let Some(id) = section.get("id").filter(|id| !id.is_null()) {
        if ElementId::from_value(id).is_none() {
            fields.push(field, format!("`{id}` must be an integer or a non-empty string"));
        }
    }
}

fn blank_record<H: ?Sized>() -> HandlerRecord<H> {
    HandlerRecord {
        id: None,
        version: None,
        description: None,
        handler: None,
        attribute_map: None,
        extensions: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pdp_language::ExpressionLanguage;
    use pdp_primitives::{Decision, Effect, Version};
    use serde_json::json;

    const LANGUAGE: ExpressionLanguage = ExpressionLanguage::new();

    fn normalizer() -> Normalizer<'static> {
        Normalizer::new(&LANGUAGE)
    }

    #[test]
    fn canonical_rule_passes_untouched() {
        let mut errors = Vec::new();
        let rule = normalizer().rule(
            &json!({
                "id": "r1",
                "version": 3,
                "effect": "Permit",
                "target": "subject.role == 'admin'",
                "condition": ["subject.age >= 18", "resource.public == true"],
                "obligationIds": [1, "audit"],
                "owner": "team-a"
            }),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rule.id, Some(ElementId::from("r1")));
        assert_eq!(rule.version, Some(Version::new("3")));
        assert_eq!(rule.effect, Some(Effect::Permit));
        assert_eq!(rule.target, Some(Target::expression("subject.role == 'admin'")));
        assert_eq!(rule.condition.as_ref().map(|c| c.any_of()[0][0].len()), Some(2));
        assert_eq!(rule.obligation_ids, [ElementId::from(1), ElementId::from("audit")]);
        assert_eq!(rule.extensions.get("owner"), Some(&json!("team-a")));
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let mut errors = Vec::new();
        let rule = normalizer().rule(
            &json!({
                "id": "r1",
                "version": true,
                "effect": "Allow",
                "target": 12,
                "description": 5
            }),
            &mut errors,
        );
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, ["version", "effect", "target"]);
        assert!(rule.version.is_none() && rule.effect.is_none() && rule.target.is_none());
        assert!(rule.description.is_none());
        assert_eq!(
            errors[1].to_string(),
            "Rule #r1 has an invalid effect: `\"Allow\"` must be one of Permit, Deny"
        );
    }

    #[test]
    fn condition_and_handler_are_exclusive() {
        let mut errors = Vec::new();
        let rule = normalizer().rule(
            &json!({
                "id": 1,
                "version": 1,
                "effect": "Deny",
                "condition": "subject.age > 1",
                "handlerId": "h1"
            }),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "handlerId");
        assert!(rule.condition.is_some() && rule.handler_id.is_some());
    }

    #[test]
    fn target_compile_errors_are_folded_in() {
        let mut errors = Vec::new();
        let rule = normalizer().rule(
            &json!({"id": 1, "version": 1, "effect": "Permit", "target": "subject =="}),
            &mut errors,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "target");
        assert!(rule.target.is_some());
    }

    #[test]
    fn only_one_applicable_is_rejected_on_policies() {
        let mut errors = Vec::new();
        let policy = normalizer().policy(
            &json!({"id": "p", "version": 1, "combiningAlgorithm": "OnlyOneApplicable"}),
            &mut errors,
        );
        assert!(policy.combining_algorithm.is_none());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ElementKind::Policy);

        errors.clear();
        let set = normalizer().policy_set(
            &json!({"id": "s", "version": 1, "combiningAlgorithm": "OnlyOneApplicable"}),
            &mut errors,
        );
        assert!(errors.is_empty());
        assert_eq!(
            set.combining_algorithm,
            Some(CombiningAlgorithm::Builtin(BuiltinAlgorithm::OnlyOneApplicable))
        );
    }

    #[test]
    fn custom_algorithms_are_checked_against_known_ids() {
        let raw = json!({"id": "p", "version": 1, "combiningAlgorithm": "weighted"});
        let mut errors = Vec::new();
        let policy = normalizer().policy(&raw, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(policy.combining_algorithm, Some(CombiningAlgorithm::Custom("weighted".into())));

        let strict = normalizer().with_known_algorithms(["majority"]);
        let policy = strict.policy(&raw, &mut errors);
        assert!(policy.combining_algorithm.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn children_are_normalized_recursively() {
        let mut errors = Vec::new();
        let set = normalizer().policy_set(
            &json!({
                "id": "root",
                "version": "1.0",
                "combiningAlgorithm": "DenyOverrides",
                "policies": [{
                    "id": "p1",
                    "version": 1,
                    "combiningAlgorithm": "FirstApplicable",
                    "rules": [{"id": "r1", "version": 1, "effect": "Maybe"}],
                    "ruleUrls": ["https://policies.example.com/r2", "not a url"]
                }],
                "policySets": [{"id": "s2", "version": 1, "combiningAlgorithm": "PermitOverrides"}],
                "policyIds": [true]
            }),
            &mut errors,
        );
        assert_eq!(set.policies.len(), 1);
        assert_eq!(set.policy_sets.len(), 1);
        assert_eq!(set.policies[0].rules.len(), 1);
        assert_eq!(set.policies[0].rule_urls, ["https://policies.example.com/r2"]);
        let reported: Vec<(ElementKind, &str)> =
            errors.iter().map(|e| (e.kind(), e.field())).collect();
        assert_eq!(
            reported,
            [
                (ElementKind::Rule, "effect"),
                (ElementKind::Policy, "ruleUrls"),
                (ElementKind::PolicySet, "policyIds"),
            ]
        );
    }

    #[test]
    fn directives_allow_either_effect() {
        let mut errors = Vec::new();
        let obligation = normalizer().obligation(
            &json!({"id": "log", "handler": "audit://log", "attributeMap": {"subject": ["id"]}}),
            &mut errors,
        );
        assert!(errors.is_empty());
        assert!(obligation.effect.is_none());
        assert!(obligation.attribute_map.is_some());

        let advice = normalizer().advice(&json!({"id": 2, "effect": "Both"}), &mut errors);
        assert!(advice.handler.is_none());
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, ["effect", "handler"]);
        assert_eq!(errors[0].kind(), ElementKind::Advice);
    }

    #[test]
    fn context_is_validated_and_reset() {
        let mut errors = Vec::new();
        let context = normalizer().context(
            &json!({
                "subject": {"id": null, "role": "guest"},
                "resource": {"id": 4.5},
                "action": {"method": "FETCH"},
                "returnPolicyList": true,
                "returnReason": "yes",
                "policyList": [{"bogus": true}],
                "decision": "Permit"
            }),
            &mut errors,
        );
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, ["action.method", "resource.id"]);
        assert!(context.return_policy_list());
        assert!(!context.return_reason());
        assert!(context.policy_list().is_empty());
        assert_eq!(context.decision(), None::<Decision>);
        assert!(context.has_attribute("subject.role"));
    }

    #[test]
    fn non_objects_yield_blank_records() {
        let mut errors = Vec::new();
        let rule = normalizer().rule(&json!("nope"), &mut errors);
        assert_eq!(rule, Rule::default());
        assert_eq!(errors[0].to_string(), "Rule has an invalid document: must be a JSON object");
    }

    #[test]
    fn handler_registrations() {
        let mut errors = Vec::new();
        let addressed: HandlerRecord<str> = normalizer().rule_handler(
            RawHandlerDocument::document(json!({"id": "h1", "version": 1, "handler": "rpc://h1"})),
            &mut errors,
        );
        assert!(errors.is_empty());
        assert!(matches!(addressed.handler, Some(HandlerRef::Address(ref a)) if a == "rpc://h1"));

        let procedure: Arc<str> = Arc::from("procedure");
        let invocable = normalizer().rule_handler(
            RawHandlerDocument::invocable(json!({"id": "h2", "version": 1}), procedure),
            &mut errors,
        );
        assert!(errors.is_empty());
        assert!(matches!(invocable.handler, Some(HandlerRef::Invocable(_))));

        let shadowing: HandlerRecord<str> = normalizer().custom_combining_algorithm(
            RawHandlerDocument::document(json!({"id": "DenyOverrides", "handler": "rpc://x"})),
            &mut errors,
        );
        assert!(shadowing.handler.is_none());
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, ["id", "handler"]);
    }
}

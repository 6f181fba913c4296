mod support;

use pdp_primitives::{Context, Decision, ElementKind};
use serde_json::json;

use support::{Harness, MemoryStore, policy, policy_set, trace_ids};

fn unconditional(id: &str, effect: &str) -> serde_json::Value {
    json!({
        "id": id,
        "version": "1",
        "combiningAlgorithm": "DenyOverrides",
        "rules": [{ "id": format!("{id}-rule"), "version": "1", "effect": effect }],
    })
}

#[tokio::test]
async fn deny_overrides_prefers_deny_over_permit() {
    let set = policy_set(json!({
        "id": "set",
        "version": "1",
        "combiningAlgorithm": "DenyOverrides",
        "policies": [unconditional("A", "Permit"), unconditional("B", "Deny")],
    }));
    let harness = Harness::new(MemoryStore::default().with_policy_set(set), json!({})).await;

    let (decision, context) = harness.decide(Context::new()).await;

    assert_eq!(decision, Decision::Deny);
    assert_eq!(context.decision(), Some(Decision::Deny));
    // Post-order: children before their set, the anonymous root never.
    assert_eq!(trace_ids(&context), ["A", "B", "set"]);
    let kinds: Vec<_> = context.policy_list().iter().map(|entry| entry.element.kind).collect();
    assert_eq!(kinds, [ElementKind::Policy, ElementKind::Policy, ElementKind::PolicySet]);
}

#[tokio::test]
async fn permit_unless_deny_absorbs_a_non_matching_policy() {
    let set = policy_set(json!({
        "id": "set",
        "version": "1",
        "combiningAlgorithm": "PermitUnlessDeny",
        "policies": [{
            "id": "admins",
            "version": "1",
            "combiningAlgorithm": "DenyOverrides",
            "rules": [{
                "id": "admins-only",
                "version": "1",
                "effect": "Deny",
                "target": "subject.role == 'admin'",
            }],
        }],
    }));
    let harness = Harness::new(MemoryStore::default().with_policy_set(set), json!({})).await;

    let (decision, context) = harness
        .decide(Context::new().with_subject(json!({ "role": "guest" })))
        .await;

    assert_eq!(decision, Decision::Permit);
    let admins = &context.policy_list()[0];
    assert_eq!(admins.element.id.to_string(), "admins");
    assert_eq!(admins.decision, Decision::NotApplicable);
}

#[tokio::test]
async fn unresolvable_condition_attribute_is_indeterminate() {
    let adults = policy(json!({
        "id": "adults",
        "version": "1",
        "combiningAlgorithm": "DenyOverrides",
        "rules": [{
            "id": "adult",
            "version": "1",
            "effect": "Permit",
            "condition": "subject.age >= 18",
        }],
    }));
    let harness = Harness::new(
        MemoryStore::default().with_policy(adults),
        json!({ "subject": { "name": "alice" } }),
    )
    .await;

    let (decision, context) = harness
        .decide(Context::new().with_subject(json!({ "id": "alice" })))
        .await;

    assert_eq!(decision, Decision::Indeterminate);
    assert_eq!(harness.fetch.calls(), 1, "the resolver asked for subject.age");
    assert!(harness.language.evaluated().is_empty(), "the condition never ran");
    assert!(!context.has_attribute("subject.age"));
}

#[tokio::test]
async fn only_one_applicable_rejects_two_permits() {
    let set = policy_set(json!({
        "id": "exclusive",
        "version": "1",
        "combiningAlgorithm": "OnlyOneApplicable",
        "policies": [unconditional("first", "Permit"), unconditional("second", "Permit")],
    }));
    let harness = Harness::new(MemoryStore::default().with_policy_set(set), json!({})).await;

    let (decision, context) = harness.decide(Context::new()).await;

    assert_eq!(decision, Decision::Indeterminate);
    assert_eq!(trace_ids(&context), ["first", "second", "exclusive"]);
}

#[tokio::test]
async fn first_applicable_stops_at_the_first_matching_rule() {
    let ordered = policy(json!({
        "id": "ordered",
        "version": "1",
        "combiningAlgorithm": "FirstApplicable",
        "rules": [
            {
                "id": "owners",
                "version": "1",
                "effect": "Deny",
                "target": "resource.owner == subject.id",
                "condition": "resource.locked == true",
            },
            {
                "id": "readers",
                "version": "1",
                "effect": "Permit",
                "target": "action.method == 'GET'",
            },
        ],
    }));
    let harness = Harness::new(MemoryStore::default().with_policy(ordered), json!({})).await;

    let context = Context::new()
        .with_subject(json!({ "id": "bob" }))
        .with_resource(json!({ "owner": "alice", "locked": true }))
        .with_action(json!({ "method": "GET" }));
    let (decision, _) = harness.decide(context).await;

    assert_eq!(decision, Decision::Permit);
    assert_eq!(
        harness.language.evaluated(),
        ["resource.owner == subject.id", "action.method == 'GET'"]
    );
}

#[tokio::test]
async fn response_honors_the_return_flags() {
    let set = policy_set(json!({
        "id": "set",
        "version": "3",
        "combiningAlgorithm": "DenyOverrides",
        "policies": [unconditional("A", "Permit")],
    }));
    let harness = Harness::new(MemoryStore::default().with_policy_set(set), json!({})).await;

    let response = harness
        .pdp
        .decide(Context::new().with_return_reason(true).with_return_policy_list(true))
        .await
        .expect("decision");

    assert_eq!(response.decision, Decision::Permit);
    assert_eq!(
        response.reason.as_deref(),
        Some("Permit: PolicySet #set evaluated to Permit")
    );
    let trace = response.policy_list.expect("trace requested");
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[1].element.version.as_ref().map(|v| v.as_str()), Some("3"));
    assert!(response.advice_results.is_none());
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pdp_attributes::{AttributeFetch, AttributeResult, StaticAttributes};
use pdp_config::PdpSettings;
use pdp_engine::{
    CombiningHandler, PolicyDecisionPoint, PolicyRetrieval, RawCombiningAlgorithm, RawRuleHandler,
    RegistrySource, RuleHandler,
};
use pdp_language::{
    ContextQuery, EvaluationError, Expression, ExpressionLanguage, Language, LanguageResult,
};
use pdp_normalizer::Normalizer;
use pdp_primitives::{
    AttributeMap, Context, Decision, Error, Policy, PolicySet, RawHandlerDocument, Target,
};
use serde_json::{Map, Value};

/// Normalizes a policy document, failing the test on any validation error.
pub fn policy(raw: Value) -> Policy {
    let mut errors = Vec::new();
    let policy = Normalizer::new(&ExpressionLanguage).policy(&raw, &mut errors);
    assert!(errors.is_empty(), "policy fixture is invalid: {errors:?}");
    policy
}

/// Normalizes a policy set document, failing the test on any validation error.
pub fn policy_set(raw: Value) -> PolicySet {
    let mut errors = Vec::new();
    let set = Normalizer::new(&ExpressionLanguage).policy_set(&raw, &mut errors);
    assert!(errors.is_empty(), "policy set fixture is invalid: {errors:?}");
    set
}

/// In-memory policy retrieval point returning every stored element.
#[derive(Default)]
pub struct MemoryStore {
    policies: Mutex<Vec<Policy>>,
    policy_sets: Mutex<Vec<PolicySet>>,
    failing: AtomicBool,
    pub retrievals: AtomicUsize,
}

impl MemoryStore {
    pub fn with_policy(self, policy: Policy) -> Self {
        self.policies.lock().unwrap().push(policy);
        self
    }

    pub fn with_policy_set(self, set: PolicySet) -> Self {
        self.policy_sets.lock().unwrap().push(set);
        self
    }

    pub fn replace_policies(&self, policies: Vec<Policy>) {
        *self.policies.lock().unwrap() = policies;
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PolicyRetrieval for MemoryStore {
    async fn retrieve_context_policies(
        &self,
        _queries: &[ContextQuery],
    ) -> pdp_primitives::Result<Vec<Policy>> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::collaborator("store offline"));
        }
        Ok(self.policies.lock().unwrap().clone())
    }

    async fn retrieve_context_policy_sets(
        &self,
        _queries: &[ContextQuery],
    ) -> pdp_primitives::Result<Vec<PolicySet>> {
        Ok(self.policy_sets.lock().unwrap().clone())
    }
}

/// Registry source handing out fresh raw registrations on every bootstrap.
#[derive(Default)]
pub struct Registry {
    handlers: Mutex<Vec<(Value, Option<Arc<dyn RuleHandler>>)>>,
    algorithms: Mutex<Vec<(Value, Option<Arc<dyn CombiningHandler>>)>>,
    failing: AtomicBool,
}

impl Registry {
    pub fn with_handler(self, document: Value, handler: Arc<dyn RuleHandler>) -> Self {
        self.handlers.lock().unwrap().push((document, Some(handler)));
        self
    }

    pub fn with_addressed_handler(self, document: Value) -> Self {
        self.handlers.lock().unwrap().push((document, None));
        self
    }

    pub fn with_algorithm(self, document: Value, handler: Arc<dyn CombiningHandler>) -> Self {
        self.algorithms.lock().unwrap().push((document, Some(handler)));
        self
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistrySource for Registry {
    async fn retrieve_rule_handlers(&self) -> pdp_primitives::Result<Vec<RawRuleHandler>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::collaborator("registry offline"));
        }
        Ok(self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(document, handler)| RawHandlerDocument {
                document: document.clone(),
                handler: handler.clone(),
            })
            .collect())
    }

    async fn retrieve_custom_combining_algorithms(
        &self,
    ) -> pdp_primitives::Result<Vec<RawCombiningAlgorithm>> {
        Ok(self
            .algorithms
            .lock()
            .unwrap()
            .iter()
            .map(|(document, handler)| RawHandlerDocument {
                document: document.clone(),
                handler: handler.clone(),
            })
            .collect())
    }
}

/// Expression language recording what the engine compiles and evaluates.
#[derive(Default)]
pub struct CountingLanguage {
    inner: ExpressionLanguage,
    pub attribute_maps: AtomicUsize,
    pub evaluated: Mutex<Vec<String>>,
}

impl CountingLanguage {
    pub fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }

    pub fn attribute_maps(&self) -> usize {
        self.attribute_maps.load(Ordering::SeqCst)
    }
}

impl Language for CountingLanguage {
    fn target_to_attribute_map(&self, target: &Target) -> LanguageResult<AttributeMap> {
        self.attribute_maps.fetch_add(1, Ordering::SeqCst);
        self.inner.target_to_attribute_map(target)
    }

    fn context_to_queries(&self, context: &Context) -> Vec<ContextQuery> {
        self.inner.context_to_queries(context)
    }

    fn compile_expression(&self, source: &str) -> LanguageResult<Expression> {
        self.inner.compile_expression(source)
    }

    fn evaluate_expression(
        &self,
        expression: &Expression,
        context: &Context,
    ) -> Result<bool, EvaluationError> {
        self.evaluated
            .lock()
            .unwrap()
            .push(expression.source().to_owned());
        self.inner.evaluate_expression(expression, context)
    }
}

/// Attribute fetch counting its calls.
pub struct CountingFetch {
    inner: StaticAttributes,
    pub calls: AtomicUsize,
}

impl CountingFetch {
    pub fn new(document: Value) -> Self {
        Self {
            inner: StaticAttributes::new(document),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttributeFetch for CountingFetch {
    async fn retrieve_attributes(
        &self,
        context: &Context,
        attribute_map: &AttributeMap,
    ) -> AttributeResult<Map<String, Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.retrieve_attributes(context, attribute_map).await
    }
}

/// A bootstrapped engine plus handles on its instrumented collaborators.
pub struct Harness {
    pub pdp: PolicyDecisionPoint,
    pub store: Arc<MemoryStore>,
    pub language: Arc<CountingLanguage>,
    pub fetch: Arc<CountingFetch>,
}

impl Harness {
    pub async fn new(store: MemoryStore, attributes: Value) -> Self {
        Self::with(store, Registry::default(), attributes, PdpSettings::default()).await
    }

    pub async fn with(
        store: MemoryStore,
        registry: Registry,
        attributes: Value,
        settings: PdpSettings,
    ) -> Self {
        let store = Arc::new(store);
        let language = Arc::new(CountingLanguage::default());
        let fetch = Arc::new(CountingFetch::new(attributes));
        let pdp = PolicyDecisionPoint::builder()
            .with_language(language.clone())
            .with_policy_retrieval(store.clone())
            .with_registry_source(Arc::new(registry))
            .with_attribute_fetch(fetch.clone())
            .with_settings(settings)
            .build()
            .expect("engine builds");
        pdp.bootstrap().await.expect("bootstrap succeeds");
        Self {
            pdp,
            store,
            language,
            fetch,
        }
    }

    /// Decides `context` and hands it back for inspection.
    pub async fn decide(&self, mut context: Context) -> (Decision, Context) {
        let decision = self
            .pdp
            .evaluate_decision_request(&mut context)
            .await
            .expect("decision");
        (decision, context)
    }
}

/// Ids of the trace entries, in order.
pub fn trace_ids(context: &Context) -> Vec<String> {
    context
        .policy_list()
        .iter()
        .map(|entry| entry.element.id.to_string())
        .collect()
}

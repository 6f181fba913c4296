//! The policy decision point: bootstrap and request evaluation.

use std::fmt;
use std::sync::{Arc, RwLock};

use pdp_attributes::{AttributeFetch, AttributeResolver};
use pdp_config::{EngineSettings, NormalizerSettings, PdpSettings};
use pdp_language::{ExpressionLanguage, Language};
use pdp_normalizer::Normalizer;
use pdp_primitives::{Context, Decision, DecisionResponse, PolicySet};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, GateCache};
use crate::contracts::{EmptyRegistry, PolicyElement, PolicyRetrieval, RegistrySource};
use crate::error::{PdpError, PdpResult};
use crate::evaluator::Evaluator;
use crate::registry::{Registries, RemoteHandlerClient};

/// Builder for [`PolicyDecisionPoint`] instances.
pub struct PolicyDecisionPointBuilder {
    language: Arc<dyn Language>,
    retrieval: Option<Arc<dyn PolicyRetrieval>>,
    registry: Arc<dyn RegistrySource>,
    fetch: Option<Arc<dyn AttributeFetch>>,
    remote: Option<Arc<dyn RemoteHandlerClient>>,
    settings: PdpSettings,
}

impl fmt::Debug for PolicyDecisionPointBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDecisionPointBuilder")
            .field("settings", &self.settings)
            .field("has_retrieval", &self.retrieval.is_some())
            .field("has_fetch", &self.fetch.is_some())
            .field("has_remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for PolicyDecisionPointBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyDecisionPointBuilder {
    /// Starts a builder with the default expression language, an empty
    /// registry and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: Arc::new(ExpressionLanguage::new()),
            retrieval: None,
            registry: Arc::new(EmptyRegistry),
            fetch: None,
            remote: None,
            settings: PdpSettings::default(),
        }
    }

    /// Replaces the expression language.
    #[must_use]
    pub fn with_language(mut self, language: Arc<dyn Language>) -> Self {
        self.language = language;
        self
    }

    /// Installs the policy retrieval point. This is required before calling
    /// [`build`](Self::build).
    #[must_use]
    pub fn with_policy_retrieval(mut self, retrieval: Arc<dyn PolicyRetrieval>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Installs the source of rule handlers and custom combining algorithms.
    #[must_use]
    pub fn with_registry_source(mut self, registry: Arc<dyn RegistrySource>) -> Self {
        self.registry = registry;
        self
    }

    /// Installs the attribute fetch. This is required before calling
    /// [`build`](Self::build).
    #[must_use]
    pub fn with_attribute_fetch(mut self, fetch: Arc<dyn AttributeFetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Installs a client for rule handlers registered by address.
    #[must_use]
    pub fn with_remote_handlers(mut self, client: Arc<dyn RemoteHandlerClient>) -> Self {
        self.remote = Some(client);
        self
    }

    /// Applies the configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: PdpSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the [`PolicyDecisionPoint`]. The engine still needs a
    /// [`bootstrap`](PolicyDecisionPoint::bootstrap) before it decides.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError::MissingCollaborator`] when the policy retrieval
    /// point or the attribute fetch was not provided.
    pub fn build(self) -> PdpResult<PolicyDecisionPoint> {
        let retrieval = self.retrieval.ok_or(PdpError::MissingCollaborator {
            name: "policy retrieval",
        })?;
        let fetch = self.fetch.ok_or(PdpError::MissingCollaborator {
            name: "attribute fetch",
        })?;
        let PdpSettings {
            engine,
            resolver,
            normalizer,
            ..
        } = self.settings;

        Ok(PolicyDecisionPoint {
            language: self.language,
            retrieval,
            registry: self.registry,
            resolver: AttributeResolver::new(fetch).with_settings(resolver),
            remote: self.remote,
            settings: engine,
            normalizer_settings: normalizer,
            registries: RwLock::new(None),
            cache: GateCache::new(),
        })
    }
}

/// Evaluates decision requests against retrieved policies.
///
/// One instance owns its registries and its compiled-gate cache, so several
/// engines can live side by side in one process.
pub struct PolicyDecisionPoint {
    pub(crate) language: Arc<dyn Language>,
    retrieval: Arc<dyn PolicyRetrieval>,
    registry: Arc<dyn RegistrySource>,
    pub(crate) resolver: AttributeResolver,
    pub(crate) remote: Option<Arc<dyn RemoteHandlerClient>>,
    pub(crate) settings: EngineSettings,
    normalizer_settings: NormalizerSettings,
    registries: RwLock<Option<Arc<Registries>>>,
    pub(crate) cache: GateCache,
}

impl fmt::Debug for PolicyDecisionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyDecisionPoint")
            .field("settings", &self.settings)
            .field("resolver", &self.resolver)
            .field("bootstrapped", &self.is_bootstrapped())
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl PolicyDecisionPoint {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> PolicyDecisionPointBuilder {
        PolicyDecisionPointBuilder::new()
    }

    /// Loads and normalizes the rule handler and custom combining algorithm
    /// registrations, then installs them.
    ///
    /// The engine is unready while this runs and stays unready if it fails.
    /// Registrations sharing an id replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError::Registry`] when the registry source fails and
    /// [`PdpError::Bootstrap`] with every validation problem when any
    /// registration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub async fn bootstrap(&self) -> PdpResult<()> {
        *self.registries.write().expect("registries poisoned") = None;

        let handlers = self
            .registry
            .retrieve_rule_handlers()
            .await
            .map_err(|error| PdpError::registry(error.to_string()))?;
        let algorithms = self
            .registry
            .retrieve_custom_combining_algorithms()
            .await
            .map_err(|error| PdpError::registry(error.to_string()))?;

        let normalizer = Normalizer::new(self.language.as_ref()).with_settings(self.normalizer_settings);
        let mut errors = Vec::new();
        let mut registries = Registries::default();
        for raw in handlers {
            registries.register_rule_handler(normalizer.rule_handler(raw, &mut errors));
        }
        for raw in algorithms {
            registries.register_algorithm(normalizer.custom_combining_algorithm(raw, &mut errors));
        }
        if !errors.is_empty() {
            warn!(errors = errors.len(), "bootstrap rejected invalid registrations");
            return Err(PdpError::Bootstrap { errors });
        }

        info!(
            rule_handlers = registries.rule_handler_count(),
            combining_algorithms = registries.algorithm_count(),
            "policy decision point bootstrapped"
        );
        *self.registries.write().expect("registries poisoned") = Some(Arc::new(registries));
        Ok(())
    }

    /// Returns `true` once a bootstrap succeeded.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        self.registries.read().expect("registries poisoned").is_some()
    }

    /// Decides `context` and stores the decision on it.
    ///
    /// Candidate policies and policy sets are retrieved with queries derived
    /// from the context and combined under an anonymous root policy set using
    /// the configured algorithm. The context's policy list collects one entry
    /// per identified element, in evaluation order. Results left on the
    /// context by an earlier evaluation are discarded first; resolved
    /// attributes are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PdpError::NotBootstrapped`] before a successful bootstrap and
    /// [`PdpError::Retrieval`] when the policy retrieval point fails. Every
    /// other problem yields [`Decision::Indeterminate`].
    pub async fn evaluate_decision_request(&self, context: &mut Context) -> PdpResult<Decision> {
        let registries = self.registries()?;
        context.reset_results();
        let queries = self.language.context_to_queries(context);
        if self.settings.debug {
            debug!(queries = queries.len(), "retrieving policies");
        }

        let policies = self
            .retrieval
            .retrieve_context_policies(&queries)
            .await
            .map_err(|error| PdpError::retrieval(error.to_string()))?;
        let policy_sets = self
            .retrieval
            .retrieve_context_policy_sets(&queries)
            .await
            .map_err(|error| PdpError::retrieval(error.to_string()))?;

        let root = PolicySet {
            combining_algorithm: Some(self.settings.combining_algorithm.clone()),
            policies,
            policy_sets,
            ..PolicySet::default()
        };
        let evaluator = Evaluator::new(self, registries);
        let decision = evaluator
            .combine_decision(context, PolicyElement::PolicySet(&root))
            .await;
        context.set_decision(decision);
        if self.settings.debug {
            debug!(%decision, trace = context.policy_list().len(), "decision request evaluated");
        }
        Ok(decision)
    }

    /// Decides `context` and renders the response its return flags ask for.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate_decision_request`](Self::evaluate_decision_request).
    pub async fn decide(&self, mut context: Context) -> PdpResult<DecisionResponse> {
        self.evaluate_decision_request(&mut context).await?;
        Ok(context.into_response())
    }

    /// Returns a normalizer sharing this engine's language and settings.
    ///
    /// After a bootstrap it also knows the registered custom combining
    /// algorithms and rejects policies naming any other.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    #[must_use]
    pub fn normalizer(&self) -> Normalizer<'_> {
        let normalizer = Normalizer::new(self.language.as_ref()).with_settings(self.normalizer_settings);
        let registries = self.registries.read().expect("registries poisoned");
        match registries.as_ref() {
            Some(registries) => normalizer.with_known_algorithms(registries.algorithm_ids()),
            None => normalizer,
        }
    }

    /// Drops every compiled gate, so the next request recompiles Targets
    /// and Conditions. Counters are kept.
    ///
    /// # Panics
    ///
    /// Panics if the internal cache lock is poisoned.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Returns the compiled-gate cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Returns the engine section of the configuration.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn registries(&self) -> PdpResult<Arc<Registries>> {
        self.registries
            .read()
            .expect("registries poisoned")
            .clone()
            .ok_or(PdpError::NotBootstrapped)
    }
}

//! Recursive and flat attribute resolution.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use pdp_config::{ResolutionStrategy, ResolverSettings};
use pdp_primitives::{AttributeMap, Context, json};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::AttributeError;
use crate::fetch::AttributeFetch;

/// Fills missing attributes into a context through an [`AttributeFetch`].
#[derive(Clone)]
pub struct AttributeResolver {
    fetch: Arc<dyn AttributeFetch>,
    settings: ResolverSettings,
}

impl fmt::Debug for AttributeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AttributeResolver {
    /// Creates a resolver using the recursive strategy.
    #[must_use]
    pub fn new(fetch: Arc<dyn AttributeFetch>) -> Self {
        Self {
            fetch,
            settings: ResolverSettings::default(),
        }
    }

    /// Applies the resolver section of the configuration.
    #[must_use]
    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> ResolverSettings {
        self.settings
    }

    /// Fetches every attribute in `attribute_map`, merges the results into
    /// `context`, and returns the fully qualified paths that still do not
    /// resolve to a non-null value.
    ///
    /// Fetched values overwrite values already present at the same path. The
    /// decision engine only asks for paths the request lacks, so values the
    /// caller supplied win over fetched ones.
    /// Fetch failures are logged and leave the affected paths missing.
    pub async fn resolve(&self, context: &mut Context, attribute_map: &AttributeMap) -> Vec<String> {
        if attribute_map.is_empty() {
            return Vec::new();
        }
        if self.settings.debug {
            debug!(?attribute_map, strategy = ?self.settings.strategy, "resolving attributes");
        }

        let resolved = match self.settings.strategy {
            ResolutionStrategy::Flat => self.fetch_level(context, attribute_map).await,
            ResolutionStrategy::Recursive => self.fetch_recursive(context, attribute_map).await,
        };
        context.merge_attributes(resolved);

        let missing: Vec<String> = attribute_map
            .qualified_paths()
            .into_iter()
            .filter(|path| !context.has_attribute(path))
            .collect();
        if self.settings.debug {
            debug!(?missing, "attribute resolution finished");
        }
        missing
    }

    /// Resolves one path segment per level: the first segment of every path
    /// is fetched under its category, and the remainders recurse under the
    /// extended prefix. Deeper answers take precedence.
    fn fetch_recursive<'a>(
        &'a self,
        context: &'a Context,
        attribute_map: &'a AttributeMap,
    ) -> BoxFuture<'a, Map<String, Value>> {
        async move {
            let (level, next) = split_level(attribute_map);
            if self.settings.debug {
                debug!(?level, ?next, "resolving attribute level");
            }
            let mut resolved = self.fetch_level(context, &level).await;
            if !next.is_empty() {
                let deeper = self.fetch_recursive(context, &next).await;
                json::merge_objects(&mut resolved, deeper);
            }
            resolved
        }
        .boxed()
    }

    async fn fetch_level(&self, context: &Context, attribute_map: &AttributeMap) -> Map<String, Value> {
        match self.fetch.retrieve_attributes(context, attribute_map).await {
            Ok(response) => graft(attribute_map, response),
            Err(error) => {
                warn!(%error, "attribute fetch failed; treating attributes as unresolved");
                Map::new()
            }
        }
    }
}

/// Splits every path on its first segment.
fn split_level(attribute_map: &AttributeMap) -> (AttributeMap, AttributeMap) {
    let mut level = AttributeMap::new();
    let mut next = AttributeMap::new();
    for (key, paths) in attribute_map.iter() {
        for path in paths {
            match path.split_once('.') {
                Some((head, rest)) => {
                    level.insert(key, head);
                    next.insert(format!("{key}.{head}"), rest);
                }
                None => level.insert(key, path.as_str()),
            }
        }
    }
    (level, next)
}

/// Places each answered value under the path named by its request key.
fn graft(attribute_map: &AttributeMap, response: Map<String, Value>) -> Map<String, Value> {
    let mut grafted = Map::new();
    for (key, value) in response {
        if !attribute_map.contains_category(&key) || value.is_null() {
            continue;
        }
        if !value.is_object() {
            let error = AttributeError::Malformed {
                reason: format!("expected an object, got `{value}`"),
                key,
            };
            warn!(%error, "ignoring attribute response");
            continue;
        }
        if let Value::Object(nested) = json::nest(&key, value) {
            json::merge_objects(&mut grafted, nested);
        }
    }
    grafted
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{AttributeResult, StaticAttributes};
    use async_trait::async_trait;
    use serde_json::json;

    /// Records every request and answers from a [`StaticAttributes`].
    struct RecordingFetch {
        inner: StaticAttributes,
        requests: Mutex<Vec<AttributeMap>>,
    }

    impl RecordingFetch {
        fn new(document: Value) -> Arc<Self> {
            Arc::new(Self {
                inner: StaticAttributes::new(document),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<AttributeMap> {
            self.requests.lock().expect("requests poisoned").clone()
        }
    }

    #[async_trait]
    impl AttributeFetch for RecordingFetch {
        async fn retrieve_attributes(
            &self,
            context: &Context,
            attribute_map: &AttributeMap,
        ) -> AttributeResult<Map<String, Value>> {
            self.requests
                .lock()
                .expect("requests poisoned")
                .push(attribute_map.clone());
            self.inner.retrieve_attributes(context, attribute_map).await
        }
    }

    struct FailingFetch;

    #[async_trait]
    impl AttributeFetch for FailingFetch {
        async fn retrieve_attributes(
            &self,
            _context: &Context,
            _attribute_map: &AttributeMap,
        ) -> AttributeResult<Map<String, Value>> {
            Err(AttributeError::fetch("directory offline"))
        }
    }

    /// Answers with conflicting values at different depths.
    struct LayeredFetch;

    #[async_trait]
    impl AttributeFetch for LayeredFetch {
        async fn retrieve_attributes(
            &self,
            _context: &Context,
            attribute_map: &AttributeMap,
        ) -> AttributeResult<Map<String, Value>> {
            let mut response = Map::new();
            if attribute_map.contains_category("subject") {
                response.insert("subject".into(), json!({"role": {"name": "shallow"}}));
            }
            if attribute_map.contains_category("subject.role") {
                response.insert("subject.role".into(), json!({"name": "deep"}));
            }
            Ok(response)
        }
    }

    fn directory() -> Value {
        json!({
            "subject": {"age": 40, "role": {"name": "admin", "scope": {"region": "eu"}}},
            "resource": {"owner": "alice"}
        })
    }

    #[tokio::test]
    async fn recursive_strategy_fetches_one_segment_per_level() {
        let fetch = RecordingFetch::new(directory());
        let resolver = AttributeResolver::new(fetch.clone());
        let map = AttributeMap::new()
            .with("subject", "role.scope.region")
            .with("subject", "age")
            .with("resource", "owner");
        let mut context = Context::new();

        let missing = resolver.resolve(&mut context, &map).await;

        assert!(missing.is_empty(), "{missing:?}");
        assert_eq!(context.attribute("subject.role.scope.region"), Some(&json!("eu")));
        assert_eq!(context.attribute("resource.owner"), Some(&json!("alice")));
        let requests = fetch.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[0],
            AttributeMap::new()
                .with("resource", "owner")
                .with("subject", "role")
                .with("subject", "age")
        );
        assert_eq!(requests[1], AttributeMap::new().with("subject.role", "scope"));
        assert_eq!(requests[2], AttributeMap::new().with("subject.role.scope", "region"));
    }

    #[tokio::test]
    async fn flat_strategy_makes_a_single_call() {
        let fetch = RecordingFetch::new(directory());
        let resolver = AttributeResolver::new(fetch.clone()).with_settings(
            ResolverSettings::default().with_strategy(ResolutionStrategy::Flat),
        );
        let map = AttributeMap::new().with("subject", "role.name");
        let mut context = Context::new();

        let missing = resolver.resolve(&mut context, &map).await;

        assert!(missing.is_empty());
        assert_eq!(context.attribute("subject.role.name"), Some(&json!("admin")));
        assert_eq!(fetch.requests(), vec![map]);
    }

    #[tokio::test]
    async fn deeper_levels_take_precedence() {
        let resolver = AttributeResolver::new(Arc::new(LayeredFetch));
        let mut context = Context::new();
        let map = AttributeMap::new().with("subject", "role.name");

        resolver.resolve(&mut context, &map).await;

        assert_eq!(context.attribute("subject.role.name"), Some(&json!("deep")));
    }

    #[tokio::test]
    async fn fetched_values_overwrite_the_context() {
        let resolver = AttributeResolver::new(RecordingFetch::new(directory()));
        let mut context = Context::new().with_subject(json!({"age": 12, "id": 7}));
        let map = AttributeMap::new().with("subject", "age");

        resolver.resolve(&mut context, &map).await;

        assert_eq!(context.attribute("subject.age"), Some(&json!(40)));
        assert_eq!(context.attribute("subject.id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn unresolved_and_null_paths_are_reported() {
        let resolver = AttributeResolver::new(RecordingFetch::new(json!({
            "subject": {"nickname": null}
        })));
        let mut context = Context::new();
        let map = AttributeMap::new()
            .with("subject", "nickname")
            .with("subject", "age");

        let missing = resolver.resolve(&mut context, &map).await;

        assert_eq!(missing, ["subject.nickname", "subject.age"]);
    }

    #[tokio::test]
    async fn fetch_failures_leave_paths_missing() {
        let resolver = AttributeResolver::new(Arc::new(FailingFetch));
        let mut context = Context::new().with_subject(json!({"id": 1}));
        let map = AttributeMap::new()
            .with("subject", "id")
            .with("subject", "age");

        let missing = resolver.resolve(&mut context, &map).await;

        assert_eq!(missing, ["subject.age"]);
    }

    #[tokio::test]
    async fn empty_maps_skip_the_fetch() {
        let fetch = RecordingFetch::new(directory());
        let resolver = AttributeResolver::new(fetch.clone());
        let missing = resolver.resolve(&mut Context::new(), &AttributeMap::new()).await;
        assert!(missing.is_empty());
        assert!(fetch.requests().is_empty());
    }

    #[test]
    fn malformed_answers_are_ignored() {
        let map = AttributeMap::new().with("subject", "age");
        let mut response = Map::new();
        response.insert("subject".into(), json!(40));
        response.insert("resource".into(), json!({"id": 1}));
        assert!(graft(&map, response).is_empty());
    }
}

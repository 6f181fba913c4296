//! Compiled Target/Condition cache.
//!
//! A gate is compiled once per element id and reused until the element shows
//! up with a different version or a different Target. Ids are only unique
//! within their parent, so two policies may both carry a rule `r1` at the
//! same version; the stored Target tells them apart. Compilation is a pure
//! function of the element's target, so two requests racing on the same miss
//! store equivalent values.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use pdp_language::{Expression, Language, LanguageError};
use pdp_primitives::{AttributeMap, ElementId, Target, Version};

/// Which gate of an element a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// A rule's Target.
    RuleTarget,
    /// A rule's Condition.
    RuleCondition,
    /// A policy's Target.
    PolicyTarget,
    /// A policy set's Target.
    PolicySetTarget,
}

/// Compiled expressions in canonical AnyOf/AllOf order.
pub(crate) type Program = Vec<Vec<Vec<Expression>>>;

/// A Target or Condition compiled together with the attributes it needs.
#[derive(Debug)]
pub struct CompiledGate {
    version: Option<Version>,
    target: Target,
    attribute_map: Result<AttributeMap, LanguageError>,
    program: Result<Program, LanguageError>,
}

impl CompiledGate {
    /// Compiles `target` through `language`.
    #[must_use]
    pub fn compile(language: &dyn Language, target: &Target, version: Option<&Version>) -> Self {
        let program = target
            .any_of()
            .iter()
            .map(|any_of| {
                any_of
                    .iter()
                    .map(|all_of| {
                        all_of
                            .iter()
                            .map(|source| language.compile_expression(source))
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>();

        Self {
            version: version.cloned(),
            target: target.clone(),
            attribute_map: language.target_to_attribute_map(target),
            program,
        }
    }

    /// Returns the version the gate was compiled for.
    #[must_use]
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Returns the Target the gate was compiled from.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    fn compiled_from(&self, version: Option<&Version>, target: &Target) -> bool {
        self.version() == version && self.target == *target
    }

    /// Returns the attributes the gate needs.
    ///
    /// # Errors
    ///
    /// Returns the compile error when the gate's expressions are invalid.
    pub fn attribute_map(&self) -> Result<&AttributeMap, &LanguageError> {
        self.attribute_map.as_ref()
    }

    pub(crate) fn program(&self) -> Result<&Program, &LanguageError> {
        self.program.as_ref()
    }
}

/// Counters describing cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a stored entry.
    pub hits: usize,
    /// Gates compiled because of a miss, a changed version or Target, or a
    /// missing id.
    pub recomputations: usize,
    /// Entries currently stored.
    pub entries: usize,
}

/// Per-engine cache of compiled gates keyed by gate kind and element id.
#[derive(Debug, Default)]
pub struct GateCache {
    entries: RwLock<HashMap<(GateKind, ElementId), Arc<CompiledGate>>>,
    hits: AtomicUsize,
    recomputations: AtomicUsize,
}

impl GateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled gate for an element, compiling it when the
    /// element is unknown or its version or Target changed. Elements without
    /// an id are compiled every time and never stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal cache lock is poisoned.
    pub fn gate(
        &self,
        language: &dyn Language,
        kind: GateKind,
        id: Option<&ElementId>,
        version: Option<&Version>,
        target: &Target,
    ) -> Arc<CompiledGate> {
        let Some(id) = id else {
            self.recomputations.fetch_add(1, Ordering::Relaxed);
            return Arc::new(CompiledGate::compile(language, target, version));
        };

        let key = (kind, id.clone());
        {
            let entries = self.entries.read().expect("gate cache poisoned");
            if let Some(gate) = entries.get(&key).filter(|gate| gate.compiled_from(version, target)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(gate);
            }
        }

        let gate = Arc::new(CompiledGate::compile(language, target, version));
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .expect("gate cache poisoned")
            .insert(key, Arc::clone(&gate));
        gate
    }

    /// Returns the current counters.
    ///
    /// # Panics
    ///
    /// Panics if the internal cache lock is poisoned.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            entries: self.entries.read().expect("gate cache poisoned").len(),
        }
    }

    /// Drops every stored entry. Counters are kept.
    ///
    /// # Panics
    ///
    /// Panics if the internal cache lock is poisoned.
    pub fn clear(&self) {
        self.entries.write().expect("gate cache poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use pdp_language::ExpressionLanguage;

    use super::*;

    #[test]
    fn same_version_reuses_the_compiled_gate() {
        let cache = GateCache::new();
        let target = Target::expression("subject.role == 'admin'");
        let id = ElementId::from("p1");
        let v1 = Version::new("1");

        let first = cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&v1), &target);
        let second = cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&v1), &target);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                recomputations: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn version_bump_recomputes() {
        let cache = GateCache::new();
        let id = ElementId::from("p1");
        let old = Target::expression("subject.role == 'admin'");
        let new = Target::expression("resource.owner == subject.id");

        cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&Version::new("1")), &old);
        let gate = cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&Version::new("2")), &new);

        let map = gate.attribute_map().expect("compiles");
        assert!(map.contains_category("resource"));
        assert_eq!(cache.stats().recomputations, 2);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn gate_kinds_do_not_collide() {
        let cache = GateCache::new();
        let id = ElementId::from("r1");
        let version = Version::new("1");
        let target = Target::expression("subject.role == 'admin'");
        let condition = Target::expression("resource.public == true");

        cache.gate(&ExpressionLanguage, GateKind::RuleTarget, Some(&id), Some(&version), &target);
        let gate = cache.gate(&ExpressionLanguage, GateKind::RuleCondition, Some(&id), Some(&version), &condition);

        assert!(gate.attribute_map().expect("compiles").contains_category("resource"));
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn same_id_and_version_with_another_target_recomputes() {
        let cache = GateCache::new();
        let id = ElementId::from("r1");
        let version = Version::new("1");
        let admins = Target::expression("subject.role == 'admin'");
        let guests = Target::expression("subject.role == 'guest'");

        let first = cache.gate(&ExpressionLanguage, GateKind::RuleTarget, Some(&id), Some(&version), &admins);
        let second = cache.gate(&ExpressionLanguage, GateKind::RuleTarget, Some(&id), Some(&version), &guests);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.target(), &guests);
        assert_eq!(cache.stats().recomputations, 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn clear_forces_recompilation() {
        let cache = GateCache::new();
        let id = ElementId::from("p1");
        let version = Version::new("1");
        let target = Target::expression("subject.role == 'admin'");

        let first = cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&version), &target);
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
        let second = cache.gate(&ExpressionLanguage, GateKind::PolicyTarget, Some(&id), Some(&version), &target);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 0,
                recomputations: 2,
                entries: 1
            }
        );
    }

    #[test]
    fn anonymous_elements_are_never_stored() {
        let cache = GateCache::new();
        let target = Target::expression("subject.role == 'admin'");
        cache.gate(&ExpressionLanguage, GateKind::PolicySetTarget, None, None, &target);
        cache.gate(&ExpressionLanguage, GateKind::PolicySetTarget, None, None, &target);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.recomputations, stats.entries), (0, 2, 0));
    }

    #[test]
    fn compile_errors_are_kept_in_the_gate() {
        let gate = CompiledGate::compile(&ExpressionLanguage, &Target::expression("subject =="), None);
        assert!(gate.attribute_map().is_err());
        assert!(gate.program().is_err());
    }
}

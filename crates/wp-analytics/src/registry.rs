//! Rule registry
//!
//! Provides [`RuleRegistry`], mapping test ids to executable rules.

use crate::catalogue::Catalogue;
use crate::error::EngineError;
use crate::rules::{ExceptionRule, RuleSpec};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of rules keyed by test id
///
/// Rules are stored as trait objects so catalogues loaded at runtime can
/// register new instantiations without code changes.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: IndexMap<String, Arc<dyn ExceptionRule>>,
}

impl RuleRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: IndexMap::new(),
        }
    }

    /// Create registry with every built-in catalogue test
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::from_catalogue(&Catalogue::builtin())
    }

    /// Create registry from a catalogue
    #[must_use]
    pub fn from_catalogue(catalogue: &Catalogue) -> Self {
        let mut registry = Self::new();
        for test in catalogue.iter() {
            registry.register_spec(&test.id, &test.rule);
        }
        registry
    }

    /// Register a rule; replaces any rule under the same id
    pub fn register(&mut self, test_id: &str, rule: Arc<dyn ExceptionRule>) {
        self.rules.insert(test_id.to_string(), rule);
    }

    /// Register a declarative rule
    pub fn register_spec(&mut self, test_id: &str, spec: &RuleSpec) {
        self.register(test_id, spec.build());
    }

    /// Look up a rule
    ///
    /// # Errors
    /// [`EngineError::UnknownRule`] if nothing is registered under `test_id`.
    pub fn get(&self, test_id: &str) -> Result<&Arc<dyn ExceptionRule>, EngineError> {
        self.rules
            .get(test_id)
            .ok_or_else(|| EngineError::UnknownRule(test_id.to_string()))
    }

    /// Check if a rule exists
    #[inline]
    #[must_use]
    pub fn contains(&self, test_id: &str) -> bool {
        self.rules.contains_key(test_id)
    }

    /// Remove a rule
    #[inline]
    pub fn remove(&mut self, test_id: &str) -> bool {
        self.rules.shift_remove(test_id).is_some()
    }

    /// List registered test ids in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    /// Get number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleFamily, ThresholdRule};

    #[test]
    fn registry_new_empty() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_with_defaults_matches_catalogue() {
        let registry = RuleRegistry::with_defaults();
        let catalogue = Catalogue::builtin();
        assert_eq!(registry.len(), catalogue.len());
        for test in catalogue.iter() {
            assert!(registry.contains(&test.id));
            assert_eq!(registry.get(&test.id).unwrap().family(), test.rule.family());
        }
    }

    #[test]
    fn registry_unknown_rule() {
        let registry = RuleRegistry::with_defaults();
        let err = registry.get("NOPE-99").unwrap_err();
        assert_eq!(err, EngineError::UnknownRule("NOPE-99".into()));
    }

    #[test]
    fn registry_register_and_remove() {
        let mut registry = RuleRegistry::new();
        registry.register("CUSTOM", Arc::new(ThresholdRule::negative("Balance")));
        assert_eq!(registry.get("CUSTOM").unwrap().family(), RuleFamily::Threshold);
        assert_eq!(registry.ids(), vec!["CUSTOM"]);
        assert!(registry.remove("CUSTOM"));
        assert!(!registry.remove("CUSTOM"));
    }
}

//! Source-type key to fetch-strategy mapping.
//!
//! Built once at process start. Adding support for a new board means one
//! strategy implementation plus one entry here; the orchestrator never
//! changes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ScrapeError;

use super::{
    CareersPageStrategy, FetchStrategy, GreenhouseStrategy, LeverStrategy, RemotiveStrategy,
};

/// Registry of fetch strategies keyed by source type.
pub struct ScraperRegistry {
    strategies: HashMap<&'static str, Arc<dyn FetchStrategy>>,
}

impl ScraperRegistry {
    /// Registry with all built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        registry.register(Arc::new(GreenhouseStrategy));
        registry.register(Arc::new(LeverStrategy));
        registry.register(Arc::new(RemotiveStrategy));
        registry.register(Arc::new(CareersPageStrategy));
        registry
    }

    /// Register a strategy under its own key.
    pub fn register(&mut self, strategy: Arc<dyn FetchStrategy>) {
        self.strategies.insert(strategy.key(), strategy);
    }

    /// Look up the strategy for a source-type key.
    pub fn resolve(&self, source_type: &str) -> Result<Arc<dyn FetchStrategy>, ScrapeError> {
        self.strategies
            .get(source_type)
            .cloned()
            .ok_or_else(|| ScrapeError::UnknownSourceType(source_type.to_string()))
    }

    /// Registered strategy keys, sorted for display.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.strategies.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        let registry = ScraperRegistry::with_builtins();
        for key in ["greenhouse", "lever", "remotive", "careers_page"] {
            assert!(registry.resolve(key).is_ok(), "missing strategy: {key}");
        }
    }

    #[test]
    fn test_unknown_key_is_error() {
        let registry = ScraperRegistry::with_builtins();
        match registry.resolve("glassdoor") {
            Err(ScrapeError::UnknownSourceType(key)) => assert_eq!(key, "glassdoor"),
            Err(other) => panic!("expected UnknownSourceType, got {other:?}"),
            Ok(_) => panic!("expected UnknownSourceType, got a strategy"),
        }
    }

    #[test]
    fn test_keys_sorted() {
        let registry = ScraperRegistry::with_builtins();
        let keys = registry.keys();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}
